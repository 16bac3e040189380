//! Error types for rendering.

use crate::dispatch::NodeKind;
use crate::span::SpanKind;

/// Error that aborts a render pass.
///
/// A failed pass never returns partial output: span offsets are only
/// meaningful against the complete text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// No rule is registered for a node kind and the policy is to fail.
    #[error("no rendering rule registered for node kind `{kind}`")]
    UnknownNode {
        /// Kind name (built-in kind or custom node name).
        kind: String,
    },

    /// A rule was handed a node of a kind it cannot render.
    #[error("rule for `{expected}` cannot render a `{found}` node")]
    RuleMismatch {
        /// Kind the rule renders.
        expected: NodeKind,
        /// Kind of the node it was given.
        found: String,
    },

    /// Container nesting exceeded the configured maximum.
    #[error("document nesting exceeds the maximum depth of {limit}")]
    DepthLimit {
        /// Configured maximum depth.
        limit: usize,
    },

    /// A span was opened and never closed.
    #[error("{kind} span opened at offset {offset} was never closed")]
    UnclosedSpan {
        /// Kind of the unclosed span.
        kind: SpanKind,
        /// Offset the span was opened at.
        offset: usize,
    },
}
