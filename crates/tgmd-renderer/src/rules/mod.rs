//! Built-in rendering rules.
//!
//! One unit struct per node kind, registered by [`RuleSet::standard`].
//!
//! [`RuleSet::standard`]: crate::RuleSet::standard

/// Unwrap the node variant a rule renders, or fail with
/// [`RenderError::RuleMismatch`](crate::RenderError::RuleMismatch).
macro_rules! expect_node {
    ($node:expr, $variant:ident) => {
        match $node {
            $crate::dispatch::Node::$variant(inner) => inner,
            other => {
                return Err($crate::error::RenderError::RuleMismatch {
                    expected: $crate::dispatch::NodeKind::$variant,
                    found: other.kind_name().to_owned(),
                });
            }
        }
    };
}

pub mod block;
pub mod inline;
