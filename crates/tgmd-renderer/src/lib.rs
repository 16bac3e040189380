//! Markdown to chat rich text.
//!
//! Walks a parsed markdown [`Document`](ast::Document) and produces plain
//! text plus a list of style [`Span`]s (bold, italic, code, links, ...)
//! addressed by offset and length into that text, the shape chat platforms
//! such as Telegram accept as message entities.
//!
//! # Architecture
//!
//! - [`parse`] turns markdown source into the document tree, keeping the
//!   whitespace and line terminators the renderer needs to reproduce layout.
//! - [`Renderer`] dispatches every node to a [`NodeRule`] looked up by
//!   [`NodeKind`] in a [`RuleSet`]. Rules can be replaced or added, including
//!   rules for custom node kinds.
//! - Rules write through a [`RenderContext`], which owns the output buffer,
//!   the indentation stack (list and quote prefixes) and the [`SpanTracker`].
//! - Raw inline HTML is offered to a [`MarkupInterceptor`] before being
//!   written.
//!
//! # Example
//!
//! ```
//! use tgmd_renderer::{SpanKind, to_telegram};
//!
//! let output = to_telegram("run `ls` **now**").unwrap();
//! assert_eq!(output.text, "run ls now");
//! assert_eq!(output.spans[0].kind, SpanKind::Code);
//! assert_eq!(output.spans[1].kind, SpanKind::Bold);
//! ```

pub mod ast;
mod context;
mod dispatch;
mod emoji;
mod error;
mod markup;
pub mod parse;
mod renderer;
pub mod rules;
mod span;
mod util;
mod writer;

pub use context::RenderContext;
pub use dispatch::{Node, NodeKind, NodeRule, RuleSet};
pub use error::RenderError;
pub use markup::{MarkupFilter, MarkupInterceptor};
pub use parse::{DEFAULT_MAX_NESTING, ParseOptions, parse, parse_with};
pub use renderer::{
    DEFAULT_MAX_DEPTH, RenderOptions, RenderOutput, Renderer, UnknownNodePolicy, to_telegram,
};
pub use span::{Span, SpanHandle, SpanKind, SpanStyle, SpanTracker};
pub use util::decimal_digits;
pub use writer::{Indent, OffsetEncoding, OutputBuffer};
