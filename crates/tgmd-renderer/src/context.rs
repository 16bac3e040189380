//! Mutable state of one render pass.

use crate::ast::{Block, Inline, Line, Newline, Trivia};
use crate::dispatch::{Node, RuleSet};
use crate::error::RenderError;
use crate::markup::MarkupInterceptor;
use crate::renderer::{RenderOptions, UnknownNodePolicy};
use crate::span::{Span, SpanStyle, SpanTracker};
use crate::writer::{Indent, OutputBuffer};

/// State handed to every rendering rule.
///
/// Owns the output buffer, the span tracker and the indentation stack of a
/// single pass. Rules only touch the output through this type, which keeps
/// span offsets exact: every offset is the buffer length at the moment the
/// span is opened or closed.
pub struct RenderContext<'a> {
    rules: &'a RuleSet,
    options: &'a RenderOptions,
    interceptor: Option<&'a mut dyn MarkupInterceptor>,
    out: OutputBuffer,
    spans: SpanTracker,
    compact_paragraph: bool,
    last_in_container: bool,
    depth: usize,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        rules: &'a RuleSet,
        options: &'a RenderOptions,
        interceptor: Option<&'a mut dyn MarkupInterceptor>,
    ) -> Self {
        Self {
            rules,
            options,
            interceptor,
            out: OutputBuffer::new(options.offset_encoding, options.newline),
            spans: SpanTracker::new(),
            compact_paragraph: false,
            last_in_container: true,
            depth: 0,
        }
    }

    /// Options of the current pass.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        self.options
    }

    /// Dispatch `node` to its registered rule.
    ///
    /// # Errors
    ///
    /// Fails when nesting exceeds [`RenderOptions::max_depth`], when no rule
    /// is registered and the policy is [`UnknownNodePolicy::Error`], or when
    /// the rule itself fails.
    pub fn render<'n>(&mut self, node: impl Into<Node<'n>>) -> Result<(), RenderError> {
        let node = node.into();
        let rules = self.rules;
        let Some(rule) = rules.get(node) else {
            return self.unknown(node);
        };
        if self.depth >= self.options.max_depth {
            return Err(RenderError::DepthLimit {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        tracing::trace!(kind = node.kind_name(), depth = self.depth, "Rendering node");
        let result = rule.render(self, node);
        self.depth -= 1;
        result
    }

    fn unknown(&mut self, node: Node<'_>) -> Result<(), RenderError> {
        match self.options.unknown_nodes {
            UnknownNodePolicy::Skip => {
                tracing::warn!(kind = node.kind_name(), "No rendering rule, skipping node");
                Ok(())
            }
            UnknownNodePolicy::Error => Err(RenderError::UnknownNode {
                kind: node.kind_name().to_owned(),
            }),
        }
    }

    /// Render child blocks in order, tracking which one is last in the
    /// container.
    ///
    /// # Errors
    ///
    /// Propagates the first child error.
    pub fn render_blocks(&mut self, blocks: &[Block]) -> Result<(), RenderError> {
        let saved = self.last_in_container;
        let result = blocks.iter().enumerate().try_for_each(|(index, block)| {
            self.last_in_container = index + 1 == blocks.len();
            self.render(block)
        });
        self.last_in_container = saved;
        result
    }

    /// Render inline children in order.
    ///
    /// # Errors
    ///
    /// Propagates the first child error.
    pub fn render_inlines(&mut self, inlines: &[Inline]) -> Result<(), RenderError> {
        inlines.iter().try_for_each(|inline| self.render(inline))
    }

    /// Replay the blank lines recorded before a block.
    pub fn render_lines_before(&mut self, trivia: &Trivia) {
        if let Some(lines) = &trivia.lines_before {
            self.write_lines(lines);
        }
    }

    /// Replay the blank lines recorded after a block.
    ///
    /// When nothing was recorded, a block that is not the last in its
    /// container is followed by one default line terminator.
    pub fn render_lines_after(&mut self, trivia: &Trivia) {
        match &trivia.lines_after {
            Some(lines) => self.write_lines(lines),
            None if !self.last_in_container => self.out.write_default_line(),
            None => {}
        }
    }

    fn write_lines(&mut self, lines: &[Line]) {
        for line in lines {
            self.out.write(&line.text);
            self.out.write_line(line.newline);
        }
    }

    pub fn write(&mut self, text: &str) {
        self.out.write(text);
    }

    pub fn write_char(&mut self, ch: char) {
        self.out.write_char(ch);
    }

    pub fn write_line(&mut self, newline: Newline) {
        self.out.write_line(newline);
    }

    pub fn write_default_line(&mut self) {
        self.out.write_default_line();
    }

    /// Terminate the current line if anything was written on it.
    pub fn ensure_line(&mut self) {
        self.out.ensure_line();
    }

    /// Current output length in the pass's offset unit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.out.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    #[must_use]
    pub fn is_at_line_start(&self) -> bool {
        self.out.is_at_line_start()
    }

    /// Number of indentation entries currently pushed.
    #[must_use]
    pub fn indent_depth(&self) -> usize {
        self.out.indent_depth()
    }

    /// Run `f` inside a span.
    ///
    /// Pending indentation is written before the span opens, so prefixes
    /// never count towards a span. The span is closed even if `f` fails.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn with_span<F>(&mut self, style: impl Into<SpanStyle>, f: F) -> Result<(), RenderError>
    where
        F: FnOnce(&mut Self) -> Result<(), RenderError>,
    {
        self.out.flush_indent();
        let handle = self.spans.open(style.into(), self.out.len());
        let result = f(self);
        self.spans.close(handle, self.out.len());
        result
    }

    /// Run `f` with `indent` pushed on the indentation stack.
    ///
    /// The entry is popped even if `f` fails.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn with_indent<F>(&mut self, indent: Indent, f: F) -> Result<(), RenderError>
    where
        F: FnOnce(&mut Self) -> Result<(), RenderError>,
    {
        self.out.push_indent(indent);
        let result = f(self);
        self.out.pop_indent();
        result
    }

    /// Offer a raw inline tag to the markup interceptor.
    ///
    /// Returns `true` if the tag was handled and must not be written.
    pub fn intercept_markup(&mut self, tag: &str) -> bool {
        self.interceptor
            .as_mut()
            .is_some_and(|interceptor| interceptor.intercept(tag))
    }

    /// Whether paragraphs are currently rendered compactly (inside a tight
    /// list).
    #[must_use]
    pub fn is_compact_paragraph(&self) -> bool {
        self.compact_paragraph
    }

    /// Set the compact-paragraph flag, returning the previous value.
    pub fn set_compact_paragraph(&mut self, compact: bool) -> bool {
        std::mem::replace(&mut self.compact_paragraph, compact)
    }

    /// Whether the block being rendered is the last child of its container.
    #[must_use]
    pub fn is_last_in_container(&self) -> bool {
        self.last_in_container
    }

    /// Set the last-in-container flag, returning the previous value.
    pub fn set_last_in_container(&mut self, last: bool) -> bool {
        std::mem::replace(&mut self.last_in_container, last)
    }

    pub(crate) fn finish(self) -> Result<(String, Vec<Span>), RenderError> {
        debug_assert_eq!(self.out.indent_depth(), 0, "unbalanced indentation");
        let spans = self.spans.finish()?;
        Ok((self.out.into_string(), spans))
    }
}
