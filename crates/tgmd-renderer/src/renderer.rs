//! Render entry points and options.

use crate::ast::{Document, Newline};
use crate::context::RenderContext;
use crate::dispatch::{NodeKind, NodeRule, RuleSet};
use crate::error::RenderError;
use crate::markup::MarkupInterceptor;
use crate::parse::{ParseOptions, parse_with};
use crate::span::Span;
use crate::writer::OffsetEncoding;

/// Default maximum node nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do with a node that has no registered rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum UnknownNodePolicy {
    /// Abort with [`RenderError::UnknownNode`].
    #[default]
    Error,
    /// Drop the node (and its children) and log a warning.
    Skip,
}

/// Options of a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Unit of span offsets and lengths.
    pub offset_encoding: OffsetEncoding,
    /// Maximum node nesting depth.
    pub max_depth: usize,
    pub unknown_nodes: UnknownNodePolicy,
    /// Terminator written where the tree recorded none.
    pub newline: Newline,
    /// Replay fence lines of fenced code blocks around the `pre` span.
    pub keep_code_fences: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            offset_encoding: OffsetEncoding::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            unknown_nodes: UnknownNodePolicy::default(),
            newline: Newline::Lf,
            keep_code_fences: false,
        }
    }
}

impl RenderOptions {
    #[must_use]
    pub fn with_offset_encoding(mut self, encoding: OffsetEncoding) -> Self {
        self.offset_encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_unknown_nodes(mut self, policy: UnknownNodePolicy) -> Self {
        self.unknown_nodes = policy;
        self
    }

    #[must_use]
    pub fn with_newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    #[must_use]
    pub fn with_keep_code_fences(mut self, keep: bool) -> Self {
        self.keep_code_fences = keep;
        self
    }
}

/// Result of a render pass.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOutput {
    /// Rendered plain text.
    pub text: String,
    /// Style spans in open order.
    #[cfg_attr(feature = "serde", serde(rename = "entities"))]
    pub spans: Vec<Span>,
    /// Unit the span offsets are measured in.
    #[cfg_attr(feature = "serde", serde(rename = "offset_encoding"))]
    pub encoding: OffsetEncoding,
}

impl RenderOutput {
    /// Text covered by `span`, or `None` if the span does not fit the text.
    #[must_use]
    pub fn span_text(&self, span: &Span) -> Option<&str> {
        let start = self.encoding.byte_index(&self.text, span.offset)?;
        let end = self.encoding.byte_index(&self.text, span.end())?;
        self.text.get(start..end)
    }
}

/// Renders document trees into text plus style spans.
///
/// A renderer holds only its rules and options; each call works on fresh
/// state, so one renderer can be shared across threads.
///
/// # Example
///
/// ```
/// use tgmd_renderer::{Renderer, SpanKind};
///
/// let output = Renderer::new().render_markdown("hello *world*").unwrap();
/// assert_eq!(output.text, "hello world");
/// assert_eq!(output.spans[0].kind, SpanKind::Bold);
/// assert_eq!((output.spans[0].offset, output.spans[0].length), (6, 5));
/// ```
#[derive(Debug, Default)]
pub struct Renderer {
    rules: RuleSet,
    options: RenderOptions,
    parse: ParseOptions,
}

impl Renderer {
    /// Renderer with the standard rules and default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with a custom rule set.
    #[must_use]
    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Options used by [`render_markdown`](Self::render_markdown).
    #[must_use]
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    /// Register or replace the rule for a built-in node kind.
    #[must_use]
    pub fn with_rule<R: NodeRule + 'static>(mut self, kind: NodeKind, rule: R) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    /// Register the rule for custom nodes named `name`.
    #[must_use]
    pub fn with_custom_rule<R: NodeRule + 'static>(
        mut self,
        name: impl Into<String>,
        rule: R,
    ) -> Self {
        self.rules.insert_custom(name, rule);
        self
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Render a document. Raw inline markup is written unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if a node has no rule (under
    /// [`UnknownNodePolicy::Error`]), if nesting exceeds the configured depth,
    /// or if a rule fails.
    pub fn render(&self, document: &Document) -> Result<RenderOutput, RenderError> {
        self.run(document, None)
    }

    /// Render a document, offering raw inline markup to `interceptor`.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render).
    pub fn render_with(
        &self,
        document: &Document,
        interceptor: &mut dyn MarkupInterceptor,
    ) -> Result<RenderOutput, RenderError> {
        self.run(document, Some(interceptor))
    }

    /// Parse markdown source and render it.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render).
    pub fn render_markdown(&self, markdown: &str) -> Result<RenderOutput, RenderError> {
        self.render(&parse_with(markdown, &self.parse))
    }

    /// Parse markdown source and render it with a markup interceptor.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render).
    pub fn render_markdown_with(
        &self,
        markdown: &str,
        interceptor: &mut dyn MarkupInterceptor,
    ) -> Result<RenderOutput, RenderError> {
        self.render_with(&parse_with(markdown, &self.parse), interceptor)
    }

    fn run<'a>(
        &'a self,
        document: &Document,
        interceptor: Option<&'a mut dyn MarkupInterceptor>,
    ) -> Result<RenderOutput, RenderError> {
        tracing::debug!(
            blocks = document.blocks.len(),
            encoding = ?self.options.offset_encoding,
            "Rendering document"
        );
        let mut ctx = RenderContext::new(&self.rules, &self.options, interceptor);
        ctx.render(document)?;
        let (text, spans) = ctx.finish()?;
        tracing::debug!(len = text.len(), spans = spans.len(), "Rendered document");
        Ok(RenderOutput {
            text,
            spans,
            encoding: self.options.offset_encoding,
        })
    }
}

/// Render markdown source with the default renderer.
///
/// # Errors
///
/// Returns an error if rendering fails; the standard rules cover every node
/// the parser produces, so this only happens on excessively nested input.
///
/// # Example
///
/// ```
/// let output = tgmd_renderer::to_telegram("see <https://example.com>").unwrap();
/// assert_eq!(output.text, "see https://example.com");
/// assert_eq!(output.spans[0].url.as_deref(), Some("https://example.com"));
/// ```
pub fn to_telegram(markdown: &str) -> Result<RenderOutput, RenderError> {
    Renderer::new().render_markdown(markdown)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{Block, CustomInline, Inline, List, ListItem};
    use crate::dispatch::Node;
    use crate::span::SpanKind;

    #[test]
    fn test_unknown_custom_node_errors_by_default() {
        let document = Document::new(vec![Block::paragraph(vec![Inline::CustomInline(
            CustomInline {
                kind: "spoiler".to_owned(),
                ..CustomInline::default()
            },
        )])]);
        let err = Renderer::new().render(&document).unwrap_err();
        assert!(
            matches!(&err, RenderError::UnknownNode { kind } if kind == "spoiler"),
            "Expected UnknownNode, got {err:?}"
        );
    }

    #[test]
    fn test_unknown_node_skipped_by_policy() {
        let document = Document::new(vec![Block::paragraph(vec![
            Inline::text("a"),
            Inline::CustomInline(CustomInline {
                kind: "spoiler".to_owned(),
                content: "hidden".to_owned(),
                children: Vec::new(),
            }),
            Inline::text("b"),
        ])]);
        let renderer = Renderer::new()
            .with_options(RenderOptions::default().with_unknown_nodes(UnknownNodePolicy::Skip));
        assert_eq!(renderer.render(&document).unwrap().text, "ab");
    }

    #[test]
    fn test_custom_rule_renders_custom_node() {
        let renderer = Renderer::new().with_custom_rule(
            "spoiler",
            |ctx: &mut RenderContext<'_>, node: Node<'_>| -> Result<(), RenderError> {
                if let Node::CustomInline(inline) = node {
                    ctx.with_span(SpanKind::Unknown, |ctx| {
                        ctx.write(&inline.content);
                        Ok(())
                    })?;
                }
                Ok(())
            },
        );
        let document = Document::new(vec![Block::paragraph(vec![Inline::CustomInline(
            CustomInline {
                kind: "spoiler".to_owned(),
                content: "boo".to_owned(),
                children: Vec::new(),
            },
        )])]);
        let output = renderer.render(&document).unwrap();
        assert_eq!(output.text, "boo");
        assert_eq!(output.spans[0].kind, SpanKind::Unknown);
    }

    #[test]
    fn test_rule_registered_under_wrong_kind() {
        let renderer = Renderer::new().with_rule(NodeKind::Literal, crate::rules::block::HeadingRule);
        let document = Document::new(vec![Block::paragraph(vec![Inline::text("x")])]);
        let err = renderer.render(&document).unwrap_err();
        assert!(
            matches!(
                &err,
                RenderError::RuleMismatch { expected: NodeKind::Heading, found } if found == "literal"
            ),
            "Expected RuleMismatch, got {err:?}"
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut block = Block::paragraph(vec![Inline::text("deep")]);
        for _ in 0..10 {
            block = Block::List(List::bullet(vec![ListItem::new(vec![block])]));
        }
        let document = Document::new(vec![block]);

        let shallow = Renderer::new().with_options(RenderOptions::default().with_max_depth(8));
        let err = shallow.render(&document).unwrap_err();
        assert!(
            matches!(err, RenderError::DepthLimit { limit: 8 }),
            "Expected DepthLimit, got {err:?}"
        );
        assert!(Renderer::new().render(&document).is_ok());
    }

    #[test]
    fn test_offset_encodings() {
        let document = Document::new(vec![Block::paragraph(vec![
            Inline::text("😀 "),
            Inline::emphasis('*', 2, vec![Inline::text("é")]),
        ])]);
        for (encoding, offset) in [
            (OffsetEncoding::Utf16, 3),
            (OffsetEncoding::Utf8, 5),
            (OffsetEncoding::Chars, 2),
        ] {
            let output = Renderer::new()
                .with_options(RenderOptions::default().with_offset_encoding(encoding))
                .render(&document)
                .unwrap();
            assert_eq!(output.spans[0].offset, offset, "{encoding:?}");
            assert_eq!(output.span_text(&output.spans[0]), Some("é"));
        }
    }

    #[test]
    fn test_crlf_default_newline() {
        let document = Document::new(vec![
            Block::paragraph(vec![Inline::text("a")]),
            Block::paragraph(vec![Inline::text("b")]),
        ]);
        let output = Renderer::new()
            .with_options(RenderOptions::default().with_newline(Newline::CrLf))
            .render(&document)
            .unwrap();
        assert_eq!(output.text, "a\r\nb");
    }

    #[test]
    fn test_renderer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Renderer>();
    }

    #[test]
    fn test_emphasis_from_markdown() {
        let output = to_telegram("hello *world*").unwrap();
        assert_eq!(output.text, "hello world");
        assert_eq!(output.spans.len(), 1);
        assert_eq!(output.spans[0].kind, SpanKind::Bold);
        assert_eq!((output.spans[0].offset, output.spans[0].length), (6, 5));
    }

    #[test]
    fn test_code_block_span_covers_every_line() {
        let output = to_telegram("```\na\nb\n```\n").unwrap();
        assert_eq!(output.text, "a\nb\n");
        assert_eq!(output.spans.len(), 1);
        assert_eq!(output.spans[0].kind, SpanKind::Pre);
        assert_eq!((output.spans[0].offset, output.spans[0].length), (0, 4));
    }

    #[test]
    fn test_tight_ordered_list() {
        let output = to_telegram("1. x\n2. y\n").unwrap();
        assert_eq!(output.text, "1. x\n2. y\n");
        assert!(output.spans.is_empty());

        let output = to_telegram("7. a\n8. b\n9. c\n").unwrap();
        assert_eq!(output.text, "7. a\n8. b\n9. c\n");
    }

    #[test]
    fn test_ordered_list_renumbers_from_start() {
        let output = to_telegram("3. a\n9. b\n1. c\n").unwrap();
        assert_eq!(output.text, "3. a\n4. b\n5. c\n");
    }

    #[test]
    fn test_code_block_in_container_leaves_no_dangling_prefix() {
        let output = to_telegram("- a\n  ```\n  c\n  ```\n- b\n").unwrap();
        assert_eq!(output.text, "- a\n  c\n- b\n");

        let output = to_telegram("> ```\n> a\n> ```\n").unwrap();
        assert_eq!(output.text, "> a\n");
        assert_eq!(output.span_text(&output.spans[0]), Some("a\n"));
    }

    #[test]
    fn test_deep_nesting_fails_without_overflow() {
        let err = to_telegram(&">".repeat(100_000)).unwrap_err();
        assert!(
            matches!(err, RenderError::DepthLimit { limit: DEFAULT_MAX_DEPTH }),
            "Expected DepthLimit, got {err:?}"
        );
    }

    #[test]
    fn test_emoji_counted_in_offsets() {
        let output = to_telegram(":smile: **b**").unwrap();
        assert_eq!(output.text, "😄 b");
        assert_eq!((output.spans[0].offset, output.spans[0].length), (3, 1));

        let output = Renderer::new()
            .with_options(RenderOptions::default().with_offset_encoding(OffsetEncoding::Utf8))
            .render_markdown(":) **b**")
            .unwrap();
        assert_eq!(output.text, "😃 b");
        assert_eq!(output.spans[0].offset, 5);

        let output = Renderer::new()
            .with_parse_options(ParseOptions::default().with_emoji(false))
            .render_markdown(":smile: **b**")
            .unwrap();
        assert_eq!(output.text, ":smile: b");
        assert_eq!(output.spans[0].offset, 8);
    }

    #[test]
    fn test_empty_quote_keeps_prefix() {
        assert_eq!(to_telegram("> ").unwrap().text, "> ");
    }

    #[test]
    fn test_intercepted_markup_is_dropped() {
        let mut calls = 0;
        let mut interceptor = |_: &str| {
            calls += 1;
            true
        };
        let output = Renderer::new()
            .render_markdown_with("<b>x</b>", &mut interceptor)
            .unwrap();
        assert_eq!(output.text, "x");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_markup_filter_strips_named_tags() {
        let mut filter = crate::MarkupFilter::strip_tags(["b"]);
        let output = Renderer::new()
            .render_markdown_with("<b>x</b> <i>y</i>", &mut filter)
            .unwrap();
        assert_eq!(output.text, "x <i>y</i>");
        assert_eq!(filter.consumed(), 2);
    }

    #[test]
    fn test_email_autolink() {
        let output = to_telegram("<me@example.com>").unwrap();
        assert_eq!(output.text, "me@example.com");
        assert_eq!(output.spans.len(), 1);
        let span = &output.spans[0];
        assert_eq!(span.kind, SpanKind::Url);
        assert_eq!(span.url.as_deref(), Some("mailto:me@example.com"));
        assert_eq!(output.span_text(span), Some("me@example.com"));
    }

    #[test]
    fn test_layout_preserved() {
        for source in [
            "para\n\n> quote\n\nnext\n",
            "# Title\n\nBody\n",
            "- a\n  - b\n- c\n",
            "- a\n\n- b\n",
            "a\r\nb\r\n",
            "a\rb\r",
            "text\n\n\n",
        ] {
            assert_eq!(to_telegram(source).unwrap().text, source);
        }
    }

    #[test]
    fn test_link_definition_and_reference() {
        let output = to_telegram("[foo]: /url\n\n[see][foo]\n").unwrap();
        assert_eq!(output.text, "[foo]: /url\n\nsee\n");
        assert_eq!(output.spans[0].url.as_deref(), Some("/url"));
        assert_eq!(output.span_text(&output.spans[0]), Some("see"));
    }

    #[test]
    fn test_entity_written_as_source() {
        assert_eq!(to_telegram("AT&amp;T").unwrap().text, "AT&amp;T");
    }

    #[test]
    fn test_spans_fit_text_and_render_is_repeatable() {
        let renderer = Renderer::new();
        for source in [
            "hello *world*",
            "- **a**\n- `b`\n",
            "> _q_\n> **r**\n",
            "[l](http://x) ~~s~~",
            "```rs\nx\n```",
            "# *H* 😀 _é_\n",
            "1. *a*\n\n   b\n2. c\n",
        ] {
            let first = renderer.render_markdown(source).unwrap();
            for span in &first.spans {
                assert!(
                    first.span_text(span).is_some(),
                    "span {span:?} out of bounds for {source:?}"
                );
            }
            assert_eq!(renderer.render_markdown(source).unwrap(), first);
        }
    }
}
