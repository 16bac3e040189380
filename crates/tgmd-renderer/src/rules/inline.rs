//! Inline-level rules.

use crate::context::RenderContext;
use crate::dispatch::{Node, NodeRule};
use crate::error::RenderError;
use crate::span::{SpanKind, SpanStyle};

#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralRule;

impl NodeRule for LiteralRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let literal = expect_node!(node, Literal);
        ctx.write(&literal.content);
        Ok(())
    }
}

/// Emphasis run: `*` is bold, `_` italic, `~` strikethrough. Other
/// delimiters render their content unstyled.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmphasisRule;

impl EmphasisRule {
    fn span_kind(delimiter: char) -> Option<SpanKind> {
        match delimiter {
            '*' => Some(SpanKind::Bold),
            '_' => Some(SpanKind::Italic),
            '~' => Some(SpanKind::Strikethrough),
            _ => None,
        }
    }
}

impl NodeRule for EmphasisRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let emphasis = expect_node!(node, Emphasis);
        match Self::span_kind(emphasis.delimiter) {
            Some(kind) => ctx.with_span(kind, |ctx| ctx.render_inlines(&emphasis.children)),
            None => ctx.render_inlines(&emphasis.children),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeSpanRule;

impl NodeRule for CodeSpanRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let code = expect_node!(node, CodeSpan);
        ctx.with_span(SpanKind::Code, |ctx| {
            ctx.write(&code.content);
            Ok(())
        })
    }
}

/// Autolink: the address is both the visible text and the link target.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutolinkRule;

impl NodeRule for AutolinkRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let autolink = expect_node!(node, Autolink);
        let target = if autolink.is_email {
            format!("mailto:{}", autolink.url)
        } else {
            autolink.url.clone()
        };
        ctx.with_span(SpanStyle::new(SpanKind::Url).with_url(target), |ctx| {
            ctx.write(&autolink.url);
            Ok(())
        })
    }
}

/// Link or image; images show their alt text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkRule;

impl NodeRule for LinkRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let link = expect_node!(node, Link);
        let style = SpanStyle::new(SpanKind::Url).with_url(link.url.as_str());
        ctx.with_span(style, |ctx| ctx.render_inlines(&link.children))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineBreakRule;

impl NodeRule for LineBreakRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let line_break = expect_node!(node, LineBreak);
        ctx.write_line(line_break.newline);
        Ok(())
    }
}

/// Raw inline tag: dropped when the markup interceptor handles it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlInlineRule;

impl NodeRule for HtmlInlineRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let html = expect_node!(node, HtmlInline);
        if !ctx.intercept_markup(&html.tag) {
            ctx.write(&html.tag);
        }
        Ok(())
    }
}

/// Entity reference, written as it appeared in the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEntityRule;

impl NodeRule for HtmlEntityRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let entity = expect_node!(node, HtmlEntity);
        ctx.write(&entity.original);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DelimiterRule;

impl NodeRule for DelimiterRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let delimiter = expect_node!(node, Delimiter);
        ctx.write(&delimiter.literal);
        ctx.render_inlines(&delimiter.children)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::{Autolink, Block, Delimiter, Document, HtmlEntity, Inline, Newline};
    use crate::renderer::Renderer;

    fn render(inlines: Vec<Inline>) -> crate::RenderOutput {
        Renderer::new()
            .render(&Document::new(vec![Block::paragraph(inlines)]))
            .unwrap()
    }

    #[test]
    fn test_emphasis_kinds() {
        let output = render(vec![
            Inline::emphasis('*', 2, vec![Inline::text("b")]),
            Inline::emphasis('_', 1, vec![Inline::text("i")]),
            Inline::emphasis('~', 2, vec![Inline::text("s")]),
            Inline::emphasis('=', 2, vec![Inline::text("m")]),
        ]);
        assert_eq!(output.text, "bism");
        let kinds: Vec<_> = output.spans.iter().map(|s| (s.kind, s.offset)).collect();
        assert_eq!(
            kinds,
            vec![
                (SpanKind::Bold, 0),
                (SpanKind::Italic, 1),
                (SpanKind::Strikethrough, 2),
            ]
        );
    }

    #[test]
    fn test_nested_spans_in_open_order() {
        let output = render(vec![Inline::link(
            "https://example.com",
            vec![
                Inline::text("go "),
                Inline::emphasis('_', 1, vec![Inline::text("now")]),
            ],
        )]);
        assert_eq!(output.text, "go now");
        assert_eq!(output.spans[0].kind, SpanKind::Url);
        assert_eq!(output.spans[0].url.as_deref(), Some("https://example.com"));
        assert_eq!((output.spans[0].offset, output.spans[0].length), (0, 6));
        assert_eq!((output.spans[1].offset, output.spans[1].length), (3, 3));
    }

    #[test]
    fn test_empty_emphasis_keeps_zero_length_span() {
        let output = render(vec![Inline::text("a"), Inline::emphasis('*', 2, Vec::new())]);
        assert_eq!(output.spans.len(), 1);
        assert_eq!((output.spans[0].offset, output.spans[0].length), (1, 0));
    }

    #[test]
    fn test_code_span() {
        let output = render(vec![Inline::text("run "), Inline::code("ls -la")]);
        assert_eq!(output.text, "run ls -la");
        assert_eq!(output.spans[0].kind, SpanKind::Code);
        assert_eq!((output.spans[0].offset, output.spans[0].length), (4, 6));
    }

    #[test]
    fn test_autolink_targets() {
        let output = render(vec![
            Inline::Autolink(Autolink {
                url: "https://a.b".to_owned(),
                is_email: false,
            }),
            Inline::text(" "),
            Inline::Autolink(Autolink {
                url: "me@a.b".to_owned(),
                is_email: true,
            }),
        ]);
        assert_eq!(output.text, "https://a.b me@a.b");
        assert_eq!(output.spans[0].url.as_deref(), Some("https://a.b"));
        assert_eq!(output.spans[1].url.as_deref(), Some("mailto:me@a.b"));
        assert_eq!(output.span_text(&output.spans[1]), Some("me@a.b"));
    }

    #[test]
    fn test_line_break_writes_source_terminator() {
        let output = render(vec![
            Inline::text("a"),
            Inline::line_break(Newline::CrLf),
            Inline::text("b"),
        ]);
        assert_eq!(output.text, "a\r\nb");
    }

    #[test]
    fn test_html_kept_without_interceptor() {
        let output = render(vec![Inline::html("<b>"), Inline::text("x"), Inline::html("</b>")]);
        assert_eq!(output.text, "<b>x</b>");
    }

    #[test]
    fn test_entity_and_delimiter_verbatim() {
        let output = render(vec![
            Inline::HtmlEntity(HtmlEntity {
                original: "&amp;".to_owned(),
                decoded: "&".to_owned(),
            }),
            Inline::Delimiter(Delimiter {
                literal: "~".to_owned(),
                children: vec![Inline::text("x")],
            }),
        ]);
        assert_eq!(output.text, "&amp;~x");
        assert!(output.spans.is_empty());
    }
}
