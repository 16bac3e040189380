//! Block-level rules.

use crate::ast::{List, QuoteLine};
use crate::context::RenderContext;
use crate::dispatch::{Node, NodeRule};
use crate::error::RenderError;
use crate::span::{SpanKind, SpanStyle};
use crate::util::decimal_digits;
use crate::writer::Indent;

const HEADING_MARKERS: [&str; 6] = ["#", "##", "###", "####", "#####", "######"];

/// Root of the tree: renders the top-level blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRule;

impl NodeRule for DocumentRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let document = expect_node!(node, Document);
        ctx.render_blocks(&document.blocks)
    }
}

/// Paragraph. The closing terminator comes from the paragraph's trailing
/// line-break inline, not from the rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphRule;

impl NodeRule for ParagraphRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let paragraph = expect_node!(node, Paragraph);
        ctx.render_lines_before(&paragraph.trivia);
        ctx.write(&paragraph.trivia.before);
        ctx.render_inlines(&paragraph.inlines)?;
        ctx.render_lines_after(&paragraph.trivia);
        Ok(())
    }
}

/// ATX-style heading: `#` markers, a space, the inline content.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingRule;

impl NodeRule for HeadingRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let heading = expect_node!(node, Heading);
        let level = usize::from(heading.level);
        ctx.render_lines_before(&heading.trivia);
        match level.checked_sub(1).and_then(|i| HEADING_MARKERS.get(i)) {
            Some(marker) => ctx.write(marker),
            None => ctx.write(&"#".repeat(level)),
        }
        ctx.write_char(' ');
        ctx.render_inlines(&heading.inlines)?;
        ctx.write_line(heading.newline);
        ctx.render_lines_after(&heading.trivia);
        Ok(())
    }
}

/// Code block: raw lines inside a `pre` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeBlockRule;

impl NodeRule for CodeBlockRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let code = expect_node!(node, CodeBlock);
        let fence = code
            .fence
            .as_ref()
            .filter(|_| ctx.options().keep_code_fences);

        ctx.render_lines_before(&code.trivia);
        ctx.write(&code.trivia.before);
        if let Some(fence) = fence {
            ctx.write(&fence.opening.text);
            ctx.write_line(fence.opening.newline);
        }
        let style = SpanStyle::new(SpanKind::Pre).with_language(code.language());
        ctx.with_span(style, |ctx| {
            for line in &code.lines {
                ctx.write(&line.text);
                ctx.write_line(line.newline);
            }
            Ok(())
        })?;
        if let Some(closing) = fence.and_then(|fence| fence.closing.as_ref()) {
            ctx.write(&closing.text);
            ctx.write_line(closing.newline);
        }
        ctx.write(&code.trivia.after);
        ctx.render_lines_after(&code.trivia);
        Ok(())
    }
}

/// Ordered or bullet list. Item content is indented by the marker width.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRule;

impl ListRule {
    fn start_index(list: &List) -> u64 {
        if !list.is_decimal() {
            return 0;
        }
        let Some(start) = list.start.as_deref() else {
            return 0;
        };
        start.trim().parse().unwrap_or_else(|_| {
            tracing::debug!(start, "Unparsable ordered list start, numbering from 0");
            0
        })
    }

    fn render_items(ctx: &mut RenderContext<'_>, list: &List) -> Result<(), RenderError> {
        ctx.render_lines_before(&list.trivia);
        let mut index = Self::start_index(list);
        let count = list.items.len();
        for (position, item) in list.items.iter().enumerate() {
            let is_last = position + 1 == count;
            ctx.ensure_line();
            let width = if list.ordered {
                ctx.write(&index.to_string());
                ctx.write_char(list.delimiter);
                decimal_digits(index) + 2
            } else {
                ctx.write_char(list.bullet);
                2
            };
            ctx.write_char(' ');
            ctx.with_indent(Indent::spaces(width), |ctx| ctx.render(Node::ListItem(item)))?;

            let saved = ctx.set_last_in_container(is_last);
            ctx.render_lines_after(&item.trivia);
            ctx.set_last_in_container(saved);

            if list.is_decimal() {
                index = index.saturating_add(1);
            }
            if list.loose && !is_last {
                ctx.ensure_line();
                ctx.write_default_line();
            }
        }
        Ok(())
    }
}

impl NodeRule for ListRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let list = expect_node!(node, List);
        ctx.ensure_line();
        let compact = ctx.set_compact_paragraph(!list.loose);
        let result = Self::render_items(ctx, list);
        ctx.set_compact_paragraph(compact);
        result?;
        ctx.render_lines_after(&list.trivia);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListItemRule;

impl NodeRule for ListItemRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let item = expect_node!(node, ListItem);
        ctx.render_lines_before(&item.trivia);
        ctx.render_blocks(&item.children)
    }
}

/// Block quote: every physical line gets its own recorded prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteRule;

impl NodeRule for QuoteRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let quote = expect_node!(node, Quote);
        ctx.render_lines_before(&quote.trivia);
        ctx.write(&quote.trivia.before);

        let mut indent = Indent::per_line(quote.lines.iter().map(QuoteLine::prefix).collect());
        // Opened mid-line (e.g. right after a list marker): the first prefix
        // belongs on the current line.
        if !ctx.is_at_line_start() {
            let first = indent.take_next();
            ctx.write(&first);
        }

        ctx.with_indent(indent, |ctx| {
            if quote.children.is_empty() {
                // Nothing would flush the prefixes; emit one line per prefix.
                for line in &quote.lines {
                    ctx.write_line(line.newline);
                }
                Ok(())
            } else {
                ctx.render_blocks(&quote.children)
            }
        })?;

        if !quote.children.is_empty() {
            ctx.render_lines_after(&quote.trivia);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThematicBreakRule;

impl NodeRule for ThematicBreakRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let rule = expect_node!(node, ThematicBreak);
        ctx.render_lines_before(&rule.trivia);
        ctx.write(&rule.content);
        ctx.write_line(rule.newline);
        ctx.render_lines_after(&rule.trivia);
        Ok(())
    }
}

/// Raw markup block, written verbatim without spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlBlockRule;

impl NodeRule for HtmlBlockRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let html = expect_node!(node, HtmlBlock);
        ctx.render_lines_before(&html.trivia);
        for line in &html.lines {
            ctx.write(&line.text);
            if line.newline.is_none() {
                ctx.write_default_line();
            } else {
                ctx.write_line(line.newline);
            }
        }
        ctx.render_lines_after(&html.trivia);
        Ok(())
    }
}

/// Link reference definition, reconstructed from its parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkDefinitionRule;

impl NodeRule for LinkDefinitionRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let definition = expect_node!(node, LinkDefinition);
        ctx.render_lines_before(&definition.trivia);
        ctx.write(&definition.trivia.before);
        ctx.write_char('[');
        ctx.write(&definition.label);
        ctx.write("]:");
        ctx.write(&definition.before_url);
        if definition.url_in_angle_brackets {
            ctx.write_char('<');
            ctx.write(&definition.url);
            ctx.write_char('>');
        } else {
            ctx.write(&definition.url);
        }
        ctx.write(&definition.before_title);
        if let Some(title) = &definition.title {
            let open = definition.title_delimiter;
            let close = if open == '(' { ')' } else { open };
            ctx.write_char(open);
            ctx.write(title);
            ctx.write_char(close);
        }
        ctx.write(&definition.trivia.after);
        ctx.write_line(definition.newline);
        ctx.render_lines_after(&definition.trivia);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinkDefinitionGroupRule;

impl NodeRule for LinkDefinitionGroupRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let group = expect_node!(node, LinkDefinitionGroup);
        let count = group.definitions.len();
        let saved = ctx.is_last_in_container();
        let result = group
            .definitions
            .iter()
            .enumerate()
            .try_for_each(|(position, definition)| {
                ctx.set_last_in_container(position + 1 == count);
                ctx.render(Node::LinkDefinition(definition))
            });
        ctx.set_last_in_container(saved);
        result?;
        ctx.render_lines_after(&group.trivia);
        Ok(())
    }
}

/// Placeholder block: only its trailing blank lines are replayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBlockRule;

impl NodeRule for EmptyBlockRule {
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        let empty = expect_node!(node, EmptyBlock);
        ctx.render_lines_after(&empty.trivia);
        Ok(())
    }
}
