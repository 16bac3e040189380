//! Markdown source to document tree.
//!
//! Builds an [`ast::Document`](crate::ast::Document) from `pulldown-cmark`'s
//! offset event stream. The events carry structure; the source ranges they
//! point at supply what the events drop: delimiter characters, list markers,
//! quote prefixes, line terminators, blank lines and link reference
//! definitions.
//!
//! ```
//! use tgmd_renderer::ast::Block;
//! use tgmd_renderer::parse;
//!
//! let document = parse("# Title\n\nBody\n");
//! assert!(matches!(document.blocks[0], Block::Heading(_)));
//! assert!(matches!(document.blocks[1], Block::Paragraph(_)));
//! ```

use std::collections::VecDeque;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::ast::{
    Autolink, Block, CodeBlock, Delimiter, Document, EmptyBlock, Fence, Heading, HtmlBlock,
    HtmlEntity, Inline, Line, LineBreak, Link, LinkDefinition, LinkDefinitionGroup, List, ListItem,
    Newline, Paragraph, Quote, QuoteLine, ThematicBreak, Trivia,
};
use crate::emoji;
use crate::util::heading_level_to_num;

/// Default cap on container nesting in a parsed tree.
pub const DEFAULT_MAX_NESTING: usize = 256;

/// Parser settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Recognize `~~strikethrough~~`.
    pub strikethrough: bool,
    /// Replace `:shortcode:` names and smileys with emoji.
    pub emoji: bool,
    /// Deepest block or inline container nesting kept in the tree. Deeper
    /// containers are not opened; their content joins the enclosing one.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strikethrough: true,
            emoji: true,
            max_depth: DEFAULT_MAX_NESTING,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn with_strikethrough(mut self, enabled: bool) -> Self {
        self.strikethrough = enabled;
        self
    }

    #[must_use]
    pub fn with_emoji(mut self, enabled: bool) -> Self {
        self.emoji = enabled;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn parser_options(&self) -> Options {
        if self.strikethrough {
            Options::ENABLE_STRIKETHROUGH
        } else {
            Options::empty()
        }
    }
}

/// Parse markdown with default options.
#[must_use]
pub fn parse(markdown: &str) -> Document {
    parse_with(markdown, &ParseOptions::default())
}

/// Parse markdown.
#[must_use]
pub fn parse_with(markdown: &str, options: &ParseOptions) -> Document {
    let parser = Parser::new_ext(markdown, options.parser_options());
    let mut definitions: Vec<Range<usize>> = parser
        .reference_definitions()
        .iter()
        .map(|(_, definition)| definition.span.clone())
        .collect();
    definitions.sort_by_key(|span| span.start);

    let mut builder = TreeBuilder::new(markdown, definitions.into(), options);
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range);
    }
    let document = builder.finish();
    tracing::debug!(
        len = markdown.len(),
        blocks = document.blocks.len(),
        "Parsed markdown"
    );
    document
}

/// End of a source line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LineEnd {
    /// Position of the terminator.
    content_end: usize,
    newline: Newline,
    /// Position after the terminator.
    end: usize,
}

fn line_start(source: &str, pos: usize) -> usize {
    source[..pos].rfind(['\n', '\r']).map_or(0, |i| i + 1)
}

/// Lines end at `\n`, `\r\n` or a lone `\r`.
fn line_end(source: &str, pos: usize) -> LineEnd {
    let Some(offset) = source[pos..].find(['\n', '\r']) else {
        return LineEnd {
            content_end: source.len(),
            newline: Newline::None,
            end: source.len(),
        };
    };
    let content_end = pos + offset;
    let terminator = &source[content_end..];
    let newline = if terminator.starts_with("\r\n") {
        Newline::CrLf
    } else if terminator.starts_with('\r') {
        Newline::Cr
    } else {
        Newline::Lf
    };
    LineEnd {
        content_end,
        newline,
        end: content_end + newline.as_str().len(),
    }
}

/// End of the last line a block spans.
fn block_end(source: &str, start: usize, end: usize) -> LineEnd {
    let content = source[start..end].trim_end_matches(['\n', '\r']);
    line_end(source, start + content.len())
}

/// Terminator inside a soft or hard break's source range.
fn break_newline(raw: &str) -> Newline {
    if raw.contains("\r\n") {
        Newline::CrLf
    } else if raw.contains('\n') {
        Newline::Lf
    } else if raw.contains('\r') {
        Newline::Cr
    } else {
        Newline::Lf
    }
}

fn take_while<'a>(rest: &mut &'a str, pred: impl Fn(char) -> bool) -> &'a str {
    let end = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
    let (taken, remaining) = rest.split_at(end);
    *rest = remaining;
    taken
}

fn find_unescaped(text: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == target {
            return Some(index);
        }
    }
    None
}

/// Split a raw `[label]: url "title"` definition into its parts.
fn parse_definition(raw: &str, newline: Newline, lines_before: Option<Vec<Line>>) -> LinkDefinition {
    let mut rest = raw;
    let before = take_while(&mut rest, char::is_whitespace);
    rest = rest.strip_prefix('[').unwrap_or(rest);
    let label_end = find_unescaped(rest, ']').unwrap_or(rest.len());
    let label = &rest[..label_end];
    rest = &rest[label_end..];
    rest = rest.strip_prefix("]:").unwrap_or(rest);

    let before_url = take_while(&mut rest, char::is_whitespace);
    let (url, url_in_angle_brackets) = if let Some(inner) = rest.strip_prefix('<') {
        let end = inner.find('>').unwrap_or(inner.len());
        rest = inner.get(end + 1..).unwrap_or("");
        (&inner[..end], true)
    } else {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let url = &rest[..end];
        rest = &rest[end..];
        (url, false)
    };

    let spacing = take_while(&mut rest, char::is_whitespace);
    let mut title_delimiter = '"';
    let (before_title, title) = match rest.chars().next() {
        Some(open @ ('"' | '\'' | '(')) => {
            let close = if open == '(' { ')' } else { open };
            let inner = &rest[open.len_utf8()..];
            let end = find_unescaped(inner, close).unwrap_or(inner.len());
            rest = inner.get(end + close.len_utf8()..).unwrap_or("");
            title_delimiter = open;
            (spacing, Some(inner[..end].to_owned()))
        }
        _ => ("", None),
    };
    let after = if title.is_none() {
        format!("{spacing}{rest}")
    } else {
        rest.to_owned()
    };

    LinkDefinition {
        label: label.to_owned(),
        before_url: before_url.to_owned(),
        url: url.to_owned(),
        url_in_angle_brackets,
        before_title: before_title.to_owned(),
        title,
        title_delimiter,
        newline,
        trivia: Trivia {
            lines_before,
            lines_after: Some(Vec::new()),
            before: before.to_owned(),
            after,
        },
    }
}

/// Prefix parts of a quote line, read from the quote's column onwards.
fn quote_line(rest: &str, newline: Newline) -> QuoteLine {
    let mut rest = rest;
    let before = take_while(&mut rest, |c| c == ' ' || c == '\t');
    match rest.strip_prefix('>') {
        Some(after_marker) => QuoteLine {
            before: before.to_owned(),
            marker: true,
            space_after: after_marker.starts_with(' '),
            after: String::new(),
            newline,
        },
        None => QuoteLine {
            newline,
            ..QuoteLine::default()
        },
    }
}

#[derive(Debug)]
enum ContainerKind {
    Document,
    Quote { start: usize },
    List(List),
    Item,
}

#[derive(Debug)]
struct Container {
    kind: ContainerKind,
    blocks: Vec<Block>,
    lines_before: Option<Vec<Line>>,
}

impl Container {
    fn new(kind: ContainerKind, lines_before: Option<Vec<Line>>) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            lines_before,
        }
    }
}

#[derive(Debug)]
enum LeafKind {
    Paragraph { implicit: bool },
    Heading { level: u8 },
    Code { text: String, info: Option<String> },
    Html { text: String },
}

#[derive(Debug)]
struct Leaf {
    kind: LeafKind,
    start: usize,
    /// Furthest source position seen inside the leaf.
    end: usize,
    lines_before: Option<Vec<Line>>,
}

#[derive(Debug)]
enum FrameKind {
    Root,
    Emphasis {
        delimiter: char,
        count: usize,
    },
    Strikethrough {
        run: usize,
    },
    Link {
        link_type: LinkType,
        url: String,
        title: String,
        is_image: bool,
    },
}

#[derive(Debug)]
struct InlineFrame {
    kind: FrameKind,
    children: Vec<Inline>,
}

impl InlineFrame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    fn push(&mut self, inline: Inline) {
        if let (Some(Inline::Literal(previous)), Inline::Literal(next)) =
            (self.children.last_mut(), &inline)
        {
            previous.content.push_str(&next.content);
            return;
        }
        self.children.push(inline);
    }
}

/// Event-to-tree builder.
///
/// Block containers and inline containers are kept on explicit stacks; the
/// cursor marks the end of the last block's source, so the text between it
/// and the next block is the blank-line gap.
///
/// Containers past `max_depth` are counted instead of opened. Events nest, so
/// while any are counted every end event of that family closes one of them.
struct TreeBuilder<'s> {
    source: &'s str,
    containers: Vec<Container>,
    leaf: Option<Leaf>,
    inlines: Vec<InlineFrame>,
    definitions: VecDeque<Range<usize>>,
    cursor: usize,
    emoji: bool,
    max_depth: usize,
    skipped_containers: usize,
    skipped_frames: usize,
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str, definitions: VecDeque<Range<usize>>, options: &ParseOptions) -> Self {
        Self {
            source,
            containers: vec![Container::new(ContainerKind::Document, None)],
            leaf: None,
            inlines: Vec::new(),
            definitions,
            cursor: 0,
            emoji: options.emoji,
            max_depth: options.max_depth,
            skipped_containers: 0,
            skipped_frames: 0,
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag, range),
            Event::Text(text) => self.text(&text, range),
            Event::Code(code) => self.push_inline(Inline::code(code.into_string()), range),
            Event::Html(html) => self.html(html, range),
            Event::InlineHtml(html) => self.push_inline(Inline::html(html.into_string()), range),
            Event::SoftBreak | Event::HardBreak => {
                let line_break = LineBreak {
                    newline: break_newline(&self.source[range.clone()]),
                    hard: matches!(event, Event::HardBreak),
                };
                self.push_inline(Inline::LineBreak(line_break), range);
            }
            Event::Rule => self.rule(range),
            other => tracing::trace!(event = ?other, "Ignoring unsupported event"),
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        match tag {
            Tag::Paragraph => {
                let lines_before = self.begin_block(range.start);
                self.mark_list_loose();
                self.open_leaf(LeafKind::Paragraph { implicit: false }, range.start, lines_before);
            }
            Tag::Heading { level, .. } => {
                let lines_before = self.begin_block(range.start);
                let level = heading_level_to_num(level);
                self.open_leaf(LeafKind::Heading { level }, range.start, lines_before);
            }
            Tag::CodeBlock(kind) => {
                let lines_before = self.begin_block(range.start);
                let info = match kind {
                    CodeBlockKind::Fenced(info) => Some(info.into_string()),
                    CodeBlockKind::Indented => None,
                };
                let kind = LeafKind::Code {
                    text: String::new(),
                    info,
                };
                self.open_leaf(kind, range.start, lines_before);
            }
            Tag::HtmlBlock => {
                let lines_before = self.begin_block(range.start);
                let kind = LeafKind::Html {
                    text: String::new(),
                };
                self.open_leaf(kind, range.start, lines_before);
            }
            Tag::BlockQuote(_) => {
                if !self.enter_container(1) {
                    return;
                }
                let lines_before = self.begin_block(range.start);
                let kind = ContainerKind::Quote { start: range.start };
                self.containers.push(Container::new(kind, lines_before));
            }
            Tag::List(first_number) => {
                // Room for the list and its items.
                if !self.enter_container(2) {
                    return;
                }
                let lines_before = self.begin_block(range.start);
                let list = self.list_attributes(range.start, first_number);
                self.containers
                    .push(Container::new(ContainerKind::List(list), lines_before));
            }
            Tag::Item => {
                if self.skipped_containers > 0 {
                    self.skipped_containers += 1;
                    return;
                }
                self.close_implicit_paragraph();
                self.cursor = range.start;
                self.containers.push(Container::new(ContainerKind::Item, None));
            }
            Tag::Emphasis | Tag::Strong => {
                let delimiter = self.source[range.start..].chars().next().unwrap_or('*');
                let count = if matches!(tag, Tag::Strong) { 2 } else { 1 };
                self.open_frame(FrameKind::Emphasis { delimiter, count }, &range);
            }
            Tag::Strikethrough => {
                let run = self.source[range.start..]
                    .chars()
                    .take_while(|&c| c == '~')
                    .count();
                self.open_frame(FrameKind::Strikethrough { run }, &range);
            }
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let kind = FrameKind::Link {
                    link_type,
                    url: dest_url.into_string(),
                    title: title.into_string(),
                    is_image: false,
                };
                self.open_frame(kind, &range);
            }
            Tag::Image {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let kind = FrameKind::Link {
                    link_type,
                    url: dest_url.into_string(),
                    title: title.into_string(),
                    is_image: true,
                };
                self.open_frame(kind, &range);
            }
            other => tracing::trace!(tag = ?other, "Ignoring unsupported tag"),
        }
    }

    fn end(&mut self, tag: TagEnd, range: Range<usize>) {
        match tag {
            TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item
                if self.skipped_containers > 0 =>
            {
                self.skipped_containers -= 1;
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image
                if self.skipped_frames > 0 =>
            {
                self.skipped_frames -= 1;
            }
            TagEnd::Paragraph => self.close_paragraph(range.end),
            TagEnd::Heading(_) => self.close_heading(&range),
            TagEnd::CodeBlock => self.close_code_block(&range),
            TagEnd::HtmlBlock => self.close_html_block(&range),
            TagEnd::BlockQuote(_) => self.close_quote(&range),
            TagEnd::List(_) => self.close_list(),
            TagEnd::Item => self.close_item(range.end),
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => self.close_frame(),
            _ => {}
        }
    }

    /// Whether a container needing `levels` of nesting still fits; counts it
    /// as skipped otherwise.
    fn enter_container(&mut self, levels: usize) -> bool {
        let depth = self.containers.len().saturating_sub(1);
        if self.skipped_containers == 0 && depth + levels <= self.max_depth {
            return true;
        }
        if self.skipped_containers == 0 {
            tracing::debug!(
                max_depth = self.max_depth,
                "Nesting limit reached, folding deeper containers"
            );
        }
        self.skipped_containers += 1;
        false
    }

    /// Prepare for a block starting at `start`: close an open implicit
    /// paragraph, emit pending link definitions and collect the blank lines
    /// since the previous block.
    fn begin_block(&mut self, start: usize) -> Option<Vec<Line>> {
        self.close_implicit_paragraph();
        self.flush_definitions(start);
        let lines = self.gap(line_start(self.source, start));
        self.cursor = self.cursor.max(line_start(self.source, start));
        (!lines.is_empty()).then_some(lines)
    }

    /// Source lines between the cursor's line and `to`.
    ///
    /// Blank lines keep their raw text at document level; inside containers
    /// the text is dropped, since the container prefixes are re-applied by
    /// the renderer.
    fn gap(&self, to: usize) -> Vec<Line> {
        let from = if self.cursor == 0 || self.source[..self.cursor].ends_with(['\n', '\r']) {
            self.cursor
        } else {
            line_end(self.source, self.cursor).end
        };
        if to <= from {
            return Vec::new();
        }
        let lines = Line::split(&self.source[from..to]);
        if self.containers.len() > 1 {
            lines.into_iter().map(|line| Line::blank(line.newline)).collect()
        } else {
            lines
        }
    }

    fn mark_list_loose(&mut self) {
        let depth = self.containers.len();
        if depth < 2 || !matches!(self.containers[depth - 1].kind, ContainerKind::Item) {
            return;
        }
        if let ContainerKind::List(list) = &mut self.containers[depth - 2].kind {
            list.loose = true;
        }
    }

    fn push_block(&mut self, block: Block) {
        if let Some(container) = self.containers.last_mut() {
            container.blocks.push(block);
        }
    }

    fn flush_definitions(&mut self, before: usize) {
        let mut definitions = Vec::new();
        while self.definitions.front().is_some_and(|span| span.start < before) {
            let Some(span) = self.definitions.pop_front() else {
                break;
            };
            let lines = self.gap(line_start(self.source, span.start));
            let lines_before = (!lines.is_empty()).then_some(lines);
            let end = block_end(self.source, span.start, span.end);
            let raw = &self.source[span.start..end.content_end];
            definitions.push(parse_definition(raw, end.newline, lines_before));
            self.cursor = end.end;
        }
        if !definitions.is_empty() {
            self.push_block(Block::LinkDefinitionGroup(LinkDefinitionGroup {
                definitions,
                trivia: Trivia::tracked(),
            }));
        }
    }

    fn list_attributes(&self, start: usize, first_number: Option<u64>) -> List {
        let marker = self.source[start..].trim_start_matches([' ', '\t', '>']);
        let Some(number) = first_number else {
            let bullet = marker
                .chars()
                .next()
                .filter(|c| matches!(c, '-' | '*' | '+'))
                .unwrap_or('-');
            let mut list = List::bullet(Vec::new());
            list.bullet = bullet;
            return list;
        };
        let digits_end = marker
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(marker.len());
        let digits = &marker[..digits_end];
        let delimiter = marker[digits_end..]
            .chars()
            .next()
            .filter(|c| matches!(c, '.' | ')'))
            .unwrap_or('.');
        let start = if digits.is_empty() {
            number.to_string()
        } else {
            digits.to_owned()
        };
        let mut list = List::ordered(start, Vec::new());
        list.delimiter = delimiter;
        list
    }

    fn open_leaf(&mut self, kind: LeafKind, start: usize, lines_before: Option<Vec<Line>>) {
        self.leaf = Some(Leaf {
            kind,
            start,
            end: start,
            lines_before,
        });
        self.inlines = vec![InlineFrame::new(FrameKind::Root)];
    }

    /// Open an implicit paragraph for inline content of a tight list item.
    fn ensure_inline_leaf(&mut self, range: &Range<usize>) {
        if self.leaf.is_none() {
            let lines_before = self.begin_block(range.start);
            self.open_leaf(
                LeafKind::Paragraph { implicit: true },
                range.start,
                lines_before,
            );
        }
        if let Some(leaf) = &mut self.leaf {
            leaf.end = leaf.end.max(range.end);
        }
    }

    fn push_inline(&mut self, inline: Inline, range: Range<usize>) {
        self.ensure_inline_leaf(&range);
        if let Some(frame) = self.inlines.last_mut() {
            frame.push(inline);
        }
    }

    fn text(&mut self, text: &str, range: Range<usize>) {
        if let Some(Leaf {
            kind: LeafKind::Code { text: buffer, .. } | LeafKind::Html { text: buffer },
            ..
        }) = &mut self.leaf
        {
            buffer.push_str(text);
            return;
        }
        let raw = &self.source[range.clone()];
        let inline = if raw != text && raw.starts_with('&') && raw.ends_with(';') {
            Inline::HtmlEntity(HtmlEntity {
                original: raw.to_owned(),
                decoded: text.to_owned(),
            })
        } else if self.emoji {
            let at_boundary = self.source[..range.start]
                .chars()
                .next_back()
                .is_none_or(char::is_whitespace);
            Inline::text(emoji::replace(text, at_boundary))
        } else {
            Inline::text(text)
        };
        self.push_inline(inline, range);
    }

    fn html(&mut self, html: CowStr<'_>, range: Range<usize>) {
        if let Some(Leaf {
            kind: LeafKind::Html { text },
            ..
        }) = &mut self.leaf
        {
            text.push_str(&html);
            return;
        }
        self.push_inline(Inline::html(html.into_string()), range);
    }

    fn rule(&mut self, range: Range<usize>) {
        let lines_before = self.begin_block(range.start);
        let end = block_end(self.source, range.start, range.end);
        let content = self.source[range.start..end.content_end].to_owned();
        self.push_block(Block::ThematicBreak(ThematicBreak {
            content,
            newline: end.newline,
            trivia: Trivia {
                lines_before,
                ..Trivia::tracked()
            },
        }));
        self.cursor = end.end;
    }

    fn open_frame(&mut self, kind: FrameKind, range: &Range<usize>) {
        self.ensure_inline_leaf(range);
        // The root frame does not count towards the nesting.
        if self.skipped_frames > 0 || self.inlines.len() > self.max_depth {
            self.skipped_frames += 1;
            return;
        }
        self.inlines.push(InlineFrame::new(kind));
    }

    fn close_frame(&mut self) {
        if self.inlines.len() < 2 {
            return;
        }
        let Some(frame) = self.inlines.pop() else {
            return;
        };
        let children = frame.children;
        let inlines = match frame.kind {
            FrameKind::Root => children,
            FrameKind::Emphasis { delimiter, count } => {
                vec![Inline::emphasis(delimiter, count, children)]
            }
            FrameKind::Strikethrough { run: 2 } => vec![Inline::emphasis('~', 2, children)],
            // Only double tildes strike through; other runs stay literal.
            FrameKind::Strikethrough { run } => {
                let marks = "~".repeat(run);
                vec![
                    Inline::Delimiter(Delimiter {
                        literal: marks.clone(),
                        children,
                    }),
                    Inline::text(marks),
                ]
            }
            FrameKind::Link {
                link_type: LinkType::Autolink,
                url,
                ..
            } => vec![Inline::Autolink(Autolink {
                url,
                is_email: false,
            })],
            FrameKind::Link {
                link_type: LinkType::Email,
                url,
                ..
            } => {
                let address = url.strip_prefix("mailto:").unwrap_or(&url).to_owned();
                vec![Inline::Autolink(Autolink {
                    url: address,
                    is_email: true,
                })]
            }
            FrameKind::Link {
                url,
                title,
                is_image,
                ..
            } => vec![Inline::Link(Link {
                url,
                title: (!title.is_empty()).then_some(title),
                is_image,
                children,
            })],
        };
        if let Some(parent) = self.inlines.last_mut() {
            for inline in inlines {
                parent.push(inline);
            }
        }
    }

    /// Fold any unclosed inline frames and return the leaf's inlines.
    fn take_inlines(&mut self) -> Vec<Inline> {
        while self.inlines.len() > 1 {
            self.close_frame();
        }
        self.inlines
            .pop()
            .map(|frame| frame.children)
            .unwrap_or_default()
    }

    fn close_implicit_paragraph(&mut self) {
        let end = match &self.leaf {
            Some(Leaf {
                kind: LeafKind::Paragraph { implicit: true },
                end,
                ..
            }) => *end,
            _ => return,
        };
        self.close_paragraph(end);
    }

    fn close_paragraph(&mut self, end: usize) {
        let Some(leaf) = self.leaf.take() else {
            return;
        };
        let mut inlines = self.take_inlines();
        let last_line = block_end(self.source, leaf.start, end.max(leaf.end));
        if !last_line.newline.is_none() {
            inlines.push(Inline::line_break(last_line.newline));
        }
        self.push_block(Block::Paragraph(Paragraph {
            inlines,
            trivia: Trivia {
                lines_before: leaf.lines_before,
                ..Trivia::tracked()
            },
        }));
        self.cursor = last_line.end;
    }

    fn close_heading(&mut self, range: &Range<usize>) {
        let Some(leaf) = self.leaf.take() else {
            return;
        };
        let LeafKind::Heading { level } = leaf.kind else {
            return;
        };
        let inlines = self.take_inlines();
        let last_line = block_end(self.source, range.start, range.end);
        self.push_block(Block::Heading(Heading {
            level,
            inlines,
            newline: last_line.newline,
            trivia: Trivia {
                lines_before: leaf.lines_before,
                ..Trivia::tracked()
            },
        }));
        self.cursor = last_line.end;
    }

    fn close_code_block(&mut self, range: &Range<usize>) {
        let Some(leaf) = self.leaf.take() else {
            return;
        };
        let LeafKind::Code { text, info } = leaf.kind else {
            return;
        };
        self.inlines.clear();
        let last_line = block_end(self.source, range.start, range.end);
        let fence = info.map(|info| self.fence(info, range.start, last_line));
        self.push_block(Block::CodeBlock(CodeBlock {
            lines: Line::split(&text),
            fence,
            trivia: Trivia {
                lines_before: leaf.lines_before,
                ..Trivia::tracked()
            },
        }));
        self.cursor = last_line.end;
    }

    /// Opening and closing fence lines of a fenced code block.
    fn fence(&self, info: String, start: usize, last_line: LineEnd) -> Fence {
        let first_line = line_end(self.source, start);
        let opening_text = &self.source[start..first_line.content_end];
        let fence_char = opening_text.trim_start().chars().next().unwrap_or('`');

        let last_start = line_start(self.source, last_line.content_end);
        let closing = (last_start > start)
            .then(|| {
                self.source[last_start..last_line.content_end]
                    .trim_start_matches(|c: char| c == '>' || c.is_whitespace())
            })
            .filter(|candidate| {
                let marks = candidate.trim_end();
                marks.len() >= 3 && marks.chars().all(|c| c == fence_char)
            })
            .map(|candidate| Line::new(candidate, last_line.newline));

        Fence {
            info,
            opening: Line::new(opening_text, first_line.newline),
            closing,
        }
    }

    fn close_html_block(&mut self, range: &Range<usize>) {
        let Some(leaf) = self.leaf.take() else {
            return;
        };
        let LeafKind::Html { text } = leaf.kind else {
            return;
        };
        self.inlines.clear();
        self.push_block(Block::HtmlBlock(HtmlBlock {
            lines: Line::split(&text),
            trivia: Trivia {
                lines_before: leaf.lines_before,
                ..Trivia::tracked()
            },
        }));
        self.cursor = block_end(self.source, range.start, range.end).end;
    }

    fn close_quote(&mut self, range: &Range<usize>) {
        self.close_implicit_paragraph();
        self.flush_definitions(range.end);
        let last_line = block_end(self.source, range.start, range.end);

        // Trailing blank quote lines belong to the last child.
        let trailing = self.gap(last_line.end);
        let Some(mut container) = self.containers.pop() else {
            return;
        };
        if !trailing.is_empty()
            && let Some(last) = container.blocks.last_mut()
        {
            last.trivia_mut().lines_after = Some(trailing);
        }

        let ContainerKind::Quote { start } = container.kind else {
            return;
        };
        let column = start - line_start(self.source, start);
        let first_line = line_start(self.source, start);
        let lines = Line::split(&self.source[first_line..last_line.end])
            .iter()
            .map(|line| {
                let rest = line
                    .text
                    .get(column..)
                    .unwrap_or_else(|| line.text.trim_start());
                quote_line(rest, line.newline)
            })
            .collect();

        self.push_block(Block::Quote(Quote {
            lines,
            children: container.blocks,
            trivia: Trivia {
                lines_before: container.lines_before,
                ..Trivia::tracked()
            },
        }));
        self.cursor = self.cursor.max(last_line.end);
    }

    fn close_item(&mut self, end: usize) {
        self.close_implicit_paragraph();
        self.flush_definitions(end);
        let Some(container) = self.containers.pop() else {
            return;
        };
        let item = ListItem {
            children: container.blocks,
            trivia: Trivia::tracked(),
        };
        if let Some(Container {
            kind: ContainerKind::List(list),
            ..
        }) = self.containers.last_mut()
        {
            list.items.push(item);
        }
    }

    fn close_list(&mut self) {
        let Some(container) = self.containers.pop() else {
            return;
        };
        let ContainerKind::List(mut list) = container.kind else {
            return;
        };
        list.trivia = Trivia {
            lines_before: container.lines_before,
            ..Trivia::tracked()
        };
        self.push_block(Block::List(list));
    }

    fn finish(mut self) -> Document {
        self.close_implicit_paragraph();
        self.flush_definitions(usize::MAX);
        while self.containers.len() > 1 {
            tracing::debug!("Unclosed container at end of input");
            if let Some(container) = self.containers.pop() {
                for block in container.blocks {
                    self.push_block(block);
                }
            }
        }

        let trailing = self.gap(self.source.len());
        let mut blocks = self
            .containers
            .pop()
            .map(|container| container.blocks)
            .unwrap_or_default();
        if !trailing.is_empty() {
            match blocks.last_mut() {
                Some(last) => last.trivia_mut().lines_after = Some(trailing),
                None => blocks.push(Block::EmptyBlock(EmptyBlock {
                    trivia: Trivia {
                        lines_after: Some(trailing),
                        ..Trivia::default()
                    },
                })),
            }
        }
        Document::new(blocks)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn paragraph(block: &Block) -> &Paragraph {
        match block {
            Block::Paragraph(paragraph) => paragraph,
            other => panic!("Expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn test_line_helpers() {
        let source = "ab\r\ncd\nef";
        assert_eq!(line_start(source, 5), 4);
        assert_eq!(
            line_end(source, 0),
            LineEnd {
                content_end: 2,
                newline: Newline::CrLf,
                end: 4
            }
        );
        assert_eq!(line_end(source, 8).newline, Newline::None);
        assert_eq!(block_end(source, 4, 7).end, 7);
    }

    #[test]
    fn test_lone_carriage_return_ends_lines() {
        let source = "a\rb\r";
        assert_eq!(line_start(source, 2), 2);
        assert_eq!(
            line_end(source, 2),
            LineEnd {
                content_end: 3,
                newline: Newline::Cr,
                end: 4
            }
        );

        let document = parse(source);
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(
            paragraph.inlines,
            vec![
                Inline::text("a"),
                Inline::line_break(Newline::Cr),
                Inline::text("b"),
                Inline::line_break(Newline::Cr),
            ]
        );
    }

    #[test]
    fn test_paragraph_breaks_carry_terminators() {
        let document = parse("a\r\nb\n");
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(
            paragraph.inlines,
            vec![
                Inline::text("a"),
                Inline::line_break(Newline::CrLf),
                Inline::text("b"),
                Inline::line_break(Newline::Lf),
            ]
        );
    }

    #[test]
    fn test_blank_lines_become_lines_before() {
        let document = parse("a\n\n\nb\n");
        assert_eq!(document.blocks.len(), 2);
        assert_eq!(
            document.blocks[1].trivia().lines_before,
            Some(vec![Line::blank(Newline::Lf), Line::blank(Newline::Lf)])
        );
        assert_eq!(document.blocks[0].trivia().lines_after, Some(Vec::new()));
    }

    #[test]
    fn test_trailing_blank_lines_recorded_on_last_block() {
        let document = parse("a\n\n");
        assert_eq!(
            document.blocks[0].trivia().lines_after,
            Some(vec![Line::blank(Newline::Lf)])
        );
    }

    #[test]
    fn test_emphasis_delimiters_from_source() {
        let document = parse("*a* _b_ **c**");
        let paragraph = paragraph(&document.blocks[0]);
        let delimiters: Vec<_> = paragraph
            .inlines
            .iter()
            .filter_map(|inline| match inline {
                Inline::Emphasis(emphasis) => Some((emphasis.delimiter, emphasis.count)),
                _ => None,
            })
            .collect();
        assert_eq!(delimiters, vec![('*', 1), ('_', 1), ('*', 2)]);
    }

    #[test]
    fn test_single_tilde_stays_literal() {
        let document = parse("~~a~~ ~b~");
        let paragraph = paragraph(&document.blocks[0]);
        assert!(matches!(&paragraph.inlines[0], Inline::Emphasis(e) if e.delimiter == '~'));
        assert!(
            paragraph
                .inlines
                .iter()
                .any(|inline| matches!(inline, Inline::Delimiter(d) if d.literal == "~"))
        );
    }

    #[test]
    fn test_strikethrough_disabled() {
        let document = parse_with("~~a~~", &ParseOptions::default().with_strikethrough(false));
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(paragraph.inlines, vec![Inline::text("~~a~~")]);
    }

    #[test]
    fn test_list_attributes() {
        let document = parse("3) a\n4) b\n");
        let Block::List(list) = &document.blocks[0] else {
            panic!("Expected list, got {:?}", document.blocks[0]);
        };
        assert!(list.ordered);
        assert_eq!(list.start.as_deref(), Some("3"));
        assert_eq!(list.delimiter, ')');
        assert!(!list.loose);
        assert_eq!(list.items.len(), 2);
        assert!(matches!(list.items[0].children[0], Block::Paragraph(_)));

        let document = parse("+ a\n\n+ b\n");
        let Block::List(list) = &document.blocks[0] else {
            panic!("Expected list, got {:?}", document.blocks[0]);
        };
        assert_eq!(list.bullet, '+');
        assert!(list.loose);
    }

    #[test]
    fn test_quote_lines() {
        let document = parse("> a\n>\n>b\n");
        let Block::Quote(quote) = &document.blocks[0] else {
            panic!("Expected quote, got {:?}", document.blocks[0]);
        };
        let prefixes: Vec<_> = quote.lines.iter().map(QuoteLine::prefix).collect();
        assert_eq!(prefixes, vec!["> ", ">", ">"]);
        assert_eq!(quote.children.len(), 2);
    }

    #[test]
    fn test_fenced_code_block() {
        let document = parse("```rust\nfn main() {}\n```\n");
        let Block::CodeBlock(code) = &document.blocks[0] else {
            panic!("Expected code block, got {:?}", document.blocks[0]);
        };
        assert_eq!(code.lines, vec![Line::new("fn main() {}", Newline::Lf)]);
        assert_eq!(code.language(), Some("rust"));
        let fence = code.fence.as_ref().unwrap();
        assert_eq!(fence.opening, Line::new("```rust", Newline::Lf));
        assert_eq!(fence.closing, Some(Line::new("```", Newline::Lf)));
    }

    #[test]
    fn test_indented_code_block_has_no_fence() {
        let document = parse("    x = 1\n");
        let Block::CodeBlock(code) = &document.blocks[0] else {
            panic!("Expected code block, got {:?}", document.blocks[0]);
        };
        assert!(code.fence.is_none());
        assert_eq!(code.lines, vec![Line::new("x = 1", Newline::Lf)]);
    }

    #[test]
    fn test_email_autolink() {
        let document = parse("<me@example.com>");
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(
            paragraph.inlines,
            vec![Inline::Autolink(Autolink {
                url: "me@example.com".to_owned(),
                is_email: true,
            })]
        );
    }

    #[test]
    fn test_image_is_link_around_alt_text() {
        let document = parse("![alt](/img.png)");
        let paragraph = paragraph(&document.blocks[0]);
        let Inline::Link(link) = &paragraph.inlines[0] else {
            panic!("Expected link, got {:?}", paragraph.inlines[0]);
        };
        assert!(link.is_image);
        assert_eq!(link.url, "/img.png");
        assert_eq!(link.children, vec![Inline::text("alt")]);
    }

    #[test]
    fn test_link_definition_parts() {
        let definition = parse_definition("[Foo Bar]: <my url> 'title'  ", Newline::Lf, None);
        assert_eq!(definition.label, "Foo Bar");
        assert_eq!(definition.before_url, " ");
        assert_eq!(definition.url, "my url");
        assert!(definition.url_in_angle_brackets);
        assert_eq!(definition.before_title, " ");
        assert_eq!(definition.title.as_deref(), Some("title"));
        assert_eq!(definition.title_delimiter, '\'');
        assert_eq!(definition.trivia.after, "  ");
    }

    #[test]
    fn test_link_definition_without_title() {
        let definition = parse_definition("  [a]:/b ", Newline::None, None);
        assert_eq!(definition.trivia.before, "  ");
        assert_eq!(definition.url, "/b");
        assert!(definition.title.is_none());
        assert_eq!(definition.before_title, "");
        assert_eq!(definition.trivia.after, " ");
    }

    #[test]
    fn test_link_definitions_are_grouped() {
        let document = parse("[a]: /a\n[b]: /b\n\ntext\n");
        let Block::LinkDefinitionGroup(group) = &document.blocks[0] else {
            panic!("Expected definition group, got {:?}", document.blocks[0]);
        };
        assert_eq!(group.definitions.len(), 2);
        assert_eq!(group.definitions[1].url, "/b");
        assert!(matches!(document.blocks[1], Block::Paragraph(_)));
    }

    #[test]
    fn test_thematic_break_keeps_source_text() {
        let document = parse("a\n\n- - -\n");
        let Block::ThematicBreak(rule) = &document.blocks[1] else {
            panic!("Expected thematic break, got {:?}", document.blocks[1]);
        };
        assert_eq!(rule.content, "- - -");
        assert_eq!(rule.newline, Newline::Lf);
    }

    #[test]
    fn test_setext_heading() {
        let document = parse("Title\n=====\n");
        let Block::Heading(heading) = &document.blocks[0] else {
            panic!("Expected heading, got {:?}", document.blocks[0]);
        };
        assert_eq!(heading.level, 1);
        assert_eq!(heading.inlines, vec![Inline::text("Title")]);
        assert_eq!(heading.newline, Newline::Lf);
    }

    #[test]
    fn test_deep_quotes_are_capped() {
        let document = parse(&">".repeat(100_000));
        let mut depth = 0;
        let mut blocks = &document.blocks;
        while let Some(Block::Quote(quote)) = blocks.first() {
            depth += 1;
            blocks = &quote.children;
        }
        assert_eq!(depth, DEFAULT_MAX_NESTING);
    }

    #[test]
    fn test_nested_list_folded_past_max_depth() {
        let options = ParseOptions::default().with_max_depth(2);
        let document = parse_with("- a\n  - b\n- c\n", &options);
        let Block::List(list) = &document.blocks[0] else {
            panic!("Expected list, got {:?}", document.blocks[0]);
        };
        assert_eq!(list.items.len(), 2);
        assert!(
            list.items[0]
                .children
                .iter()
                .all(|block| !matches!(block, Block::List(_)))
        );
    }

    #[test]
    fn test_inline_nesting_folded_past_max_depth() {
        let options = ParseOptions::default().with_max_depth(1);
        let document = parse_with("*a **b** c*", &options);
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(
            paragraph.inlines,
            vec![Inline::emphasis('*', 1, vec![Inline::text("a b c")])]
        );
    }

    #[test]
    fn test_emoji_in_text() {
        let document = parse(":smile: *x* :)");
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(paragraph.inlines[0], Inline::text("😄 "));
        assert_eq!(paragraph.inlines[2], Inline::text(" 😃"));

        let document = parse_with(":smile:", &ParseOptions::default().with_emoji(false));
        assert_eq!(self::paragraph(&document.blocks[0]).inlines, vec![Inline::text(":smile:")]);
    }

    #[test]
    fn test_emoji_left_alone_in_code() {
        let document = parse("`:smile:`\n\n    :smile:\n");
        assert_eq!(
            paragraph(&document.blocks[0]).inlines[0],
            Inline::code(":smile:")
        );
        let Block::CodeBlock(code) = &document.blocks[1] else {
            panic!("Expected code block, got {:?}", document.blocks[1]);
        };
        assert_eq!(code.lines, vec![Line::new(":smile:", Newline::Lf)]);
    }

    #[test]
    fn test_emoji_needs_whitespace_before() {
        let document = parse("**a**:smile:");
        let paragraph = paragraph(&document.blocks[0]);
        assert_eq!(paragraph.inlines[1], Inline::text(":smile:"));
    }
}
