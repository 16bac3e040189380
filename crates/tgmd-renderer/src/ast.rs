//! Document tree consumed by the renderer.
//!
//! The tree mirrors a trivia-tracking markdown parse: block containers own
//! blocks, leaf blocks own inlines, and every block carries the insignificant
//! whitespace and blank lines it was surrounded by so the renderer can replay
//! them verbatim.
//!
//! Trees are normally produced by [`crate::parse`], but every node is plain
//! data and can be built by hand:
//!
//! ```
//! use tgmd_renderer::ast::{Block, Document, Inline};
//!
//! let document = Document::new(vec![Block::paragraph(vec![
//!     Inline::text("hello "),
//!     Inline::emphasis('*', 1, vec![Inline::text("world")]),
//! ])]);
//! assert_eq!(document.blocks.len(), 1);
//! ```

/// Line terminator recorded from the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Newline {
    /// The line was the last one of the input and had no terminator.
    #[default]
    None,
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// `\r`
    Cr,
}

impl Newline {
    /// The terminator text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Whether no terminator was recorded.
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Detect the terminator a line ends with.
    ///
    /// ```
    /// use tgmd_renderer::ast::Newline;
    ///
    /// assert_eq!(Newline::detect("a\r\n"), Newline::CrLf);
    /// assert_eq!(Newline::detect("a\n"), Newline::Lf);
    /// assert_eq!(Newline::detect("a"), Newline::None);
    /// ```
    #[must_use]
    pub fn detect(line: &str) -> Self {
        if line.ends_with("\r\n") {
            Self::CrLf
        } else if line.ends_with('\n') {
            Self::Lf
        } else if line.ends_with('\r') {
            Self::Cr
        } else {
            Self::None
        }
    }
}

/// A raw source line without its terminator, plus the terminator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Line {
    /// Line content.
    pub text: String,
    /// Terminator that ended the line in the source.
    pub newline: Newline,
}

impl Line {
    /// Create a line.
    #[must_use]
    pub fn new(text: impl Into<String>, newline: Newline) -> Self {
        Self {
            text: text.into(),
            newline,
        }
    }

    /// Create an empty line that only carries a terminator.
    #[must_use]
    pub fn blank(newline: Newline) -> Self {
        Self::new(String::new(), newline)
    }

    /// Split raw text into lines, keeping each terminator.
    ///
    /// A trailing terminator does not produce an extra empty line.
    #[must_use]
    pub fn split(text: &str) -> Vec<Self> {
        let mut lines = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let Some(at) = rest.find(['\n', '\r']) else {
                lines.push(Self::new(rest, Newline::None));
                break;
            };
            let newline = if rest[at..].starts_with("\r\n") {
                Newline::CrLf
            } else if rest[at..].starts_with('\r') {
                Newline::Cr
            } else {
                Newline::Lf
            };
            lines.push(Self::new(&rest[..at], newline));
            rest = &rest[at + newline.as_str().len()..];
        }
        lines
    }
}

/// Whitespace and blank lines recorded around a block.
///
/// `lines_before`/`lines_after` distinguish "nothing recorded" (`None`) from
/// "recorded, and there was nothing" (`Some(vec![])`). Only unrecorded
/// trailing trivia triggers the default block separator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trivia {
    /// Blank lines preceding the block.
    pub lines_before: Option<Vec<Line>>,
    /// Blank lines following the block.
    pub lines_after: Option<Vec<Line>>,
    /// Inline whitespace before the block's first character.
    pub before: String,
    /// Inline whitespace after the block's last character.
    pub after: String,
}

impl Trivia {
    /// Trivia of a block produced by a trivia-tracking parser that saw no
    /// surrounding blank lines.
    #[must_use]
    pub fn tracked() -> Self {
        Self {
            lines_after: Some(Vec::new()),
            ..Self::default()
        }
    }
}

/// Root of a parsed document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Top-level blocks.
    pub blocks: Vec<Block>,
}

impl Document {
    /// Create a document from its top-level blocks.
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

/// Block-level node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Heading(Heading),
    CodeBlock(CodeBlock),
    List(List),
    Quote(Quote),
    ThematicBreak(ThematicBreak),
    HtmlBlock(HtmlBlock),
    LinkDefinition(LinkDefinition),
    LinkDefinitionGroup(LinkDefinitionGroup),
    EmptyBlock(EmptyBlock),
    /// Block kind contributed by an extension; rendered by a rule registered
    /// under its name.
    CustomBlock(CustomBlock),
}

impl Block {
    /// Paragraph with default trivia.
    #[must_use]
    pub fn paragraph(inlines: Vec<Inline>) -> Self {
        Self::Paragraph(Paragraph {
            inlines,
            trivia: Trivia::default(),
        })
    }

    /// Trivia recorded for this block.
    #[must_use]
    pub fn trivia(&self) -> &Trivia {
        match self {
            Self::Paragraph(b) => &b.trivia,
            Self::Heading(b) => &b.trivia,
            Self::CodeBlock(b) => &b.trivia,
            Self::List(b) => &b.trivia,
            Self::Quote(b) => &b.trivia,
            Self::ThematicBreak(b) => &b.trivia,
            Self::HtmlBlock(b) => &b.trivia,
            Self::LinkDefinition(b) => &b.trivia,
            Self::LinkDefinitionGroup(b) => &b.trivia,
            Self::EmptyBlock(b) => &b.trivia,
            Self::CustomBlock(b) => &b.trivia,
        }
    }

    /// Mutable access to the trivia recorded for this block.
    pub fn trivia_mut(&mut self) -> &mut Trivia {
        match self {
            Self::Paragraph(b) => &mut b.trivia,
            Self::Heading(b) => &mut b.trivia,
            Self::CodeBlock(b) => &mut b.trivia,
            Self::List(b) => &mut b.trivia,
            Self::Quote(b) => &mut b.trivia,
            Self::ThematicBreak(b) => &mut b.trivia,
            Self::HtmlBlock(b) => &mut b.trivia,
            Self::LinkDefinition(b) => &mut b.trivia,
            Self::LinkDefinitionGroup(b) => &mut b.trivia,
            Self::EmptyBlock(b) => &mut b.trivia,
            Self::CustomBlock(b) => &mut b.trivia,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub inlines: Vec<Inline>,
    pub trivia: Trivia,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Heading {
    /// Heading level; 1–6 for well-formed input.
    pub level: u8,
    pub inlines: Vec<Inline>,
    /// Terminator of the heading's last source line.
    pub newline: Newline,
    pub trivia: Trivia,
}

/// Opening and closing fence lines of a fenced code block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fence {
    /// Info string after the opening fence (e.g. `rust ignore`).
    pub info: String,
    /// Opening fence line as written.
    pub opening: Line,
    /// Closing fence line as written, if the block was closed.
    pub closing: Option<Line>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeBlock {
    /// Content lines, fences excluded.
    pub lines: Vec<Line>,
    /// Fence markup; `None` for indented code blocks.
    pub fence: Option<Fence>,
    pub trivia: Trivia,
}

impl CodeBlock {
    /// Language named by the first word of the fence info string.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.fence
            .as_ref()
            .and_then(|fence| fence.info.split_whitespace().next())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    /// Bullet character for unordered lists; `'1'` for decimal ordered lists.
    pub bullet: char,
    /// Delimiter after the number of ordered items (`.` or `)`).
    pub delimiter: char,
    /// Start number exactly as written on the first item.
    pub start: Option<String>,
    /// Whether items are separated by blank lines.
    pub loose: bool,
    pub items: Vec<ListItem>,
    pub trivia: Trivia,
}

impl List {
    /// Unordered list with `-` bullets.
    #[must_use]
    pub fn bullet(items: Vec<ListItem>) -> Self {
        Self {
            ordered: false,
            bullet: '-',
            delimiter: '.',
            start: None,
            loose: false,
            items,
            trivia: Trivia::default(),
        }
    }

    /// Decimal ordered list starting at `start`.
    #[must_use]
    pub fn ordered(start: impl Into<String>, items: Vec<ListItem>) -> Self {
        Self {
            ordered: true,
            bullet: '1',
            delimiter: '.',
            start: Some(start.into()),
            loose: false,
            items,
            trivia: Trivia::default(),
        }
    }

    /// Whether items are numbered with decimal numerals.
    #[must_use]
    pub fn is_decimal(&self) -> bool {
        self.ordered && self.bullet == '1'
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListItem {
    pub children: Vec<Block>,
    pub trivia: Trivia,
}

impl ListItem {
    /// Item with default trivia.
    #[must_use]
    pub fn new(children: Vec<Block>) -> Self {
        Self {
            children,
            trivia: Trivia::default(),
        }
    }
}

/// Prefix parts of one physical line of a block quote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteLine {
    /// Whitespace before the `>` marker.
    pub before: String,
    /// Whether the line carried a `>` marker (lazy continuation lines don't).
    pub marker: bool,
    /// Whether a space followed the marker.
    pub space_after: bool,
    /// Whitespace after the marker and its space.
    pub after: String,
    pub newline: Newline,
}

impl QuoteLine {
    /// The common `> ` line.
    #[must_use]
    pub fn marked(newline: Newline) -> Self {
        Self {
            before: String::new(),
            marker: true,
            space_after: true,
            after: String::new(),
            newline,
        }
    }

    /// Prefix the renderer writes at the start of this line.
    #[must_use]
    pub fn prefix(&self) -> String {
        let mut prefix = String::with_capacity(self.before.len() + self.after.len() + 2);
        prefix.push_str(&self.before);
        if self.marker {
            prefix.push('>');
        }
        if self.space_after {
            prefix.push(' ');
        }
        prefix.push_str(&self.after);
        prefix
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Quote {
    /// One entry per physical source line of the quote.
    pub lines: Vec<QuoteLine>,
    pub children: Vec<Block>,
    pub trivia: Trivia,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThematicBreak {
    /// Break characters as written (e.g. `***`, `- - -`).
    pub content: String,
    pub newline: Newline,
    pub trivia: Trivia,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HtmlBlock {
    pub lines: Vec<Line>,
    pub trivia: Trivia,
}

/// `[label]: url "title"`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkDefinition {
    /// Label text between the brackets, including inner whitespace.
    pub label: String,
    /// Whitespace between `]:` and the URL (may contain a line break).
    pub before_url: String,
    /// URL as written, without angle brackets.
    pub url: String,
    /// Whether the URL was written as `<url>`.
    pub url_in_angle_brackets: bool,
    /// Whitespace between the URL and the title.
    pub before_title: String,
    /// Title as written, without its enclosing characters.
    pub title: Option<String>,
    /// Opening character of the title: `"`, `'` or `(`.
    pub title_delimiter: char,
    pub newline: Newline,
    pub trivia: Trivia,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkDefinitionGroup {
    pub definitions: Vec<LinkDefinition>,
    pub trivia: Trivia,
}

/// Placeholder for a container that parsed to no blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmptyBlock {
    pub trivia: Trivia,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomBlock {
    /// Name the rendering rule is registered under.
    pub kind: String,
    pub children: Vec<Block>,
    pub inlines: Vec<Inline>,
    pub lines: Vec<Line>,
    pub trivia: Trivia,
}

/// Inline-level node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Literal(Literal),
    Emphasis(Emphasis),
    CodeSpan(CodeSpan),
    Autolink(Autolink),
    Link(Link),
    LineBreak(LineBreak),
    HtmlInline(HtmlInline),
    HtmlEntity(HtmlEntity),
    /// Unmatched emphasis markers kept as text.
    Delimiter(Delimiter),
    /// Inline kind contributed by an extension.
    CustomInline(CustomInline),
}

impl Inline {
    /// Literal text.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Literal(Literal {
            content: content.into(),
        })
    }

    /// Emphasis run delimited by `count` × `delimiter`.
    #[must_use]
    pub fn emphasis(delimiter: char, count: usize, children: Vec<Inline>) -> Self {
        Self::Emphasis(Emphasis {
            delimiter,
            count,
            children,
        })
    }

    /// Code span.
    #[must_use]
    pub fn code(content: impl Into<String>) -> Self {
        Self::CodeSpan(CodeSpan {
            content: content.into(),
        })
    }

    /// Line break carrying the source terminator.
    #[must_use]
    pub fn line_break(newline: Newline) -> Self {
        Self::LineBreak(LineBreak {
            newline,
            hard: false,
        })
    }

    /// Link around `children`.
    #[must_use]
    pub fn link(url: impl Into<String>, children: Vec<Inline>) -> Self {
        Self::Link(Link {
            url: url.into(),
            title: None,
            is_image: false,
            children,
        })
    }

    /// Raw inline markup tag.
    #[must_use]
    pub fn html(tag: impl Into<String>) -> Self {
        Self::HtmlInline(HtmlInline { tag: tag.into() })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Literal {
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emphasis {
    /// Delimiter character: `*`, `_` or `~`.
    pub delimiter: char,
    /// Delimiter run length on each side.
    pub count: usize,
    pub children: Vec<Inline>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeSpan {
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Autolink {
    /// Address as written, without angle brackets.
    pub url: String,
    /// Whether the address is an email address.
    pub is_email: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub title: Option<String>,
    /// Image links render their alt text as the link text.
    pub is_image: bool,
    pub children: Vec<Inline>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineBreak {
    pub newline: Newline,
    /// Hard break (`"  \n"` or `"\\\n"`) rather than a soft line ending.
    pub hard: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HtmlInline {
    /// Tag text as written, e.g. `<b>` or `</b>`.
    pub tag: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HtmlEntity {
    /// Entity as written, e.g. `&amp;`.
    pub original: String,
    /// Decoded text, kept for renderers that want it.
    pub decoded: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delimiter {
    /// Delimiter characters as written.
    pub literal: String,
    pub children: Vec<Inline>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomInline {
    /// Name the rendering rule is registered under.
    pub kind: String,
    pub content: String,
    pub children: Vec<Inline>,
}
