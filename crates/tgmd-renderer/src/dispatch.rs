//! Node-kind dispatch.
//!
//! A [`RuleSet`] maps every node kind to the [`NodeRule`] that renders it.
//! Built-in kinds are keyed by [`NodeKind`]; custom blocks and inlines are
//! keyed by their name, so extensions add kinds without touching the
//! dispatcher.

use std::collections::HashMap;
use std::fmt;

use crate::ast::{
    Autolink, Block, CodeBlock, CodeSpan, CustomBlock, CustomInline, Delimiter, Document, Emphasis,
    EmptyBlock, Heading, HtmlBlock, HtmlEntity, HtmlInline, Inline, LineBreak, Link,
    LinkDefinition, LinkDefinitionGroup, List, ListItem, Literal, Paragraph, Quote, ThematicBreak,
};
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::rules;

/// Built-in node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading,
    CodeBlock,
    List,
    ListItem,
    Quote,
    ThematicBreak,
    HtmlBlock,
    LinkDefinition,
    LinkDefinitionGroup,
    EmptyBlock,
    Literal,
    Emphasis,
    CodeSpan,
    Autolink,
    Link,
    LineBreak,
    HtmlInline,
    HtmlEntity,
    Delimiter,
    CustomBlock,
    CustomInline,
}

impl NodeKind {
    /// Human-readable kind name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::CodeBlock => "code block",
            Self::List => "list",
            Self::ListItem => "list item",
            Self::Quote => "block quote",
            Self::ThematicBreak => "thematic break",
            Self::HtmlBlock => "html block",
            Self::LinkDefinition => "link reference definition",
            Self::LinkDefinitionGroup => "link reference definition group",
            Self::EmptyBlock => "empty block",
            Self::Literal => "literal",
            Self::Emphasis => "emphasis",
            Self::CodeSpan => "code span",
            Self::Autolink => "autolink",
            Self::Link => "link",
            Self::LineBreak => "line break",
            Self::HtmlInline => "html inline",
            Self::HtmlEntity => "html entity",
            Self::Delimiter => "delimiter",
            Self::CustomBlock => "custom block",
            Self::CustomInline => "custom inline",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of any renderable node.
#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    Document(&'a Document),
    Paragraph(&'a Paragraph),
    Heading(&'a Heading),
    CodeBlock(&'a CodeBlock),
    List(&'a List),
    ListItem(&'a ListItem),
    Quote(&'a Quote),
    ThematicBreak(&'a ThematicBreak),
    HtmlBlock(&'a HtmlBlock),
    LinkDefinition(&'a LinkDefinition),
    LinkDefinitionGroup(&'a LinkDefinitionGroup),
    EmptyBlock(&'a EmptyBlock),
    Literal(&'a Literal),
    Emphasis(&'a Emphasis),
    CodeSpan(&'a CodeSpan),
    Autolink(&'a Autolink),
    Link(&'a Link),
    LineBreak(&'a LineBreak),
    HtmlInline(&'a HtmlInline),
    HtmlEntity(&'a HtmlEntity),
    Delimiter(&'a Delimiter),
    CustomBlock(&'a CustomBlock),
    CustomInline(&'a CustomInline),
}

impl<'a> Node<'a> {
    /// Built-in kind of this node.
    #[must_use]
    pub fn kind(self) -> NodeKind {
        match self {
            Self::Document(_) => NodeKind::Document,
            Self::Paragraph(_) => NodeKind::Paragraph,
            Self::Heading(_) => NodeKind::Heading,
            Self::CodeBlock(_) => NodeKind::CodeBlock,
            Self::List(_) => NodeKind::List,
            Self::ListItem(_) => NodeKind::ListItem,
            Self::Quote(_) => NodeKind::Quote,
            Self::ThematicBreak(_) => NodeKind::ThematicBreak,
            Self::HtmlBlock(_) => NodeKind::HtmlBlock,
            Self::LinkDefinition(_) => NodeKind::LinkDefinition,
            Self::LinkDefinitionGroup(_) => NodeKind::LinkDefinitionGroup,
            Self::EmptyBlock(_) => NodeKind::EmptyBlock,
            Self::Literal(_) => NodeKind::Literal,
            Self::Emphasis(_) => NodeKind::Emphasis,
            Self::CodeSpan(_) => NodeKind::CodeSpan,
            Self::Autolink(_) => NodeKind::Autolink,
            Self::Link(_) => NodeKind::Link,
            Self::LineBreak(_) => NodeKind::LineBreak,
            Self::HtmlInline(_) => NodeKind::HtmlInline,
            Self::HtmlEntity(_) => NodeKind::HtmlEntity,
            Self::Delimiter(_) => NodeKind::Delimiter,
            Self::CustomBlock(_) => NodeKind::CustomBlock,
            Self::CustomInline(_) => NodeKind::CustomInline,
        }
    }

    /// Name used in diagnostics: the custom name for custom nodes, the
    /// built-in kind name otherwise.
    #[must_use]
    pub fn kind_name(self) -> &'a str {
        match self {
            Self::CustomBlock(block) => &block.kind,
            Self::CustomInline(inline) => &inline.kind,
            other => other.kind().as_str(),
        }
    }
}

impl<'a> From<&'a Block> for Node<'a> {
    fn from(block: &'a Block) -> Self {
        match block {
            Block::Paragraph(b) => Self::Paragraph(b),
            Block::Heading(b) => Self::Heading(b),
            Block::CodeBlock(b) => Self::CodeBlock(b),
            Block::List(b) => Self::List(b),
            Block::Quote(b) => Self::Quote(b),
            Block::ThematicBreak(b) => Self::ThematicBreak(b),
            Block::HtmlBlock(b) => Self::HtmlBlock(b),
            Block::LinkDefinition(b) => Self::LinkDefinition(b),
            Block::LinkDefinitionGroup(b) => Self::LinkDefinitionGroup(b),
            Block::EmptyBlock(b) => Self::EmptyBlock(b),
            Block::CustomBlock(b) => Self::CustomBlock(b),
        }
    }
}

impl<'a> From<&'a Inline> for Node<'a> {
    fn from(inline: &'a Inline) -> Self {
        match inline {
            Inline::Literal(i) => Self::Literal(i),
            Inline::Emphasis(i) => Self::Emphasis(i),
            Inline::CodeSpan(i) => Self::CodeSpan(i),
            Inline::Autolink(i) => Self::Autolink(i),
            Inline::Link(i) => Self::Link(i),
            Inline::LineBreak(i) => Self::LineBreak(i),
            Inline::HtmlInline(i) => Self::HtmlInline(i),
            Inline::HtmlEntity(i) => Self::HtmlEntity(i),
            Inline::Delimiter(i) => Self::Delimiter(i),
            Inline::CustomInline(i) => Self::CustomInline(i),
        }
    }
}

impl<'a> From<&'a Document> for Node<'a> {
    fn from(document: &'a Document) -> Self {
        Self::Document(document)
    }
}

/// Renders one node kind.
///
/// Rules write to the context and recurse into children through
/// [`RenderContext::render`]; all side effects stay inside the context.
///
/// Any `Fn(&mut RenderContext, Node) -> Result<(), RenderError>` closure is a
/// rule:
///
/// ```
/// use tgmd_renderer::ast::{Block, Document, Inline};
/// use tgmd_renderer::{Node, NodeKind, RenderContext, RenderError, Renderer};
///
/// let renderer = Renderer::new().with_rule(
///     NodeKind::Literal,
///     |ctx: &mut RenderContext<'_>, node: Node<'_>| -> Result<(), RenderError> {
///         if let Node::Literal(literal) = node {
///             ctx.write(&literal.content.to_uppercase());
///         }
///         Ok(())
///     },
/// );
/// let document = Document::new(vec![Block::paragraph(vec![Inline::text("hi")])]);
/// assert_eq!(renderer.render(&document).unwrap().text, "HI");
/// ```
pub trait NodeRule: Send + Sync {
    /// Render `node` into `ctx`.
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError>;
}

impl<F> NodeRule for F
where
    F: Fn(&mut RenderContext<'_>, Node<'_>) -> Result<(), RenderError> + Send + Sync,
{
    fn render(&self, ctx: &mut RenderContext<'_>, node: Node<'_>) -> Result<(), RenderError> {
        self(ctx, node)
    }
}

/// Registry of rendering rules.
pub struct RuleSet {
    rules: HashMap<NodeKind, Box<dyn NodeRule>>,
    custom: HashMap<String, Box<dyn NodeRule>>,
}

impl RuleSet {
    /// Registry without any rule.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            custom: HashMap::new(),
        }
    }

    /// Registry with a rule for every built-in kind.
    ///
    /// Custom kinds have no default rule.
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.insert(NodeKind::Document, rules::block::DocumentRule);
        set.insert(NodeKind::Paragraph, rules::block::ParagraphRule);
        set.insert(NodeKind::Heading, rules::block::HeadingRule);
        set.insert(NodeKind::CodeBlock, rules::block::CodeBlockRule);
        set.insert(NodeKind::List, rules::block::ListRule);
        set.insert(NodeKind::ListItem, rules::block::ListItemRule);
        set.insert(NodeKind::Quote, rules::block::QuoteRule);
        set.insert(NodeKind::ThematicBreak, rules::block::ThematicBreakRule);
        set.insert(NodeKind::HtmlBlock, rules::block::HtmlBlockRule);
        set.insert(NodeKind::LinkDefinition, rules::block::LinkDefinitionRule);
        set.insert(
            NodeKind::LinkDefinitionGroup,
            rules::block::LinkDefinitionGroupRule,
        );
        set.insert(NodeKind::EmptyBlock, rules::block::EmptyBlockRule);
        set.insert(NodeKind::Literal, rules::inline::LiteralRule);
        set.insert(NodeKind::Emphasis, rules::inline::EmphasisRule);
        set.insert(NodeKind::CodeSpan, rules::inline::CodeSpanRule);
        set.insert(NodeKind::Autolink, rules::inline::AutolinkRule);
        set.insert(NodeKind::Link, rules::inline::LinkRule);
        set.insert(NodeKind::LineBreak, rules::inline::LineBreakRule);
        set.insert(NodeKind::HtmlInline, rules::inline::HtmlInlineRule);
        set.insert(NodeKind::HtmlEntity, rules::inline::HtmlEntityRule);
        set.insert(NodeKind::Delimiter, rules::inline::DelimiterRule);
        set
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_rule<R: NodeRule + 'static>(mut self, kind: NodeKind, rule: R) -> Self {
        self.insert(kind, rule);
        self
    }

    /// Builder form of [`insert_custom`](Self::insert_custom).
    #[must_use]
    pub fn with_custom_rule<R: NodeRule + 'static>(
        mut self,
        name: impl Into<String>,
        rule: R,
    ) -> Self {
        self.insert_custom(name, rule);
        self
    }

    /// Register or replace the rule for a built-in kind.
    pub fn insert<R: NodeRule + 'static>(&mut self, kind: NodeKind, rule: R) {
        self.rules.insert(kind, Box::new(rule));
    }

    /// Register or replace the rule for custom nodes named `name`.
    pub fn insert_custom<R: NodeRule + 'static>(&mut self, name: impl Into<String>, rule: R) {
        self.custom.insert(name.into(), Box::new(rule));
    }

    /// Remove the rule for a built-in kind.
    pub fn remove(&mut self, kind: NodeKind) -> Option<Box<dyn NodeRule>> {
        self.rules.remove(&kind)
    }

    /// Rule that renders `node`, if any.
    #[must_use]
    pub fn get(&self, node: Node<'_>) -> Option<&dyn NodeRule> {
        let rule = match node {
            Node::CustomBlock(block) => self.custom.get(&block.kind),
            Node::CustomInline(inline) => self.custom.get(&inline.kind),
            other => self.rules.get(&other.kind()),
        };
        rule.map(AsRef::as_ref)
    }

    /// Whether a rule is registered for a built-in kind.
    #[must_use]
    pub fn contains(&self, kind: NodeKind) -> bool {
        self.rules.contains_key(&kind)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
