//! Style spans and the tracker that records them during a render pass.

use std::fmt;

use crate::error::RenderError;

/// Formatting applied to a range of the rendered text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SpanKind {
    Bold,
    Italic,
    Strikethrough,
    /// Inline code.
    Code,
    /// Code block.
    Pre,
    /// Link; the target is carried in [`Span::url`].
    Url,
    Unknown,
}

impl SpanKind {
    /// Lowercase name, as used in the chat platform's entity types.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Strikethrough => "strikethrough",
            Self::Code => "code",
            Self::Pre => "pre",
            Self::Url => "url",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formatted range of the rendered text.
///
/// Offsets and lengths are measured in the render pass's
/// [`OffsetEncoding`](crate::OffsetEncoding).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: SpanKind,
    /// Link target of [`SpanKind::Url`] spans.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub url: Option<String>,
    /// Language of [`SpanKind::Pre`] spans.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub language: Option<String>,
}

impl Span {
    /// Offset one past the last covered unit.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Style of a span about to be opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanStyle {
    pub kind: SpanKind,
    pub url: Option<String>,
    pub language: Option<String>,
}

impl SpanStyle {
    #[must_use]
    pub fn new(kind: SpanKind) -> Self {
        Self {
            kind,
            url: None,
            language: None,
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(str::to_owned);
        self
    }
}

impl From<SpanKind> for SpanStyle {
    fn from(kind: SpanKind) -> Self {
        Self::new(kind)
    }
}

/// Index of an open span in its tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpanHandle(usize);

/// Records spans in open order.
///
/// The tracker does not enforce nesting; it only guarantees that a span's
/// offset is never mutated after opening and that the finished list contains
/// no unclosed span.
#[derive(Debug, Default)]
pub struct SpanTracker {
    spans: Vec<Span>,
    closed: Vec<bool>,
    open_count: usize,
}

impl SpanTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a span starting at `offset`.
    pub fn open(&mut self, style: SpanStyle, offset: usize) -> SpanHandle {
        self.spans.push(Span {
            offset,
            length: 0,
            kind: style.kind,
            url: style.url,
            language: style.language,
        });
        self.closed.push(false);
        self.open_count += 1;
        SpanHandle(self.spans.len() - 1)
    }

    /// Close a span at `end`.
    ///
    /// Closing an already closed span is a no-op.
    pub fn close(&mut self, handle: SpanHandle, end: usize) {
        let SpanHandle(index) = handle;
        if self.closed[index] {
            tracing::debug!(index, "Span closed twice");
            return;
        }
        let span = &mut self.spans[index];
        span.length = end.saturating_sub(span.offset);
        self.closed[index] = true;
        self.open_count -= 1;
    }

    /// Number of spans opened but not yet closed.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// Number of spans recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Return the finished span list.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnclosedSpan`] for the first span left open.
    pub fn finish(self) -> Result<Vec<Span>, RenderError> {
        if let Some(index) = self.closed.iter().position(|closed| !closed) {
            let span = &self.spans[index];
            return Err(RenderError::UnclosedSpan {
                kind: span.kind,
                offset: span.offset,
            });
        }
        Ok(self.spans)
    }
}
