//! Output buffer with lazily applied line indentation.
//!
//! Indentation prefixes are not written when a line break is emitted but on
//! the first write that follows it, so that a container popped right after a
//! line break does not leave a dangling prefix behind.

use crate::ast::Newline;

/// Unit in which span offsets and lengths are measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum OffsetEncoding {
    /// UTF-16 code units, the unit chat platforms count entities in.
    #[default]
    Utf16,
    /// UTF-8 bytes (Rust string indices).
    Utf8,
    /// Unicode scalar values.
    Chars,
}

impl OffsetEncoding {
    /// Length of `text` in this unit.
    #[must_use]
    pub fn measure(self, text: &str) -> usize {
        match self {
            Self::Utf16 => text.encode_utf16().count(),
            Self::Utf8 => text.len(),
            Self::Chars => text.chars().count(),
        }
    }

    /// Byte index of the position `units` units into `text`.
    ///
    /// Returns `None` if the position is past the end of `text` or falls
    /// inside a character.
    #[must_use]
    pub fn byte_index(self, text: &str, units: usize) -> Option<usize> {
        if self == Self::Utf8 {
            return text.is_char_boundary(units).then_some(units);
        }
        let mut seen = 0;
        for (index, ch) in text.char_indices() {
            if seen == units {
                return Some(index);
            }
            if seen > units {
                return None;
            }
            seen += match self {
                Self::Utf16 => ch.len_utf16(),
                Self::Utf8 | Self::Chars => 1,
            };
        }
        (seen == units).then_some(text.len())
    }
}

/// Per-line prefix producer pushed while rendering a nested container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Indent {
    /// Same prefix on every line.
    Constant(String),
    /// One prefix per physical line; lines past the end get no prefix.
    PerLine { lines: Vec<String>, position: usize },
}

impl Indent {
    /// Constant prefix.
    #[must_use]
    pub fn constant(prefix: impl Into<String>) -> Self {
        Self::Constant(prefix.into())
    }

    /// Constant prefix of `width` spaces.
    #[must_use]
    pub fn spaces(width: usize) -> Self {
        Self::Constant(" ".repeat(width))
    }

    /// One prefix per line, consumed in order.
    #[must_use]
    pub fn per_line(lines: Vec<String>) -> Self {
        Self::PerLine { lines, position: 0 }
    }

    /// Prefix for the next line.
    fn next(&mut self) -> &str {
        match self {
            Self::Constant(prefix) => prefix,
            Self::PerLine { lines, position } => match lines.get(*position) {
                Some(prefix) => {
                    *position += 1;
                    prefix
                }
                None => "",
            },
        }
    }

    /// Consume the next prefix without writing it.
    pub fn take_next(&mut self) -> String {
        self.next().to_owned()
    }
}

/// Append-only text accumulator.
#[derive(Debug)]
pub struct OutputBuffer {
    text: String,
    len: usize,
    encoding: OffsetEncoding,
    default_newline: Newline,
    at_line_start: bool,
    indents: Vec<Indent>,
}

impl OutputBuffer {
    /// Create an empty buffer positioned at the start of a line.
    #[must_use]
    pub fn new(encoding: OffsetEncoding, default_newline: Newline) -> Self {
        Self {
            text: String::with_capacity(1024),
            len: 0,
            encoding,
            default_newline,
            at_line_start: true,
            indents: Vec::new(),
        }
    }

    /// Current length in the buffer's offset unit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn encoding(&self) -> OffsetEncoding {
        self.encoding
    }

    /// Whether the next write starts a new line.
    #[must_use]
    pub fn is_at_line_start(&self) -> bool {
        self.at_line_start
    }

    /// Write text, applying pending indentation first.
    ///
    /// An empty string writes nothing, not even pending indentation.
    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.flush_indent();
        self.push(text);
    }

    /// Write a single character, applying pending indentation first.
    pub fn write_char(&mut self, ch: char) {
        self.flush_indent();
        let mut buf = [0; 4];
        self.push(ch.encode_utf8(&mut buf));
    }

    /// Write a line terminator, applying pending indentation first.
    ///
    /// A blank line inside a container therefore still receives the
    /// container's prefix. [`Newline::None`] writes nothing but the pending
    /// indentation and leaves the current line open.
    pub fn write_line(&mut self, newline: Newline) {
        self.flush_indent();
        if !newline.is_none() {
            self.push(newline.as_str());
            self.at_line_start = true;
        }
    }

    /// Write the default line terminator.
    pub fn write_default_line(&mut self) {
        self.write_line(self.default_newline);
    }

    /// Terminate the current line unless the buffer is already at a line
    /// start. The terminator is written without indentation.
    pub fn ensure_line(&mut self) {
        if !self.at_line_start {
            self.push(self.default_newline.as_str());
            self.at_line_start = true;
        }
    }

    /// Write pending indentation now, if a line was just started.
    ///
    /// Without active indentation there is nothing pending and the buffer
    /// stays at the line start.
    pub fn flush_indent(&mut self) {
        if !self.at_line_start || self.indents.is_empty() {
            return;
        }
        self.at_line_start = false;
        let encoding = self.encoding;
        for indent in &mut self.indents {
            let prefix = indent.next();
            self.text.push_str(prefix);
            self.len += encoding.measure(prefix);
        }
    }

    pub fn push_indent(&mut self, indent: Indent) {
        self.indents.push(indent);
    }

    pub fn pop_indent(&mut self) -> Option<Indent> {
        self.indents.pop()
    }

    /// Number of active indentation entries.
    #[must_use]
    pub fn indent_depth(&self) -> usize {
        self.indents.len()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.text.push_str(text);
        self.len += self.encoding.measure(text);
        self.at_line_start = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> OutputBuffer {
        OutputBuffer::new(OffsetEncoding::Utf16, Newline::Lf)
    }

    #[test]
    fn test_measure_units() {
        let text = "a😀é";
        assert_eq!(OffsetEncoding::Utf8.measure(text), 7);
        assert_eq!(OffsetEncoding::Utf16.measure(text), 4);
        assert_eq!(OffsetEncoding::Chars.measure(text), 3);
    }

    #[test]
    fn test_byte_index() {
        let text = "a😀é";
        assert_eq!(OffsetEncoding::Utf16.byte_index(text, 1), Some(1));
        assert_eq!(OffsetEncoding::Utf16.byte_index(text, 2), None);
        assert_eq!(OffsetEncoding::Utf16.byte_index(text, 3), Some(5));
        assert_eq!(OffsetEncoding::Utf16.byte_index(text, 4), Some(7));
        assert_eq!(OffsetEncoding::Chars.byte_index(text, 2), Some(5));
        assert_eq!(OffsetEncoding::Utf8.byte_index(text, 2), None);
        assert_eq!(OffsetEncoding::Utf8.byte_index(text, 5), Some(5));
        assert_eq!(OffsetEncoding::Chars.byte_index(text, 4), None);
    }

    #[test]
    fn test_len_tracks_encoding() {
        let mut out = buffer();
        out.write("😀");
        assert_eq!(out.len(), 2);
        assert_eq!(out.as_str().len(), 4);
    }

    #[test]
    fn test_constant_indent_applies_after_line_break() {
        let mut out = buffer();
        out.write("- ");
        out.push_indent(Indent::spaces(2));
        out.write("a");
        out.write_line(Newline::Lf);
        out.write("b");
        out.write_line(Newline::Lf);
        out.pop_indent();
        assert_eq!(out.as_str(), "- a\n  b\n");
    }

    #[test]
    fn test_indent_is_lazy() {
        let mut out = buffer();
        out.push_indent(Indent::constant("> "));
        out.write("a");
        out.write_line(Newline::Lf);
        out.pop_indent();
        out.write("b");
        assert_eq!(out.as_str(), "> a\nb");
    }

    #[test]
    fn test_per_line_indent_runs_out() {
        let mut out = buffer();
        out.push_indent(Indent::per_line(vec!["> ".to_owned(), ">".to_owned()]));
        for text in ["a", "", "c"] {
            out.write(text);
            out.write_line(Newline::Lf);
        }
        assert_eq!(out.as_str(), "> a\n>\nc\n");
    }

    #[test]
    fn test_nested_indents_concatenate() {
        let mut out = buffer();
        out.push_indent(Indent::constant("> "));
        out.push_indent(Indent::spaces(2));
        out.write("x");
        assert_eq!(out.as_str(), ">   x");
        assert_eq!(out.indent_depth(), 2);
    }

    #[test]
    fn test_ensure_line_only_when_mid_line() {
        let mut out = buffer();
        out.ensure_line();
        assert!(out.is_empty());
        out.write("a");
        out.ensure_line();
        out.ensure_line();
        assert_eq!(out.as_str(), "a\n");
    }

    #[test]
    fn test_ensure_line_writes_no_indent() {
        let mut out = buffer();
        out.push_indent(Indent::constant("> "));
        out.write("a");
        out.ensure_line();
        assert_eq!(out.as_str(), "> a\n");
    }

    #[test]
    fn test_empty_write_keeps_indent_pending() {
        let mut out = buffer();
        out.push_indent(Indent::constant("  "));
        out.write("");
        assert!(out.is_empty());
        assert!(out.is_at_line_start());
        out.write_line(Newline::Lf);
        assert_eq!(out.as_str(), "  \n");
    }

    #[test]
    fn test_empty_write_does_not_consume_per_line_prefix() {
        let mut out = buffer();
        out.push_indent(Indent::per_line(vec!["> ".to_owned(), ">".to_owned()]));
        out.write("");
        out.write("a");
        out.write_line(Newline::Lf);
        out.write_line(Newline::Lf);
        assert_eq!(out.as_str(), "> a\n>\n");
    }

    #[test]
    fn test_empty_write_without_indent_stays_at_line_start() {
        let mut out = buffer();
        out.write("");
        assert!(out.is_at_line_start());
        out.ensure_line();
        assert!(out.is_empty());
    }

    #[test]
    fn test_default_newline_crlf() {
        let mut out = OutputBuffer::new(OffsetEncoding::Utf8, Newline::CrLf);
        out.write("a");
        out.write_default_line();
        assert_eq!(out.as_str(), "a\r\n");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_take_next_advances_per_line_indent() {
        let mut indent = Indent::per_line(vec!["1".to_owned(), "2".to_owned()]);
        assert_eq!(indent.take_next(), "1");
        assert_eq!(indent.take_next(), "2");
        assert_eq!(indent.take_next(), "");
    }
}
