//! Interception of raw inline markup tags.

/// Decides what happens to a raw inline markup tag such as `<b>`.
///
/// Returning `true` marks the tag as handled and nothing is written;
/// returning `false` writes the tag unchanged. Any `FnMut(&str) -> bool`
/// closure is an interceptor.
pub trait MarkupInterceptor {
    /// Offer `tag` to the interceptor.
    fn intercept(&mut self, tag: &str) -> bool;
}

impl<F> MarkupInterceptor for F
where
    F: FnMut(&str) -> bool,
{
    fn intercept(&mut self, tag: &str) -> bool {
        self(tag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum FilterMode {
    KeepAll,
    StripAll,
    StripTags(Vec<String>),
}

/// Ready-made interceptor that consumes tags by name.
///
/// # Example
///
/// ```
/// use tgmd_renderer::{MarkupFilter, MarkupInterceptor};
///
/// let mut filter = MarkupFilter::strip_tags(["b", "I"]);
/// assert!(filter.intercept("<b>"));
/// assert!(filter.intercept("</i>"));
/// assert!(!filter.intercept("<span class=\"x\">"));
/// assert_eq!(filter.consumed(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupFilter {
    mode: FilterMode,
    consumed: usize,
}

impl MarkupFilter {
    /// Keep every tag.
    #[must_use]
    pub fn keep_all() -> Self {
        Self::with_mode(FilterMode::KeepAll)
    }

    /// Consume every tag.
    #[must_use]
    pub fn strip_all() -> Self {
        Self::with_mode(FilterMode::StripAll)
    }

    /// Consume opening and closing tags with the given names,
    /// case-insensitively.
    #[must_use]
    pub fn strip_tags<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| name.as_ref().to_ascii_lowercase())
            .collect();
        Self::with_mode(FilterMode::StripTags(names))
    }

    fn with_mode(mode: FilterMode) -> Self {
        Self { mode, consumed: 0 }
    }

    /// Number of tags consumed so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl Default for MarkupFilter {
    fn default() -> Self {
        Self::keep_all()
    }
}

impl MarkupInterceptor for MarkupFilter {
    fn intercept(&mut self, tag: &str) -> bool {
        let handled = match &self.mode {
            FilterMode::KeepAll => false,
            FilterMode::StripAll => true,
            FilterMode::StripTags(names) => {
                tag_name(tag).is_some_and(|name| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            }
        };
        if handled {
            self.consumed += 1;
        }
        handled
    }
}

/// Element name of an opening, closing or self-closing tag.
///
/// Comments, processing instructions and declarations have no name.
fn tag_name(tag: &str) -> Option<&str> {
    let inner = tag.strip_prefix('<')?;
    let inner = inner.strip_prefix('/').unwrap_or(inner);
    let end = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(inner.len());
    let name = &inner[..end];
    (!name.is_empty() && name.starts_with(|c: char| c.is_ascii_alphabetic())).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_name() {
        assert_eq!(tag_name("<b>"), Some("b"));
        assert_eq!(tag_name("</b>"), Some("b"));
        assert_eq!(tag_name("<br/>"), Some("br"));
        assert_eq!(tag_name("<a href=\"x\">"), Some("a"));
        assert_eq!(tag_name("<my-tag>"), Some("my-tag"));
        assert_eq!(tag_name("<!-- c -->"), None);
        assert_eq!(tag_name("<?php ?>"), None);
        assert_eq!(tag_name("b"), None);
    }

    #[test]
    fn test_keep_all_consumes_nothing() {
        let mut filter = MarkupFilter::keep_all();
        assert!(!filter.intercept("<b>"));
        assert_eq!(filter.consumed(), 0);
    }

    #[test]
    fn test_strip_all_counts() {
        let mut filter = MarkupFilter::strip_all();
        assert!(filter.intercept("<b>"));
        assert!(filter.intercept("<!-- x -->"));
        assert_eq!(filter.consumed(), 2);
    }

    #[test]
    fn test_strip_tags_case_insensitive() {
        let mut filter = MarkupFilter::strip_tags(["SPAN"]);
        assert!(filter.intercept("<span>"));
        assert!(filter.intercept("</Span>"));
        assert!(!filter.intercept("<spanner>"));
        assert_eq!(filter.consumed(), 2);
    }

    #[test]
    fn test_closure_interceptor() {
        let mut seen = Vec::new();
        let mut interceptor = |tag: &str| {
            seen.push(tag.to_owned());
            false
        };
        assert!(!interceptor.intercept("<u>"));
        assert_eq!(seen, vec!["<u>".to_owned()]);
    }
}
