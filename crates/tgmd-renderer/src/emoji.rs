//! Emoji shortcodes (`:tada:`) and smileys (`:-)`) in text.
//!
//! A match only counts at the start of a text run or after whitespace, and the
//! longest candidate wins, so `:smile:` beats the `:s` smiley.

use std::borrow::Cow;

/// Smileys and the shortcode each one stands for.
const SMILEYS: &[(&str, &str)] = &[
    (">:(", "angry"),
    (">:-(", "angry"),
    (":\")", "blush"),
    (":-\")", "blush"),
    ("</3", "broken_heart"),
    (":/", "confused"),
    (":-/", "confused"),
    (":'(", "cry"),
    (":'-(", "cry"),
    (":,(", "cry"),
    (":,-(", "cry"),
    (":(", "disappointed"),
    (":-(", "disappointed"),
    ("<3", "heart"),
    ("]:(", "imp"),
    ("]:-(", "imp"),
    ("o:)", "innocent"),
    ("O:)", "innocent"),
    ("o:-)", "innocent"),
    ("O:-)", "innocent"),
    ("0:)", "innocent"),
    ("0:-)", "innocent"),
    (":')", "joy"),
    (":'-)", "joy"),
    (":,)", "joy"),
    (":,-)", "joy"),
    (":'D", "joy"),
    (":'-D", "joy"),
    (":,D", "joy"),
    (":,-D", "joy"),
    (":*", "kissing"),
    (":-*", "kissing"),
    ("x-)", "laughing"),
    ("X-)", "laughing"),
    (":|", "neutral_face"),
    (":-|", "neutral_face"),
    (":o", "open_mouth"),
    (":-o", "open_mouth"),
    (":O", "open_mouth"),
    (":-O", "open_mouth"),
    (":@", "rage"),
    (":-@", "rage"),
    (":D", "smile"),
    (":-D", "smile"),
    (":)", "smiley"),
    (":-)", "smiley"),
    ("]:)", "smiling_imp"),
    ("]:-)", "smiling_imp"),
    (":,'(", "sob"),
    (":,'-(", "sob"),
    (";(", "sob"),
    (";-(", "sob"),
    (":P", "stuck_out_tongue"),
    (":-P", "stuck_out_tongue"),
    ("8-)", "sunglasses"),
    ("B-)", "sunglasses"),
    (",:(", "sweat"),
    (",:-(", "sweat"),
    (",:)", "sweat_smile"),
    (",:-)", "sweat_smile"),
    (":s", "unamused"),
    (":-S", "unamused"),
    (";)", "wink"),
    (";-)", "wink"),
];

/// Replace shortcodes and smileys in `text`.
///
/// `at_boundary` tells whether the character before `text` was whitespace
/// (or there was none).
pub(crate) fn replace(text: &str, at_boundary: bool) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut boundary = at_boundary;
    let mut index = 0;
    while let Some(ch) = text[index..].chars().next() {
        if boundary && let Some((emoji, matched)) = lookup(&text[index..]) {
            out.push_str(&text[copied..index]);
            out.push_str(emoji);
            index += matched;
            copied = index;
            boundary = false;
            continue;
        }
        boundary = ch.is_whitespace();
        index += ch.len_utf8();
    }
    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

/// Emoji and matched length for the longest candidate at the start of `rest`.
fn lookup(rest: &str) -> Option<(&'static str, usize)> {
    shortcode(rest).or_else(|| smiley(rest))
}

fn shortcode(rest: &str) -> Option<(&'static str, usize)> {
    let name = rest.strip_prefix(':')?;
    let end = name.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))?;
    if end == 0 || !name[end..].starts_with(':') {
        return None;
    }
    let emoji = emojis::get_by_shortcode(&name[..end])?;
    Some((emoji.as_str(), end + 2))
}

fn smiley(rest: &str) -> Option<(&'static str, usize)> {
    let (smiley, name) = SMILEYS
        .iter()
        .filter(|(smiley, _)| rest.starts_with(smiley))
        .max_by_key(|(smiley, _)| smiley.len())?;
    let emoji = emojis::get_by_shortcode(name)?;
    Some((emoji.as_str(), smiley.len()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_shortcode_replaced() {
        assert_eq!(replace(":smile: hi", true), "😄 hi");
        assert_eq!(replace("go :+1:", true), "go 👍");
    }

    #[test]
    fn test_smileys_replaced() {
        assert_eq!(replace("ok :) and ;-)", true), "ok 😃 and 😉");
        let heart = emojis::get_by_shortcode("heart").unwrap().as_str();
        assert_eq!(replace("I <3 it", true), format!("I {heart} it"));
    }

    #[test]
    fn test_longest_match_wins() {
        assert_eq!(replace(":-D", true), "😄");
        assert_eq!(replace(":smile:", true), "😄");
    }

    #[test]
    fn test_requires_whitespace_before() {
        assert!(matches!(replace("a:smile:", true), Cow::Borrowed("a:smile:")));
        assert_eq!(replace(":smile:", false), ":smile:");
        assert_eq!(replace("see https://x", true), "see https://x");
    }

    #[test]
    fn test_unknown_shortcode_kept() {
        assert_eq!(replace(":not_an_emoji_name:", true), ":not_an_emoji_name:");
    }

    #[test]
    fn test_adjacent_matches_need_whitespace() {
        assert_eq!(replace(":smile::smile: :smile:", true), "😄:smile: 😄");
    }
}
