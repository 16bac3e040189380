//! Shared helpers for rendering and parsing.

use pulldown_cmark::HeadingLevel;

/// Number of decimal digits needed to print `value`.
///
/// # Examples
///
/// ```
/// use tgmd_renderer::decimal_digits;
///
/// assert_eq!(decimal_digits(0), 1);
/// assert_eq!(decimal_digits(9), 1);
/// assert_eq!(decimal_digits(10), 2);
/// assert_eq!(decimal_digits(u64::MAX), 20);
/// ```
#[must_use]
pub fn decimal_digits(value: u64) -> usize {
    let mut digits = 1;
    let mut rest = value / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits
}

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_digits_boundaries() {
        for (value, digits) in [(1, 1), (99, 2), (100, 3), (999_999, 6), (1_000_000, 7)] {
            assert_eq!(decimal_digits(value), digits, "digits of {value}");
        }
    }

    #[test]
    fn test_decimal_digits_matches_formatting() {
        for value in [0, 7, 42, 1_000, 123_456_789, u64::MAX] {
            assert_eq!(decimal_digits(value), value.to_string().len());
        }
    }

    #[test]
    fn test_heading_level_to_num() {
        assert_eq!(heading_level_to_num(HeadingLevel::H1), 1);
        assert_eq!(heading_level_to_num(HeadingLevel::H6), 6);
    }
}
