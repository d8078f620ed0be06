//! Utility functions for formatting and common text operations
//!
//! Centralizes amount formatting for CLI output plus the small string helpers
//! shared by the tokenizer, the normalizers and the inference engine.

use rust_decimal::Decimal;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Separator style used when rendering amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separators {
    /// `1,234.56`
    Point,
    /// `1.234,56`
    Comma,
}

/// Core formatting function with full control over output.
///
/// # Arguments
/// * `value` - The decimal value to format
/// * `scale` - Fractional digits to keep (the value is rounded, not truncated)
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
/// * `separators` - Thousands/decimal separator style
///
/// # Examples
/// ```
/// use broker_import::utils::{format_amount_with, Separators};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount_with(dec!(1234.56), 2, 0, Separators::Point), "1,234.56");
/// assert_eq!(format_amount_with(dec!(1234.56), 2, 0, Separators::Comma), "1.234,56");
/// ```
pub fn format_amount_with(value: Decimal, scale: u32, width: usize, separators: Separators) -> String {
    let is_negative = value < Decimal::ZERO;
    let rounded = value.abs().round_dp(scale);
    let formatted = format!("{:.*}", scale as usize, rounded);
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (formatted.as_str(), None),
    };

    let (thousands, decimal) = match separators {
        Separators::Point => (',', '.'),
        Separators::Comma => ('.', ','),
    };

    let digits: Vec<char> = integer_part.chars().collect();
    let mut with_separators = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            with_separators.push(thousands);
        }
        with_separators.push(*c);
    }

    let sign = if is_negative && !rounded.is_zero() { "-" } else { "" };
    let result = match decimal_part {
        Some(d) => format!("{}{}{}{}", sign, with_separators, decimal, d),
        None => format!("{}{}", sign, with_separators),
    };

    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Format a price or amount for table cells, keeping up to 8 fractional
/// digits so crypto quantities survive: "0.05", "1,234.5"
pub fn format_amount(value: Decimal) -> String {
    let normalized = value.normalize();
    let scale = normalized.scale().min(8);
    format_amount_with(normalized, scale, 0, Separators::Point)
}

/// Cut `text` to at most `max_chars` characters, appending `…` when cut.
/// Never splits a multi-byte character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Lowercase, strip accents, and collapse every non-alphanumeric run to a
/// single space: "Preço / Ação" → "preco acao"
pub fn fold_name(input: &str) -> String {
    let lower = input.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for ch in lower.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.push(ch);
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_amount_with_separators() {
        assert_eq!(format_amount_with(dec!(1234.56), 2, 0, Separators::Point), "1,234.56");
        assert_eq!(format_amount_with(dec!(1234.56), 2, 0, Separators::Comma), "1.234,56");
        assert_eq!(format_amount_with(dec!(1000000), 2, 0, Separators::Point), "1,000,000.00");
        assert_eq!(format_amount_with(dec!(999.99), 2, 0, Separators::Point), "999.99");
        assert_eq!(format_amount_with(dec!(12), 0, 0, Separators::Point), "12");
    }

    #[test]
    fn test_format_amount_negative() {
        assert_eq!(format_amount_with(dec!(-1234.56), 2, 0, Separators::Point), "-1,234.56");
        assert_eq!(format_amount_with(dec!(-0.001), 2, 0, Separators::Point), "0.00");
    }

    #[test]
    fn test_format_amount_rounds() {
        assert_eq!(format_amount_with(dec!(1.235), 2, 0, Separators::Point), "1.24");
        assert_eq!(format_amount(dec!(0.05000000)), "0.05");
        assert_eq!(format_amount(dec!(42850.00)), "42,850");
    }

    #[test]
    fn test_format_with_width() {
        let result = format_amount_with(dec!(100), 2, 10, Separators::Point);
        assert_eq!(result, "    100.00");
        let result = format_amount_with(dec!(1000000), 2, 5, Separators::Point);
        assert_eq!(result, "1,000,000.00");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc…");
        assert_eq!(truncate_chars("ççççç", 2), "çç…");
    }

    #[test]
    fn test_fold_name() {
        assert_eq!(fold_name("Preço / Ação"), "preco acao");
        assert_eq!(fold_name("Date(UTC)"), "date utc");
        assert_eq!(fold_name("  No. of shares "), "no of shares");
        assert_eq!(fold_name("Fees & Comm"), "fees comm");
    }
}
