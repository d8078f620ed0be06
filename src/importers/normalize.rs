//! Value normalizers shared by every adapter and the generic path.
//!
//! All functions are pure: raw cell text in, canonical value (or a
//! [`NormalizeError`]) out. Locale decides ambiguous dates and separators.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::NormalizeError;
use crate::importers::locale::{DecimalMark, Locale};
use crate::models::Row;

static ISO_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[/.\-](\d{1,2})[/.\-](\d{1,2})(?:[^\d]|$)").expect("valid regex")
});
static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})(?:[^\d]|$)").expect("valid regex")
});
static DAY_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[\s\-/]+([A-Za-z]{3,9})\.?[\s\-/,]+(\d{4}|\d{2})(?:[^\d]|$)")
        .expect("valid regex")
});
static MONTH_NAME_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})(?:[^\d]|$)")
        .expect("valid regex")
});
static COMPACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})(?:[;,\sT]|$)").expect("valid regex"));
static SCIENTIFIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?[eE][+-]?\d+$").expect("valid regex"));
static CODE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2,6}").expect("valid regex"));
static CODE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]{2,6}$").expect("valid regex"));
static PAREN_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Za-z0-9.]{1,10})\)\s*$").expect("valid regex"));

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₿', '₹'];

/// Quote currencies dropped from `BASE-QUOTE` pairs.
pub const QUOTE_CURRENCIES: &[&str] = &[
    "USD", "USDT", "USDC", "BUSD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "BTC", "ETH", "DAI",
    "TUSD",
];

const EXCHANGE_SUFFIXES: &[&str] = &["US", "L", "DE", "MI", "AS", "PA", "SW", "TO", "HK"];

/// Column names that carry a currency code, in lookup order.
pub const CURRENCY_ALIASES: &[&str] = &[
    "Currency",
    "CCY",
    "Currency Code",
    "Settlement Currency",
    "Instrument currency",
];

/// Parse a date cell into a calendar date.
///
/// Accepted shapes, tried in order: RFC 3339 timestamps (converted to the UTC
/// date), `YYYY-MM-DD` prefixes, `DD/MM/YYYY` or `MM/DD/YYYY` prefixes read in
/// the locale's order, and English month names (`15 Jan 2024`,
/// `15-Jan-2024`, `Jan 15, 2024`), then compact `YYYYMMDD` (Flex queries).
/// Trailing time components are ignored.
/// A date that is invalid in the locale's order is rejected, never swapped.
pub fn to_iso(value: &str, locale: &Locale) -> Result<NaiveDate, NormalizeError> {
    let s = value.trim().trim_matches('"');
    if s.is_empty() {
        return Err(NormalizeError::EmptyDate);
    }
    let invalid = || NormalizeError::InvalidDate(s.to_string());

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    if let Some(caps) = ISO_PREFIX.captures(s) {
        let y = caps[1].parse().map_err(|_| invalid())?;
        let m = caps[2].parse().map_err(|_| invalid())?;
        let d = caps[3].parse().map_err(|_| invalid())?;
        return NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid);
    }

    if let Some(caps) = NUMERIC_DATE.captures(s) {
        let a: u32 = caps[1].parse().map_err(|_| invalid())?;
        let b: u32 = caps[2].parse().map_err(|_| invalid())?;
        let y = expand_year(&caps[3]).ok_or_else(invalid)?;
        let (d, m) = if locale.day_first() { (a, b) } else { (b, a) };
        return NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid);
    }

    if let Some(caps) = DAY_MONTH_NAME.captures(s) {
        let d: u32 = caps[1].parse().map_err(|_| invalid())?;
        let m = month_from_name(&caps[2]).ok_or_else(invalid)?;
        let y = expand_year(&caps[3]).ok_or_else(invalid)?;
        return NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid);
    }

    if let Some(caps) = MONTH_NAME_DAY.captures(s) {
        let m = month_from_name(&caps[1]).ok_or_else(invalid)?;
        let d: u32 = caps[2].parse().map_err(|_| invalid())?;
        let y = expand_year(&caps[3]).ok_or_else(invalid)?;
        return NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid);
    }

    if let Some(caps) = COMPACT_DATE.captures(s) {
        let y = caps[1].parse().map_err(|_| invalid())?;
        let m = caps[2].parse().map_err(|_| invalid())?;
        let d = caps[3].parse().map_err(|_| invalid())?;
        return NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid);
    }

    Err(invalid())
}

fn expand_year(text: &str) -> Option<i32> {
    let y: i32 = text.parse().ok()?;
    if text.len() == 2 {
        Some(2000 + y)
    } else {
        Some(y)
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse an amount cell into an exact decimal.
///
/// Handles currency symbols and codes, parenthesized negatives, trailing
/// minus signs, whitespace/apostrophe grouping and either separator style.
/// When both `,` and `.` appear the last one is the decimal mark; a lone
/// separator is resolved with the locale.
pub fn to_number(value: &str, locale: &Locale) -> Result<Decimal, NormalizeError> {
    let mut s: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\'' && *c != '\u{2019}')
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();
    if s.is_empty() {
        return Err(NormalizeError::EmptyNumber);
    }
    let invalid = || NormalizeError::InvalidNumber(value.trim().to_string());

    let mut negative = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }

    s = s.replace("R$", "");
    s.retain(|c| !CURRENCY_SYMBOLS.contains(&c));

    negative ^= take_sign(&mut s);
    s = CODE_PREFIX.replace(&s, "").into_owned();
    s = CODE_SUFFIX.replace(&s, "").into_owned();
    negative ^= take_sign(&mut s);
    if s.ends_with('-') {
        s.pop();
        negative = !negative;
    }

    if s.is_empty() {
        return Err(invalid());
    }

    let parsed = if SCIENTIFIC.is_match(&s) {
        Decimal::from_scientific(&s).map_err(|_| invalid())?
    } else {
        if !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
            || !s.chars().any(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let canonical = resolve_separators(&s, locale.decimal_mark);
        Decimal::from_str(&canonical).map_err(|_| invalid())?
    };

    Ok(if negative { -parsed } else { parsed })
}

/// Remove one leading sign character; true when it was a minus.
fn take_sign(s: &mut String) -> bool {
    if s.starts_with('-') {
        s.remove(0);
        true
    } else {
        if s.starts_with('+') {
            s.remove(0);
        }
        false
    }
}

/// Rewrite digits-and-separators into `1234.56` form.
fn resolve_separators(s: &str, mark: DecimalMark) -> String {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    match (commas, dots) {
        (0, 0) => s.to_string(),
        (c, d) if c > 0 && d > 0 => {
            let last_comma = s.rfind(',').unwrap_or(0);
            let last_dot = s.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (c, 0) if c > 1 => s.replace(',', ""),
        (0, d) if d > 1 => s.replace('.', ""),
        _ => {
            let sep = if commas == 1 { ',' } else { '.' };
            if sep == mark.as_char() {
                return s.replace(sep, ".");
            }
            let (int_part, frac_part) = s.split_once(sep).unwrap_or((s, ""));
            let grouping = frac_part.len() == 3
                && !int_part.is_empty()
                && int_part.trim_start_matches('0') != "";
            if grouping {
                s.replace(sep, "")
            } else {
                s.replace(sep, ".")
            }
        }
    }
}

/// Reduce an instrument reference to its bare symbol.
///
/// `Apple Inc. (AAPL)`, `AAPL:US`, `AAPL.US`, `BTC/USDT`, `BTC-USD` and
/// `btc` all normalize to their uppercase base symbol. Share classes such as
/// `BRK.B` are kept.
pub fn to_ticker(value: &str) -> Result<String, NormalizeError> {
    let s = value.trim();
    if s.is_empty() {
        return Err(NormalizeError::MissingTicker);
    }

    if let Some(caps) = PAREN_SYMBOL.captures(s) {
        return finish_ticker(&caps[1]);
    }

    let mut symbol = if s.contains(char::is_whitespace) {
        s.split_whitespace().last().unwrap_or(s)
    } else {
        s
    };

    symbol = symbol.split(':').next().unwrap_or(symbol);
    symbol = symbol.split('/').next().unwrap_or(symbol);

    if let Some((base, quote)) = symbol.rsplit_once('-') {
        if QUOTE_CURRENCIES.contains(&quote.to_ascii_uppercase().as_str()) {
            symbol = base;
        }
    }

    if let Some((base, suffix)) = symbol.rsplit_once('.') {
        if !base.is_empty() && EXCHANGE_SUFFIXES.contains(&suffix.to_ascii_uppercase().as_str()) {
            symbol = base;
        }
    }

    finish_ticker(symbol)
}

fn finish_ticker(symbol: &str) -> Result<String, NormalizeError> {
    let out = symbol.trim().trim_matches(|c: char| c == '.' || c == ',').to_uppercase();
    if out.is_empty() {
        Err(NormalizeError::MissingTicker)
    } else {
        Ok(out)
    }
}

/// Currency code from the row's currency column, or `fallback`.
pub fn infer_currency(row: &Row, fallback: &str) -> String {
    row.first_of(CURRENCY_ALIASES)
        .map(|c| c.trim().to_ascii_uppercase())
        .filter(|c| (3..=5).contains(&c.len()) && c.chars().all(|ch| ch.is_ascii_alphabetic()))
        .unwrap_or_else(|| fallback.to_string())
}

/// Stable content hash of a raw row, independent of column order.
///
/// Deduplication key for downstream consumers: re-importing the same export
/// yields the same hashes.
pub fn hash_row(row: &Row) -> String {
    hash_pairs(row.iter().collect())
}

/// Like [`hash_row`] but distinguishes several trades derived from one row
/// (the `BUY`/`SELL` legs of a tax-report row, an `OPEN`/`CLOSE` pair).
pub fn hash_row_tagged(row: &Row, tag: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = row.iter().collect();
    pairs.push(("_type", tag));
    hash_pairs(pairs)
}

fn hash_pairs(mut pairs: Vec<(&str, &str)>) -> String {
    pairs.sort();
    let mut hasher = blake3::Hasher::new();
    for (key, value) in pairs {
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
