//! Locale conventions that drive date and number interpretation.
//!
//! A locale tag decides two things: whether `03/04/2024` is day-first or
//! month-first, and whether `,` or `.` is the decimal mark. Nothing else of
//! the locale is used.

use crate::error::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalMark {
    Point,
    Comma,
}

impl DecimalMark {
    pub fn as_char(&self) -> char {
        match self {
            DecimalMark::Point => '.',
            DecimalMark::Comma => ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub tag: String,
    pub date_order: DateOrder,
    pub decimal_mark: DecimalMark,
}

/// Locales exercised by the test suite and listed by `brokers`.
pub const SUPPORTED_LOCALES: &[&str] = &[
    "en-US", "en-GB", "en-CA", "en-AU", "de-DE", "de-CH", "fr-FR", "es-ES", "es-MX", "it-IT",
    "nl-NL", "pt-BR", "pt-PT", "sv-SE", "pl-PL", "ja-JP",
];

const COMMA_DECIMAL_LANGS: &[&str] = &[
    "de", "fr", "es", "it", "nl", "pt", "da", "nb", "no", "fi", "pl", "cs", "tr", "ru", "sv",
];
const MONTH_FIRST_EN_REGIONS: &[&str] = &["US", "PH", "CA"];
const EAST_ASIAN_LANGS: &[&str] = &["ja", "zh", "ko"];

impl Locale {
    /// Parse a BCP-47-ish tag (`en-US`, `de_DE`, `fr`).
    ///
    /// An empty tag is a [`ImportError::MissingLocale`]; a language without
    /// known conventions is [`ImportError::UnsupportedLocale`] rather than a
    /// silent fallback.
    pub fn parse(tag: &str) -> Result<Self, ImportError> {
        let tag = tag.trim().replace('_', "-");
        if tag.is_empty() {
            return Err(ImportError::MissingLocale);
        }

        let mut parts = tag.split('-');
        let lang = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts
            .find(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()))
            .map(|p| p.to_ascii_uppercase());

        let (date_order, decimal_mark) = if lang == "en" {
            match region.as_deref() {
                None => (DateOrder::MonthFirst, DecimalMark::Point),
                Some(r) if MONTH_FIRST_EN_REGIONS.contains(&r) => {
                    (DateOrder::MonthFirst, DecimalMark::Point)
                }
                Some(_) => (DateOrder::DayFirst, DecimalMark::Point),
            }
        } else if COMMA_DECIMAL_LANGS.contains(&lang.as_str()) {
            let point = matches!(region.as_deref(), Some("CH") | Some("LI"))
                || (lang == "es" && region.as_deref() == Some("MX"));
            let mark = if point {
                DecimalMark::Point
            } else {
                DecimalMark::Comma
            };
            (DateOrder::DayFirst, mark)
        } else if EAST_ASIAN_LANGS.contains(&lang.as_str()) {
            (DateOrder::MonthFirst, DecimalMark::Point)
        } else {
            return Err(ImportError::UnsupportedLocale(tag));
        };

        let canonical = match &region {
            Some(r) => format!("{}-{}", lang, r),
            None => lang.clone(),
        };

        Ok(Self {
            tag: canonical,
            date_order,
            decimal_mark,
        })
    }

    pub fn day_first(&self) -> bool {
        self.date_order == DateOrder::DayFirst
    }

    pub fn en_us() -> Self {
        Self {
            tag: "en-US".to_string(),
            date_order: DateOrder::MonthFirst,
            decimal_mark: DecimalMark::Point,
        }
    }

    pub fn en_gb() -> Self {
        Self {
            tag: "en-GB".to_string(),
            date_order: DateOrder::DayFirst,
            decimal_mark: DecimalMark::Point,
        }
    }
}

/// Resolve the locale for a parse: an explicit tag wins, `None` falls back
/// to `default`. An explicit empty tag is an error, not a fallback.
pub fn resolve(explicit: Option<&str>, default: &str) -> Result<Locale, ImportError> {
    match explicit {
        Some(tag) => Locale::parse(tag),
        None => Locale::parse(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_regions() {
        let us = Locale::parse("en-US").unwrap();
        assert_eq!(us.date_order, DateOrder::MonthFirst);
        assert_eq!(us.decimal_mark, DecimalMark::Point);

        let gb = Locale::parse("en_GB").unwrap();
        assert_eq!(gb.tag, "en-GB");
        assert!(gb.day_first());
        assert_eq!(gb.decimal_mark, DecimalMark::Point);

        assert!(!Locale::parse("en").unwrap().day_first());
        assert!(Locale::parse("en-AU").unwrap().day_first());
    }

    #[test]
    fn test_continental_locales_use_comma() {
        for tag in ["de-DE", "fr-FR", "es-ES", "it-IT", "nl-NL", "pt-BR", "sv-SE"] {
            let locale = Locale::parse(tag).unwrap();
            assert!(locale.day_first(), "{}", tag);
            assert_eq!(locale.decimal_mark, DecimalMark::Comma, "{}", tag);
        }
    }

    #[test]
    fn test_regional_exceptions() {
        assert_eq!(Locale::parse("de-CH").unwrap().decimal_mark, DecimalMark::Point);
        assert_eq!(Locale::parse("es-MX").unwrap().decimal_mark, DecimalMark::Point);
        assert!(!Locale::parse("ja-JP").unwrap().day_first());
    }

    #[test]
    fn test_missing_and_unsupported() {
        assert!(matches!(Locale::parse(""), Err(ImportError::MissingLocale)));
        assert!(matches!(Locale::parse("  "), Err(ImportError::MissingLocale)));
        assert!(matches!(
            Locale::parse("xx-YY"),
            Err(ImportError::UnsupportedLocale(_))
        ));
    }

    #[test]
    fn test_supported_list_parses() {
        for tag in SUPPORTED_LOCALES {
            assert!(Locale::parse(tag).is_ok(), "{}", tag);
        }
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        assert_eq!(resolve(Some("de-DE"), "en-US").unwrap().tag, "de-DE");
        assert_eq!(resolve(None, "en-GB").unwrap().tag, "en-GB");
        assert!(matches!(resolve(Some(""), "en-US"), Err(ImportError::MissingLocale)));
    }
}
