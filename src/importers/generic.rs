//! Parsing with a column mapping instead of an adapter.

use itertools::Itertools;
use std::time::Instant;
use tracing::info;

use super::adapters::{accept, classify_action, collect_rows, skip, RowOutcome, ADAPTER_VERSION};
use super::locale::{self, Locale};
use super::normalize::{hash_row, infer_currency, to_iso, to_number, to_ticker};
use super::tokenizer;
use crate::config::ImportConfig;
use crate::error::{ImportError, RowError};
use crate::models::{ColumnMapping, ParseResult, Role, Row, Trade, TradeType};

/// Source tag of trades produced through a mapping.
pub const GENERIC_SOURCE: &str = "generic";

fn mapped<'a>(row: &'a Row, mapping: &ColumnMapping, role: Role) -> &'a str {
    mapping
        .column(role)
        .and_then(|column| row.get(column))
        .map(str::trim)
        .unwrap_or("")
}

/// Turn one row into a trade using `mapping`.
///
/// Without an action column every row is a BUY, and action text that names
/// neither side also reads as BUY. Both are lossy on purpose.
pub fn generic_row_to_trade(row: &Row, mapping: &ColumnMapping, locale: &Locale) -> RowOutcome {
    parse(row, mapping, locale).into()
}

fn parse(row: &Row, mapping: &ColumnMapping, locale: &Locale) -> Result<RowOutcome, RowError> {
    let trade_type = if mapping.column(Role::Action).is_some() {
        let action = mapped(row, mapping, Role::Action);
        match classify_action(action) {
            Some(t) => t,
            None => return skip(format!("action {:?}", action)),
        }
    } else {
        TradeType::Buy
    };

    let currency = match mapped(row, mapping, Role::Currency) {
        "" => infer_currency(row, "USD"),
        ccy => ccy.to_uppercase(),
    };
    let fees = match mapped(row, mapping, Role::Fees) {
        "" => Default::default(),
        value => to_number(value, locale)?,
    };

    accept(Trade {
        date: to_iso(mapped(row, mapping, Role::Date), locale)?,
        ticker: to_ticker(mapped(row, mapping, Role::Ticker))?,
        trade_type,
        qty: to_number(mapped(row, mapping, Role::Quantity), locale)?,
        price: to_number(mapped(row, mapping, Role::Price), locale)?,
        currency,
        fees,
        source: GENERIC_SOURCE.to_string(),
        raw_hash: hash_row(row),
    })
}

/// Re-parse raw export text with a mapping, typically one a person confirmed.
///
/// A mapping without every required role is rejected up front with
/// [`ImportError::IncompleteMapping`].
pub fn generic_parse(
    raw_csv_text: &str,
    mapping: &ColumnMapping,
    locale: Option<&str>,
    config: &ImportConfig,
) -> Result<ParseResult, ImportError> {
    let locale = locale::resolve(locale, &config.default_locale)?;
    generic_parse_with_locale(raw_csv_text, mapping, &locale, config)
}

/// [`generic_parse`] with an already resolved locale.
pub fn generic_parse_with_locale(
    raw_csv_text: &str,
    mapping: &ColumnMapping,
    locale: &Locale,
    config: &ImportConfig,
) -> Result<ParseResult, ImportError> {
    let started = Instant::now();
    let missing = mapping.missing_required();
    if !missing.is_empty() {
        return Err(ImportError::IncompleteMapping(
            missing.iter().map(|r| r.as_str()).join(", "),
        ));
    }

    let table = tokenizer::tokenize_text(raw_csv_text)?;
    info!(
        "Parsing with column mapping ({} rows, locale {})",
        table.rows.len(),
        locale.tag
    );

    Ok(collect_rows(
        GENERIC_SOURCE,
        ADAPTER_VERSION,
        &table.rows,
        started,
        config.warning_row_chars,
        |row| generic_row_to_trade(row, mapping, locale),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mapping() -> ColumnMapping {
        ColumnMapping::confirmed([
            (Role::Date, "Date"),
            (Role::Action, "Action"),
            (Role::Ticker, "Stock"),
            (Role::Quantity, "Quantity"),
            (Role::Price, "Price"),
        ])
    }

    #[test]
    fn test_row_to_trade() {
        let row = Row::from_pairs([
            ("Date", "2024-01-15"),
            ("Action", "Sell"),
            ("Stock", "aapl"),
            ("Quantity", "10"),
            ("Price", "185.50"),
        ]);
        let RowOutcome::Trades(t) = generic_row_to_trade(&row, &mapping(), &Locale::en_us()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].ticker, "AAPL");
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].currency, "USD");
        assert_eq!(t[0].source, "generic");
        assert_eq!(t[0].fees, dec!(0));
    }

    #[test]
    fn test_unmapped_action_defaults_to_buy() {
        let mapping = ColumnMapping::confirmed([
            (Role::Date, "Date"),
            (Role::Ticker, "Stock"),
            (Role::Quantity, "Quantity"),
            (Role::Price, "Price"),
        ]);
        let row = Row::from_pairs([("Date", "2024-01-15"), ("Stock", "AAPL"), ("Quantity", "1"), ("Price", "2")]);
        let RowOutcome::Trades(t) = generic_row_to_trade(&row, &mapping, &Locale::en_us()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Buy);
    }

    #[test]
    fn test_generic_parse_counts() {
        let text = "Date,Action,Stock,Quantity,Price\n\
                    2024-01-15,BUY,AAPL,10,185.50\n\
                    2024-01-16,DIVIDEND,AAPL,,\n\
                    2024-01-17,SELL,AAPL,5,0\n";
        let result = generic_parse(text, &mapping(), None, &ImportConfig::default()).unwrap();
        assert_eq!(result.broker, "generic");
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.meta.skipped, 1);
        assert_eq!(result.meta.invalid, 1);
        assert!(result.warnings[0].starts_with("generic: row 3"));
    }

    #[test]
    fn test_incomplete_mapping_is_rejected() {
        let mapping = ColumnMapping::confirmed([(Role::Date, "Date"), (Role::Ticker, "Stock")]);
        let err = generic_parse("Date,Stock\n2024-01-15,AAPL\n", &mapping, None, &ImportConfig::default())
            .unwrap_err();
        match err {
            ImportError::IncompleteMapping(roles) => assert_eq!(roles, "quantity, price"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
