//! eToro account statement, "Closed Positions" sheet.
//!
//! A position row yields its opening trade and, once closed, the opposite
//! closing trade. Both legs hash the same row with distinct tags.

use rust_decimal::Decimal;

use super::{accept_all, cell, classify_action, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row_tagged, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "etoro",
    name: "eToro",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["position id", "open rate"]) || sample.contains("etoro")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

/// Instrument text following the verb: "Buy AAPL" → "AAPL".
fn instrument_from_action(action: &str) -> Option<&str> {
    let (_, rest) = action.trim().split_once(char::is_whitespace)?;
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let action = cell(row, &["Action", "Type"]);
    let Some(open_type) = classify_action(action) else {
        return skip(format!("action {:?}", action));
    };

    let instrument = match instrument_from_action(action) {
        Some(name) => name,
        None => cell(row, &["Instrument", "Ticker", "Symbol"]),
    };
    let ticker = to_ticker(instrument)?;
    let units = number(row, &["Units", "Quantity"], locale)?;
    let currency = infer_currency(row, "USD");

    let mut trades = vec![Trade {
        date: to_iso(cell(row, &["Open Date", "Date"]), locale)?,
        ticker: ticker.clone(),
        trade_type: open_type,
        qty: units,
        price: number(row, &["Open Rate"], locale)?,
        currency: currency.clone(),
        fees: optional_number(row, &["Fees", "Commission"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row_tagged(row, "OPEN"),
    }];

    let close_date = cell(row, &["Close Date"]);
    let close_rate = cell(row, &["Close Rate"]);
    if !close_date.is_empty() && !close_rate.is_empty() {
        trades.push(Trade {
            date: to_iso(close_date, locale)?,
            ticker,
            trade_type: open_type.opposite(),
            qty: units,
            price: number(row, &["Close Rate"], locale)?,
            currency,
            fees: Decimal::ZERO,
            source: ADAPTER.id.to_string(),
            raw_hash: hash_row_tagged(row, "CLOSE"),
        });
    }

    accept_all(trades)
}
