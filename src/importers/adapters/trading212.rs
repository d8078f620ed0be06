//! Trading 212 history export.

use super::{accept, cell, classify_action, number, sample_contains_all, sample_contains_any, skip, sum_numbers, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "trading212",
    name: "Trading 212",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

/// Charge columns Trading 212 adds per venue; absent ones count as zero.
const FEE_COLUMNS: &[&str] = &[
    "Stamp duty reserve tax",
    "Stamp duty",
    "Currency conversion fee",
    "Transaction fee",
    "Finra fee",
    "French transaction tax",
];

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["no. of shares", "price / share"])
        || sample_contains_any(sample, &["trading 212", "trading212"])
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let action = cell(row, &["Action"]);
    let Some(trade_type) = classify_action(action) else {
        return skip(format!("action {:?}", action));
    };

    let currency = match row.first_of(&["Currency (Price / share)"]) {
        Some(ccy) => ccy.to_uppercase(),
        None => infer_currency(row, "GBP"),
    };

    accept(Trade {
        date: to_iso(cell(row, &["Time", "Date"]), locale)?,
        ticker: to_ticker(cell(row, &["Ticker", "ISIN"]))?,
        trade_type,
        qty: number(row, &["No. of shares", "Quantity"], locale)?,
        price: number(row, &["Price / share", "Price"], locale)?,
        currency,
        fees: sum_numbers(row, FEE_COLUMNS, locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}
