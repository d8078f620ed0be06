//! Saxo Bank trades report.

use rust_decimal::Decimal;

use super::{accept, cell, classify_action, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade, TradeType};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "saxo",
    name: "Saxo Bank",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample.contains("saxo") || sample_contains_all(sample, &["booked amount", "value date", "instrument symbol"])
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let action = cell(row, &["Action", "Type", "Buy/Sell"]);
    let Some(classified) = classify_action(action) else {
        return skip(format!("action {:?}", action));
    };

    let signed_qty = number(row, &["Quantity", "Amount"], locale)?;
    // Saxo writes Bought/Sold and signs sold quantities
    let trade_type = if signed_qty < Decimal::ZERO {
        TradeType::Sell
    } else {
        action.parse::<TradeType>().unwrap_or(classified)
    };

    let instrument = match row.first_of(&["Instrument Symbol", "Symbol"]) {
        Some(symbol) => symbol,
        None => cell(row, &["Instrument"]),
    };

    accept(Trade {
        date: to_iso(cell(row, &["Trade Date", "Date"]), locale)?,
        ticker: to_ticker(instrument)?,
        trade_type,
        qty: signed_qty.abs(),
        price: number(row, &["Price", "Trade Price"], locale)?,
        currency: infer_currency(row, "GBP"),
        fees: optional_number(row, &["Commission"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}
