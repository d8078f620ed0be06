//! Robinhood account activity report.

use rust_decimal::Decimal;

use super::{accept, cell, number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, to_iso, to_ticker};
use crate::models::{Row, Trade, TradeType};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "robinhood",
    name: "Robinhood",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["activity date", "trans code"]) || sample.contains("robinhood")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    // Only equity/crypto fills carry these codes; CDIV, ACH, GOLD, ... are cash events
    let code = cell(row, &["Trans Code"]);
    let trade_type = match code.to_uppercase().as_str() {
        "BUY" | "BTO" | "BTC" => TradeType::Buy,
        "SELL" | "STO" | "STC" => TradeType::Sell,
        _ => return skip(format!("trans code {:?}", code)),
    };

    accept(Trade {
        date: to_iso(cell(row, &["Activity Date", "Process Date"]), locale)?,
        ticker: to_ticker(cell(row, &["Instrument", "Symbol"]))?,
        trade_type,
        qty: number(row, &["Quantity"], locale)?,
        price: number(row, &["Price"], locale)?,
        currency: "USD".to_string(),
        fees: Decimal::ZERO,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}
