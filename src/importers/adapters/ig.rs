//! IG share dealing trade history.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{accept, cell, classify_action, number, sample_contains_all, sample_contains_any, skip, sum_numbers, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "ig",
    name: "IG",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

/// Trailing market qualifiers such as "(All Sessions)"; symbols in
/// parentheses have no spaces and are kept.
static SESSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\s[^)]*\)\s*$").expect("valid regex"));

fn detect(sample: &str) -> bool {
    sample_contains_any(sample, &["ig markets", "ig index"])
        || sample_contains_all(sample, &["market", "direction", "consideration", "cost/proceeds"])
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn market_symbol(market: &str) -> &str {
    match SESSION_SUFFIX.find(market) {
        Some(m) => &market[..m.start()],
        None => market,
    }
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let activity = cell(row, &["Activity"]);
    if !activity.is_empty() && !activity.to_uppercase().contains("TRADE") {
        return skip(format!("activity {:?}", activity));
    }

    let direction = cell(row, &["Direction", "Action", "Type"]);
    let Some(trade_type) = classify_action(direction) else {
        return skip(format!("direction {:?}", direction));
    };

    let instrument = match row.first_of(&["Epic", "Ticker", "Symbol"]) {
        Some(symbol) => symbol,
        None => market_symbol(cell(row, &["Market", "Instrument"])),
    };

    accept(Trade {
        date: to_iso(cell(row, &["Date", "Trade Date"]), locale)?,
        ticker: to_ticker(instrument)?,
        trade_type,
        qty: number(row, &["Quantity", "Size"], locale)?.abs(),
        price: number(row, &["Price", "Deal Price"], locale)?,
        currency: infer_currency(row, "GBP"),
        fees: sum_numbers(row, &["Commission", "Charges"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}
