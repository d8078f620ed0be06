//! Kraken trades export.

use super::{accept, cell, classify_action, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "kraken",
    name: "Kraken",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

/// Quote legs, longest first so `USDT` wins over `USD`.
const QUOTES: &[(&str, &str)] = &[
    ("ZUSD", "USD"),
    ("ZEUR", "EUR"),
    ("ZGBP", "GBP"),
    ("ZCAD", "CAD"),
    ("ZJPY", "JPY"),
    ("USDT", "USDT"),
    ("USDC", "USDC"),
    ("USD", "USD"),
    ("EUR", "EUR"),
    ("GBP", "GBP"),
    ("CAD", "CAD"),
    ("JPY", "JPY"),
    ("CHF", "CHF"),
    ("AUD", "AUD"),
];

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["ordertxid", "ordertype", "vol"]) || sample.contains("kraken")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

/// Split a Kraken pair code (`XXBTZUSD`, `ETH/EUR`, `SOLUSD`) into the
/// canonical base asset and quote currency.
pub fn split_pair(pair: &str) -> (String, String) {
    let pair = pair.trim().to_uppercase();
    let (base, quote) = match pair.split_once('/') {
        Some((b, q)) => (b.to_string(), q.to_string()),
        None => QUOTES
            .iter()
            .find(|(code, _)| pair.len() > code.len() && pair.ends_with(code))
            .map(|(code, _)| (pair[..pair.len() - code.len()].to_string(), code.to_string()))
            .unwrap_or_else(|| (pair.clone(), String::new())),
    };

    let quote = QUOTES
        .iter()
        .find(|(code, _)| *code == quote)
        .map(|(_, ccy)| ccy.to_string())
        .unwrap_or(quote);

    let base = if base.len() == 4 && (base.starts_with('X') || base.starts_with('Z')) {
        base[1..].to_string()
    } else {
        base
    };
    let base = match base.as_str() {
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        _ => base,
    };
    (base, quote)
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let kind = cell(row, &["type"]);
    let Some(trade_type) = classify_action(kind) else {
        return skip(format!("type {:?}", kind));
    };

    let (base, quote) = split_pair(cell(row, &["pair"]));

    accept(Trade {
        date: to_iso(cell(row, &["time"]), locale)?,
        ticker: to_ticker(&base)?,
        trade_type,
        qty: number(row, &["vol"], locale)?,
        price: number(row, &["price"], locale)?,
        currency: if quote.is_empty() { "USD".to_string() } else { quote },
        fees: optional_number(row, &["fee"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}
