//! Binance spot trade history.
//!
//! Quantities and fees carry their asset glued to the number
//! (`0.00100000BTC`), and the pair has no separator (`BTCUSDT`).

use super::{accept, cell, classify_action, number, sample_contains_all, skip, split_amount_asset, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, to_iso, to_number, to_ticker};
use crate::models::{Row, Trade};
use rust_decimal::Decimal;

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "binance",
    name: "Binance",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

const QUOTES: &[&str] = &[
    "FDUSD", "USDT", "BUSD", "USDC", "TUSD", "USD", "EUR", "GBP", "TRY", "BRL", "BTC", "ETH", "BNB",
];

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["date(utc)", "executed"])
        || sample_contains_all(sample, &["date(utc)", "pair", "side"])
        || sample.contains("binance")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

/// `BTCUSDT` → (`BTC`, `USDT`) using the longest matching quote suffix.
pub fn split_symbol(symbol: &str) -> (String, String) {
    let symbol = symbol.trim().to_uppercase().replace(['/', '-', '_'], "");
    QUOTES
        .iter()
        .filter(|q| symbol.len() > q.len() && symbol.ends_with(*q))
        .max_by_key(|q| q.len())
        .map(|q| (symbol[..symbol.len() - q.len()].to_string(), q.to_string()))
        .unwrap_or((symbol, String::new()))
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let side = cell(row, &["Side", "Type"]);
    let Some(trade_type) = classify_action(side) else {
        return skip(format!("side {:?}", side));
    };

    let (base, quote) = split_symbol(cell(row, &["Pair", "Market", "Symbol"]));
    let price = number(row, &["Price", "Average Price"], locale)?;
    let qty = number(row, &["Executed", "Amount", "Filled"], locale)?;

    let fee_cell = cell(row, &["Fee", "Trading Fee"]);
    let fees = match split_amount_asset(fee_cell) {
        Some((amount, asset)) if asset.eq_ignore_ascii_case(&base) => to_number(amount, locale)? * price,
        Some((amount, _)) => to_number(amount, locale)?,
        None if fee_cell.is_empty() => Decimal::ZERO,
        None => to_number(fee_cell, locale)?,
    };

    accept(Trade {
        date: to_iso(cell(row, &["Date(UTC)", "Date(UTC+0)", "Date", "Time"]), locale)?,
        ticker: to_ticker(&base)?,
        trade_type,
        qty,
        price,
        currency: if quote.is_empty() { "USDT".to_string() } else { quote },
        fees,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeType;
    use rust_decimal_macros::dec;

    #[test]
    fn test_split_symbol_prefers_longest_quote() {
        assert_eq!(split_symbol("BTCUSDT"), ("BTC".to_string(), "USDT".to_string()));
        assert_eq!(split_symbol("ETHBTC"), ("ETH".to_string(), "BTC".to_string()));
        assert_eq!(split_symbol("SOLFDUSD"), ("SOL".to_string(), "FDUSD".to_string()));
        assert_eq!(split_symbol("BNB/EUR"), ("BNB".to_string(), "EUR".to_string()));
    }

    #[test]
    fn test_fee_in_base_asset_is_converted() {
        let row = Row::from_pairs([
            ("Date(UTC)", "2024-01-15 14:30:00"),
            ("Pair", "BTCUSDT"),
            ("Side", "BUY"),
            ("Price", "42000"),
            ("Executed", "0.01000000BTC"),
            ("Amount", "420.00USDT"),
            ("Fee", "0.00001000BTC"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_us()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Buy);
        assert_eq!(t[0].ticker, "BTC");
        assert_eq!(t[0].qty, dec!(0.01));
        assert_eq!(t[0].currency, "USDT");
        assert_eq!(t[0].fees, dec!(0.42));
    }
}
