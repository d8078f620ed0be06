//! Coinbase transaction history.

use super::{accept, cell, classify_action, number, optional_number, sample_contains_any, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "coinbase",
    name: "Coinbase",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample.contains("coinbase")
        || (sample.contains("transaction type")
            && sample_contains_any(sample, &["quantity transacted", "spot price at transaction"]))
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let action = cell(row, &["Transaction Type", "Type"]);
    let Some(trade_type) = classify_action(action) else {
        return skip(format!("transaction type {:?}", action));
    };

    let currency = cell(row, &["Spot Price Currency", "Price Currency", "Currency"]).to_uppercase();

    accept(Trade {
        date: to_iso(cell(row, &["Timestamp", "Date"]), locale)?,
        ticker: to_ticker(cell(row, &["Asset"]))?,
        trade_type,
        qty: number(row, &["Quantity Transacted", "Quantity"], locale)?,
        price: number(row, &["Spot Price at Transaction", "Price at Transaction", "Price"], locale)?,
        currency: if currency.is_empty() { "USD".to_string() } else { currency },
        fees: optional_number(row, &["Fees and/or Spread", "Fees"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeType;
    use rust_decimal_macros::dec;

    fn row(kind: &str) -> Row {
        Row::from_pairs([
            ("Timestamp", "2024-01-15T10:30:00Z"),
            ("Transaction Type", kind),
            ("Asset", "BTC"),
            ("Quantity Transacted", "0.05"),
            ("Spot Price Currency", "USD"),
            ("Spot Price at Transaction", "$42,850.00"),
            ("Fees and/or Spread", "$15.99"),
        ])
    }

    #[test]
    fn test_detect() {
        assert!(ADAPTER.detect("Timestamp,Transaction Type,Asset,Quantity Transacted,Spot Price Currency"));
        assert!(!ADAPTER.detect("Date,Transaction Type,Amount"));
    }

    #[test]
    fn test_advanced_trade_sell() {
        let RowOutcome::Trades(t) = parse_row(&row("Advanced Trade Sell"), &Locale::en_us()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].price, dec!(42850));
        assert_eq!(t[0].fees, dec!(15.99));
    }

    #[test]
    fn test_transfers_and_rewards_are_skipped() {
        for kind in ["Send", "Receive", "Rewards Income", "Convert", "Staking Income"] {
            assert!(matches!(parse_row(&row(kind), &Locale::en_us()), RowOutcome::Skipped(_)), "{}", kind);
        }
    }
}
