//! Koinly transaction export.
//!
//! Koinly has no buy/sell column: direction follows from which side of the
//! `Pair` was sent and which was received.

use rust_decimal::Decimal;

use super::{accept, cell, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_number, to_ticker};
use crate::models::{Row, Trade, TradeType};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "koinly",
    name: "Koinly",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample.contains("koinly") || sample_contains_all(sample, &["pair", "sent amount", "received amount"])
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn split_pair(pair: &str) -> (String, String) {
    match pair.trim().split_once(|c: char| c == '-' || c == '/') {
        Some((base, quote)) => (base.trim().to_uppercase(), quote.trim().to_uppercase()),
        None => (pair.trim().to_uppercase(), String::new()),
    }
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let label = cell(row, &["Label", "Type"]).to_uppercase();
    if !label.contains("TRADE") {
        return skip(format!("label {:?}", label));
    }

    let sent = optional_number(row, &["Sent Amount"], locale)?;
    let received = optional_number(row, &["Received Amount"], locale)?;
    let sent_ccy = cell(row, &["Sent Currency"]).to_uppercase();
    let received_ccy = cell(row, &["Received Currency"]).to_uppercase();
    let (base, quote) = split_pair(cell(row, &["Pair"]));

    let (trade_type, asset, qty, price, currency) = if sent > Decimal::ZERO && received > Decimal::ZERO {
        let sold_base = if base.is_empty() {
            true
        } else {
            sent_ccy.is_empty() || sent_ccy == base
        };
        if sold_base {
            let asset = if base.is_empty() { sent_ccy.clone() } else { base.clone() };
            let currency = first_non_empty(&[&quote, &received_ccy]);
            (TradeType::Sell, asset, sent, received / sent, currency)
        } else {
            let currency = first_non_empty(&[&quote, &sent_ccy]);
            (TradeType::Buy, base.clone(), received, sent / received, currency)
        }
    } else if sent > Decimal::ZERO {
        let asset = first_non_empty(&[&sent_ccy, &base]);
        let price = to_number(cell(row, &["Price"]), locale)?;
        (TradeType::Sell, asset, sent, price, quote.clone())
    } else if received > Decimal::ZERO {
        let asset = first_non_empty(&[&received_ccy, &base]);
        let price = to_number(cell(row, &["Price"]), locale)?;
        (TradeType::Buy, asset, received, price, quote.clone())
    } else {
        return skip("no sent or received amount");
    };

    let currency = if currency.is_empty() {
        infer_currency(row, "USD")
    } else {
        currency
    };

    accept(Trade {
        date: to_iso(cell(row, &["Koinly Date", "Date"]), locale)?,
        ticker: to_ticker(&asset)?,
        trade_type,
        qty,
        price,
        currency,
        fees: optional_number(row, &["Fee Amount", "Fee"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}

fn first_non_empty(values: &[&String]) -> String {
    values
        .iter()
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(sent: &str, sent_ccy: &str, received: &str, received_ccy: &str) -> Row {
        Row::from_pairs([
            ("Koinly Date", "2024-01-15 10:30 UTC"),
            ("Pair", "BTC-USD"),
            ("Sent Amount", sent),
            ("Sent Currency", sent_ccy),
            ("Received Amount", received),
            ("Received Currency", received_ccy),
            ("Fee Amount", "2.5"),
            ("Label", "trade"),
        ])
    }

    fn trades(outcome: RowOutcome) -> Vec<Trade> {
        match outcome {
            RowOutcome::Trades(t) => t,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_receiving_base_is_a_buy() {
        let t = trades(parse_row(&row("21000", "USD", "0.5", "BTC"), &Locale::en_us()));
        assert_eq!(t[0].trade_type, TradeType::Buy);
        assert_eq!(t[0].ticker, "BTC");
        assert_eq!(t[0].qty, dec!(0.5));
        assert_eq!(t[0].price, dec!(42000));
        assert_eq!(t[0].currency, "USD");
        assert_eq!(t[0].fees, dec!(2.5));
    }

    #[test]
    fn test_sending_base_is_a_sell() {
        let t = trades(parse_row(&row("0.25", "BTC", "11000", "USD"), &Locale::en_us()));
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].qty, dec!(0.25));
        assert_eq!(t[0].price, dec!(44000));
    }

    #[test]
    fn test_non_trade_labels_are_skipped() {
        let base = row("", "", "1", "BTC");
        let r = Row::from_pairs(
            base.iter()
                .map(|(k, v)| (k, if k == "Label" { "deposit" } else { v })),
        );
        assert!(matches!(parse_row(&r, &Locale::en_us()), RowOutcome::Skipped(_)));
    }

    #[test]
    fn test_one_sided_trade_without_price_is_invalid() {
        let r = row("", "", "1", "BTC");
        assert!(matches!(parse_row(&r, &Locale::en_us()), RowOutcome::Invalid(_)));
    }
}
