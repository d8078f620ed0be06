//! Freetrade activity export.

use super::{accept, cell, classify_action, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "freetrade",
    name: "Freetrade",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

/// Header of the older five-column activity export.
const SIMPLE_HEADER: &str = "date,stock,action,quantity,price";

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["price (native)", "fx rate (to gbp)"])
        || sample.lines().any(|line| line.starts_with(SIMPLE_HEADER))
        || sample.contains("freetrade")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let kind = cell(row, &["Type", "Action"]);
    let Some(trade_type) = classify_action(kind) else {
        return skip(format!("type {:?}", kind));
    };

    let currency = match row.first_of(&["Currency (native)"]) {
        Some(ccy) => ccy.to_uppercase(),
        None => infer_currency(row, "GBP"),
    };
    let fees = optional_number(row, &["Fee (GBP)"], locale)?
        + optional_number(row, &["Stamp Duty (GBP)"], locale)?;

    accept(Trade {
        date: to_iso(cell(row, &["Date"]), locale)?,
        ticker: to_ticker(cell(row, &["Symbol", "Stock"]))?,
        trade_type,
        qty: number(row, &["Quantity"], locale)?,
        price: number(row, &["Price (native)", "Price"], locale)?,
        currency,
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
    fn test_detect_full_and_simple_headers() {
        assert!(ADAPTER.detect("Date,Time,Type,Symbol,Security,Quantity,Price (native),Currency (native),FX rate (to GBP)"));
        assert!(ADAPTER.detect("Date,Stock,Action,Quantity,Price\n15/01/2024,VOD,BUY,100,0.70\n"));
        assert!(ADAPTER.detect("DATE,STOCK,ACTION,QUANTITY,PRICE"));
        assert!(!ADAPTER.detect("Date,Action,Stock,Quantity,Price"));
        assert!(!ADAPTER.detect("Date,Symbol,Price (native)"));
    }

    #[test]
    fn test_simple_row_defaults_to_gbp() {
        let row = Row::from_pairs([
            ("Date", "20/01/2024"),
            ("Stock", "VOD"),
            ("Action", "SELL"),
            ("Quantity", "50"),
            ("Price", "0.75"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_gb()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].ticker, "VOD");
        assert_eq!(t[0].currency, "GBP");
        assert_eq!(t[0].price, dec!(0.75));
        assert_eq!(t[0].fees, dec!(0));
    }

    #[test]
    fn test_buy_with_stamp_duty() {
        let row = Row::from_pairs([
            ("Date", "15/01/2024"),
            ("Type", "BUY"),
            ("Symbol", "VOD"),
            ("Quantity", "100"),
            ("Price (native)", "0.70"),
            ("Currency (native)", "GBP"),
            ("Fee (GBP)", "0.00"),
            ("Stamp Duty (GBP)", "0.35"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_gb()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Buy);
        assert_eq!(t[0].fees, dec!(0.35));
        assert_eq!(t[0].date.to_string(), "2024-01-15");
    }
}
