//! DEGIRO transactions export.
//!
//! Direction is the sign of `Quantity`. Currency codes sit in unnamed
//! columns right of each amount, and no exchange symbol is exported, so the
//! ISIN is used as the ticker.

use rust_decimal::Decimal;

use super::{accept, cell, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade, TradeType};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "degiro",
    name: "DEGIRO",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["product", "isin", "reference exchange"]) || sample.contains("degiro")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let signed_qty = number(row, &["Quantity", "Number"], locale)?;
    if signed_qty.is_zero() {
        return skip("zero quantity");
    }
    let trade_type = if signed_qty < Decimal::ZERO {
        TradeType::Sell
    } else {
        TradeType::Buy
    };

    let currency = match row.value_after("Price").filter(|c| !c.is_empty()) {
        Some(ccy) => ccy.to_uppercase(),
        None => infer_currency(row, "EUR"),
    };

    let instrument = match row.first_of(&["ISIN"]) {
        Some(isin) => isin,
        None => cell(row, &["Product"]),
    };

    accept(Trade {
        date: to_iso(cell(row, &["Date"]), locale)?,
        ticker: to_ticker(instrument)?,
        trade_type,
        qty: signed_qty.abs(),
        price: number(row, &["Price"], locale)?,
        currency,
        fees: optional_number(
            row,
            &["Transaction and/or third party fees", "Transaction costs", "Fee"],
            locale,
        )?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_and_unnamed_currency_column() {
        let row = Row::from_pairs([
            ("Date", "20-02-2024"),
            ("Time", "15:31"),
            ("Product", "APPLE INC"),
            ("ISIN", "US0378331005"),
            ("Quantity", "-5"),
            ("Price", "182.30"),
            ("Column9", "USD"),
            ("Local value", "911.50"),
            ("Transaction and/or third party fees", "-0.50"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_gb()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].qty, dec!(5));
        assert_eq!(t[0].ticker, "US0378331005");
        assert_eq!(t[0].currency, "USD");
        assert_eq!(t[0].fees, dec!(0.50));
        assert_eq!(t[0].date.to_string(), "2024-02-20");
    }
}
