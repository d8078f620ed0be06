//! Charles Schwab brokerage transaction history.

use super::{accept, cell, classify_action, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "schwab",
    name: "Charles Schwab",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["fees & comm", "symbol", "action"]) || sample.contains("schwab")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let action = cell(row, &["Action"]);
    let Some(trade_type) = classify_action(action) else {
        return skip(format!("action {:?}", action));
    };

    accept(Trade {
        // "01/15/2024 as of 01/12/2024": the leading date is the trade date
        date: to_iso(cell(row, &["Date"]), locale)?,
        ticker: to_ticker(cell(row, &["Symbol"]))?,
        trade_type,
        qty: number(row, &["Quantity"], locale)?,
        price: number(row, &["Price"], locale)?,
        currency: infer_currency(row, "USD"),
        fees: optional_number(row, &["Fees & Comm", "Fees & Commissions"], locale)?,
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
    fn test_as_of_dates_and_dollar_amounts() {
        let row = Row::from_pairs([
            ("Date", "01/15/2024 as of 01/12/2024"),
            ("Action", "Sell"),
            ("Symbol", "MSFT"),
            ("Quantity", "5"),
            ("Price", "$390.25"),
            ("Fees & Comm", "$0.65"),
            ("Amount", "$1,950.60"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_us()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].date.to_string(), "2024-01-15");
        assert_eq!(t[0].fees, dec!(0.65));
        assert_eq!(t[0].currency, "USD");
    }

    #[test]
    fn test_dividends_are_skipped() {
        let row = Row::from_pairs([("Date", "01/20/2024"), ("Action", "Qualified Dividend")]);
        assert!(matches!(parse_row(&row, &Locale::en_us()), RowOutcome::Skipped(_)));
    }
}
