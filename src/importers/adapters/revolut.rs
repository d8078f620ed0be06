//! Revolut trading account statement.

use super::{accept, cell, classify_action, number, optional_number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "revolut",
    name: "Revolut",
    version: ADAPTER_VERSION,
    default_locale: "en-GB",
    detector: detect,
    row_parser: parse_row,
};

fn detect(sample: &str) -> bool {
    sample.contains("revolut") || sample_contains_all(sample, &["price per share", "total amount", "fx rate"])
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

/// "BUY - MARKET" → "BUY"
fn base_action(action: &str) -> &str {
    action.split(" - ").next().unwrap_or(action).trim()
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let action = base_action(cell(row, &["Type", "Action"]));
    let Some(trade_type) = classify_action(action) else {
        return skip(format!("type {:?}", action));
    };

    let symbol = cell(row, &["Ticker", "Symbol", "Stock"]);
    if symbol.is_empty() {
        return skip("no ticker");
    }

    let qty = number(row, &["Quantity", "Qty", "Shares"], locale)?;
    // Prices carry the currency code: "USD 185.50"
    let mut price = optional_number(row, &["Price per share", "Price"], locale)?;
    if price.is_zero() && !qty.is_zero() {
        let total = optional_number(row, &["Total Amount"], locale)?;
        price = total.abs() / qty;
    }

    accept(Trade {
        date: to_iso(cell(row, &["Date", "Trade Date"]), locale)?,
        ticker: to_ticker(symbol)?,
        trade_type,
        qty,
        price,
        currency: infer_currency(row, "GBP"),
        fees: optional_number(row, &["Commission", "Fees"], locale)?,
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
    fn test_base_action() {
        assert_eq!(base_action("BUY - MARKET"), "BUY");
        assert_eq!(base_action("SELL - LIMIT"), "SELL");
        assert_eq!(base_action("CASH TOP-UP"), "CASH TOP-UP");
    }

    #[test]
    fn test_currency_prefixed_price() {
        let row = Row::from_pairs([
            ("Date", "2024-01-15T14:30:00.000Z"),
            ("Ticker", "TSLA"),
            ("Type", "SELL - MARKET"),
            ("Quantity", "2"),
            ("Price per share", "USD 240.10"),
            ("Total Amount", "USD 480.20"),
            ("Currency", "USD"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_gb()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].trade_type, TradeType::Sell);
        assert_eq!(t[0].price, dec!(240.10));
    }

    #[test]
    fn test_missing_currency_column_means_gbp() {
        let row = Row::from_pairs([
            ("Date", "15/01/2024"),
            ("Ticker", "VOD"),
            ("Type", "BUY - MARKET"),
            ("Quantity", "100"),
            ("Price per share", "0.70"),
        ]);
        let RowOutcome::Trades(t) = parse_row(&row, &Locale::en_gb()) else {
            panic!("expected trade");
        };
        assert_eq!(t[0].currency, "GBP");
        assert_eq!(t[0].date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_cash_rows_are_skipped() {
        for kind in ["CASH TOP-UP", "DIVIDEND", "CUSTODY FEE"] {
            let row = Row::from_pairs([("Date", "2024-01-15"), ("Type", kind), ("Total Amount", "100")]);
            assert!(matches!(parse_row(&row, &Locale::en_gb()), RowOutcome::Skipped(_)));
        }
    }
}
