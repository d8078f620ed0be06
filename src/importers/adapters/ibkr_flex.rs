//! Interactive Brokers Flex query / activity statement trades.

use rust_decimal::Decimal;

use super::{accept, cell, classify_action, number, optional_number, sample_contains_any, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade, TradeType};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "ibkr_flex",
    name: "Interactive Brokers Flex",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

const QTY: &[&str] = &["Quantity", "Qty"];
const PROCEEDS: &[&str] = &["Proceeds"];

fn detect(sample: &str) -> bool {
    sample_contains_any(sample, &["ibkr", "interactive brokers"])
        || sample.starts_with("statement,header,field name")
        || (sample_contains_any(sample, &["t.price", "t. price", "tradeprice"])
            && sample.contains("proceeds"))
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

/// Direction when the export has no action column: a negative quantity or
/// money in (positive proceeds) is a sale.
fn direction_from_signs(qty: Decimal, proceeds: Decimal) -> TradeType {
    if qty < Decimal::ZERO || proceeds > Decimal::ZERO {
        TradeType::Sell
    } else {
        TradeType::Buy
    }
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let discriminator = cell(row, &["DataDiscriminator", "Header"]).to_lowercase();
    if !discriminator.is_empty() && !matches!(discriminator.as_str(), "data" | "order" | "trade" | "execution") {
        return skip(format!("{} line", discriminator));
    }

    let symbol = cell(row, &["Symbol", "UnderlyingSymbol"]);
    if symbol.is_empty() && row.first_of(QTY).is_none() {
        return skip("summary line");
    }

    let signed_qty = number(row, QTY, locale)?;
    let proceeds = optional_number(row, PROCEEDS, locale)?;

    let action = cell(row, &["Buy/Sell", "Action", "Type"]);
    let trade_type = if action.is_empty() {
        direction_from_signs(signed_qty, proceeds)
    } else {
        match classify_action(action) {
            Some(t) => t,
            None => return skip(format!("action {:?}", action)),
        }
    };

    accept(Trade {
        date: to_iso(cell(row, &["Date/Time", "TradeDate", "DateTime", "Date"]), locale)?,
        ticker: to_ticker(symbol)?,
        trade_type,
        qty: signed_qty.abs(),
        price: number(row, &["T.Price", "T. Price", "TradePrice", "Price"], locale)?,
        currency: infer_currency(row, "USD"),
        fees: optional_number(row, &["Comm/Fee", "IBCommission", "Commission"], locale)?,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row(row),
    })
}
