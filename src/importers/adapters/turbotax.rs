//! TurboTax "universal gains" CSV.
//!
//! Each line is a realized gain (purchase date, cost basis, sale date,
//! proceeds) and is expanded into a BUY and a SELL. The export carries no
//! quantity, so one is estimated from the two totals; the estimate is lossy
//! and only keeps both legs on the same unit count.

use rust_decimal::{Decimal, RoundingStrategy};

use super::{accept_all, cell, number, sample_contains_all, skip, AdapterDescriptor, RowOutcome, ADAPTER_VERSION};
use crate::error::RowError;
use crate::importers::locale::Locale;
use crate::importers::normalize::{hash_row_tagged, infer_currency, to_iso, to_ticker};
use crate::models::{Row, Trade, TradeType};

pub const ADAPTER: AdapterDescriptor = AdapterDescriptor {
    id: "turbotax",
    name: "TurboTax Universal Gains",
    version: ADAPTER_VERSION,
    default_locale: "en-US",
    detector: detect,
    row_parser: parse_row,
};

const CURRENCY_NAMES: &[(&str, &str)] = &[
    ("BITCOIN", "BTC"),
    ("ETHEREUM", "ETH"),
    ("SOLANA", "SOL"),
    ("CARDANO", "ADA"),
    ("POLKADOT", "DOT"),
    ("POLYGON", "MATIC"),
    ("AVALANCHE", "AVAX"),
    ("CHAINLINK", "LINK"),
    ("UNISWAP", "UNI"),
    ("COSMOS", "ATOM"),
    ("ALGORAND", "ALGO"),
    ("RIPPLE", "XRP"),
    ("DOGECOIN", "DOGE"),
    ("LITECOIN", "LTC"),
    ("BITCOIN CASH", "BCH"),
    ("ETHEREUM CLASSIC", "ETC"),
    ("STELLAR", "XLM"),
    ("TRON", "TRX"),
    ("EOS", "EOS"),
];

fn detect(sample: &str) -> bool {
    sample_contains_all(sample, &["currency name", "purchase date", "date sold"])
        || sample.contains("turbotax")
}

fn parse_row(row: &Row, locale: &Locale) -> RowOutcome {
    parse(row, locale).into()
}

/// Ticker for a currency name ("Bitcoin" → "BTC"), falling back to the
/// ordinary ticker rules for names that are already symbols.
pub fn currency_name_to_ticker(name: &str) -> Result<String, RowError> {
    let upper = name.trim().to_uppercase();
    match CURRENCY_NAMES.iter().find(|(n, _)| *n == upper) {
        Some((_, ticker)) => Ok(ticker.to_string()),
        None => Ok(to_ticker(name)?),
    }
}

/// Units implied by the two totals: `max(1, round(cost / avg))` with
/// `avg = (cost + proceeds) / 2`.
pub fn estimate_quantity(cost: Decimal, proceeds: Decimal) -> Decimal {
    let avg = (cost + proceeds) / Decimal::TWO;
    if avg <= Decimal::ZERO {
        return Decimal::ONE;
    }
    (cost / avg)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ONE)
}

fn parse(row: &Row, locale: &Locale) -> Result<RowOutcome, RowError> {
    let name = cell(row, &["Currency Name", "Asset", "Description"]);
    if name.is_empty() {
        return skip("no currency name");
    }

    let ticker = currency_name_to_ticker(name)?;
    let bought = to_iso(cell(row, &["Purchase Date", "Date Acquired"]), locale)?;
    let sold = to_iso(cell(row, &["Date Sold"]), locale)?;
    let cost = number(row, &["Cost Basis", "Cost"], locale)?;
    let proceeds = number(row, &["Proceeds"], locale)?;

    let qty = estimate_quantity(cost, proceeds);
    let currency = infer_currency(row, "USD");

    let leg = |trade_type: TradeType, date, total: Decimal| Trade {
        date,
        ticker: ticker.clone(),
        trade_type,
        qty,
        price: total / qty,
        currency: currency.clone(),
        fees: Decimal::ZERO,
        source: ADAPTER.id.to_string(),
        raw_hash: hash_row_tagged(row, trade_type.as_str()),
    };

    accept_all(vec![
        leg(TradeType::Buy, bought, cost),
        leg(TradeType::Sell, sold, proceeds),
    ])
}
