//! Per-institution export adapters.
//!
//! Every adapter is a static [`AdapterDescriptor`]: a detector over a text
//! sample plus a row parser. The shared row loop in [`collect_rows`] gives
//! every adapter the same fault isolation: a bad row becomes one warning and
//! never aborts the rest of the file.

use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::{ImportError, RowError};
use crate::importers::locale::{self, Locale};
use crate::importers::normalize::to_number;
use crate::importers::tokenizer::{self, MALFORMED_KEY};
use crate::models::{ParseMeta, ParseResult, Row, Trade, TradeType};

pub mod binance;
pub mod coinbase;
pub mod degiro;
pub mod etoro;
pub mod freetrade;
pub mod ibkr_flex;
pub mod ig;
pub mod koinly;
pub mod kraken;
pub mod revolut;
pub mod robinhood;
pub mod saxo;
pub mod schwab;
pub mod trading212;
pub mod turbotax;

/// Schema version stamped on every result.
pub const ADAPTER_VERSION: &str = "1.0.0";

/// Result of handling one tokenized row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// One or more trades derived from the row
    Trades(Vec<Trade>),
    /// Intentionally excluded (dividend, deposit, ...); not a warning
    Skipped(String),
    /// Rejected; becomes exactly one warning
    Invalid(RowError),
}

impl From<Result<RowOutcome, RowError>> for RowOutcome {
    fn from(result: Result<RowOutcome, RowError>) -> Self {
        result.unwrap_or_else(RowOutcome::Invalid)
    }
}

/// Static description of one institution's export format.
#[derive(Debug, Clone, Copy)]
pub struct AdapterDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub default_locale: &'static str,
    /// Receives the sample already lowercased
    pub detector: fn(&str) -> bool,
    pub row_parser: fn(&Row, &Locale) -> RowOutcome,
}

impl AdapterDescriptor {
    /// Run the detector over the preamble and header of `sample`. Data rows
    /// are never looked at, so a ticker or company name in a cell cannot
    /// claim the file for another broker.
    pub fn detect(&self, sample: &str) -> bool {
        (self.detector)(&tokenizer::head_text(sample).to_lowercase())
    }

    /// Parse a whole decoded export with this adapter.
    ///
    /// `locale` overrides the adapter default; an explicit empty tag is an
    /// error rather than a fallback.
    pub fn parse(
        &self,
        text: &str,
        locale: Option<&str>,
        config: &ImportConfig,
    ) -> Result<ParseResult, ImportError> {
        let started = Instant::now();
        let locale = locale::resolve(locale, self.default_locale)?;
        let table = tokenizer::tokenize_text(text)?;
        info!(
            "Parsing {} export ({} rows, locale {})",
            self.name,
            table.rows.len(),
            locale.tag
        );

        let result = collect_rows(
            self.id,
            self.version,
            &table.rows,
            started,
            config.warning_row_chars,
            |row| (self.row_parser)(row, &locale),
        );
        Ok(result)
    }
}

/// Run `handler` over every row, accumulating trades, warnings and counters.
pub fn collect_rows<F>(
    source: &str,
    version: &str,
    rows: &[Row],
    started: Instant,
    row_chars: usize,
    mut handler: F,
) -> ParseResult
where
    F: FnMut(&Row) -> RowOutcome,
{
    let mut trades = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped = 0;

    for (idx, row) in rows.iter().enumerate() {
        let outcome = match row.get(MALFORMED_KEY) {
            Some(msg) => RowOutcome::Invalid(RowError::Malformed(msg.to_string())),
            None => handler(row),
        };
        match outcome {
            RowOutcome::Trades(mut t) => trades.append(&mut t),
            RowOutcome::Skipped(reason) => {
                debug!("Skipping row {}: {}", idx + 1, reason);
                skipped += 1;
            }
            RowOutcome::Invalid(e) => {
                warn!("Invalid row {}: {}", idx + 1, e);
                warnings.push(format!(
                    "{}: row {} {} → {}",
                    source,
                    idx + 1,
                    row.describe(row_chars),
                    e
                ));
            }
        }
    }

    info!(
        "Parsed {} trades from {} rows ({} skipped, {} invalid)",
        trades.len(),
        rows.len(),
        skipped,
        warnings.len()
    );

    ParseResult {
        broker: source.to_string(),
        trades,
        meta: ParseMeta {
            rows: rows.len(),
            invalid: warnings.len(),
            skipped,
            duration_ms: started.elapsed().as_millis() as u64,
            version: version.to_string(),
        },
        warnings,
    }
}

pub(crate) const NON_TRADE_WORDS: &[&str] = &[
    "DIVIDEND",
    "INTEREST",
    "DEPOSIT",
    "WITHDRAW",
    "TRANSFER",
    "SPLIT",
    "TOP-UP",
    "TOP UP",
    "FEE",
    "TAX",
    "REWARD",
    "STAKING",
    "AIRDROP",
    "CONVERT",
    "CONVERSION",
    "SEND",
    "RECEIVE",
    "JOURNAL",
];

/// Trade direction of an action cell, or `None` for empty and non-trade
/// actions (dividends, deposits, fees, ...).
pub fn classify_action(action: &str) -> Option<TradeType> {
    let upper = action.trim().to_uppercase();
    if upper.is_empty() || NON_TRADE_WORDS.iter().any(|w| upper.contains(w)) {
        return None;
    }
    Some(TradeType::from_action(&upper))
}

/// Validate and finish a single trade: qty and price must be positive, fees
/// are stored as an absolute amount.
pub fn accept(trade: Trade) -> Result<RowOutcome, RowError> {
    Ok(RowOutcome::Trades(vec![validated(trade)?]))
}

/// Like [`accept`] for rows that produce several trades; one bad leg
/// rejects the whole row.
pub fn accept_all(trades: Vec<Trade>) -> Result<RowOutcome, RowError> {
    let trades = trades
        .into_iter()
        .map(validated)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RowOutcome::Trades(trades))
}

fn validated(mut trade: Trade) -> Result<Trade, RowError> {
    if trade.qty <= Decimal::ZERO || trade.price <= Decimal::ZERO {
        return Err(RowError::NonPositive {
            qty: trade.qty.to_string(),
            price: trade.price.to_string(),
        });
    }
    trade.fees = trade.fees.abs();
    Ok(trade)
}

pub fn skip(reason: impl Into<String>) -> Result<RowOutcome, RowError> {
    Ok(RowOutcome::Skipped(reason.into()))
}

/// First non-blank cell among `aliases`, or `""`.
pub fn cell<'a>(row: &'a Row, aliases: &[&str]) -> &'a str {
    row.first_of(aliases).unwrap_or("")
}

/// Required numeric cell.
pub fn number(row: &Row, aliases: &[&str], locale: &Locale) -> Result<Decimal, RowError> {
    Ok(to_number(cell(row, aliases), locale)?)
}

/// Optional numeric cell; blank counts as zero.
pub fn optional_number(row: &Row, aliases: &[&str], locale: &Locale) -> Result<Decimal, RowError> {
    match row.first_of(aliases) {
        Some(value) => Ok(to_number(value, locale)?),
        None => Ok(Decimal::ZERO),
    }
}

/// Sum of every present fee column; blanks count as zero.
pub fn sum_numbers(row: &Row, columns: &[&str], locale: &Locale) -> Result<Decimal, RowError> {
    let mut total = Decimal::ZERO;
    for column in columns {
        total += optional_number(row, &[*column], locale)?;
    }
    Ok(total)
}

pub fn sample_contains_all(sample: &str, needles: &[&str]) -> bool {
    needles.iter().all(|n| sample.contains(n))
}

pub fn sample_contains_any(sample: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| sample.contains(n))
}

/// Split `0.00100000BTC` / `12.5 USDT` into its amount text and asset code.
pub fn split_amount_asset(value: &str) -> Option<(&str, &str)> {
    let value = value.trim();
    let idx = value.find(|c: char| c.is_ascii_alphabetic())?;
    let (amount, asset) = value.split_at(idx);
    let amount = amount.trim();
    let asset = asset.trim();
    if amount.is_empty() || asset.is_empty() || !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((amount, asset))
}
