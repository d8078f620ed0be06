//! Error handling for broker-import
//!
//! Defines the typed error enums used by the import core and keeps the
//! anyhow-based Result alias for the CLI layer, where context chaining matters
//! more than matching on variants.

use thiserror::Error;

/// Fatal errors: the whole import cannot proceed.
///
/// Everything that goes wrong on a single row is a [`RowError`] instead and is
/// reported as a warning on the parse result.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("catastrophic input: {0}")]
    CatastrophicInput(String),

    #[error("missing locale: a locale tag is required")]
    MissingLocale,

    #[error("unsupported locale: {0}")]
    UnsupportedLocale(String),

    #[error("unknown broker adapter: {0}")]
    UnknownBroker(String),

    #[error("incomplete column mapping, missing required roles: {0}")]
    IncompleteMapping(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Failure to normalize one raw cell value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("empty date value")]
    EmptyDate,

    #[error("unrecognized date: {0}")]
    InvalidDate(String),

    #[error("empty number value")]
    EmptyNumber,

    #[error("not a number: {0}")]
    InvalidNumber(String),

    #[error("missing ticker")]
    MissingTicker,
}

/// Why a single row was rejected. Recorded as a warning, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("non-positive qty/price: qty={qty}, price={price}")]
    NonPositive { qty: String, price: String },

    #[error("{0}")]
    Malformed(String),
}

/// Result type alias for CLI operations
pub type Result<T> = anyhow::Result<T>;
