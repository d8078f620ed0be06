//! broker-import - universal trade import for broker and exchange exports
//!
//! Detects which institution produced an export, parses it into canonical
//! trades, and falls back to column-mapping inference for unknown formats.

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod importers;
pub mod models;
pub mod utils;
