//! Ordered adapter registry.
//!
//! Detection is first-match over [`REGISTRY`]; the order is part of the
//! contract because some exports satisfy more than one detector. Detectors
//! only see the preamble and header, never data rows.

use tracing::{debug, info};

use super::adapters::{
    binance, coinbase, degiro, etoro, freetrade, ibkr_flex, ig, koinly, kraken, revolut, robinhood,
    saxo, schwab, trading212, turbotax, AdapterDescriptor,
};
use super::tokenizer;

/// Id reported when no adapter recognizes a sample.
pub const UNKNOWN: &str = "unknown";

static REGISTRY: &[AdapterDescriptor] = &[
    turbotax::ADAPTER,
    koinly::ADAPTER,
    ibkr_flex::ADAPTER,
    coinbase::ADAPTER,
    kraken::ADAPTER,
    binance::ADAPTER,
    etoro::ADAPTER,
    trading212::ADAPTER,
    degiro::ADAPTER,
    robinhood::ADAPTER,
    schwab::ADAPTER,
    freetrade::ADAPTER,
    revolut::ADAPTER,
    saxo::ADAPTER,
    ig::ADAPTER,
];

/// All adapters in dispatch order.
pub fn adapters() -> &'static [AdapterDescriptor] {
    REGISTRY
}

/// Id of the first adapter whose detector accepts `sample`, or [`UNKNOWN`].
pub fn detect_broker(sample: &str) -> &'static str {
    let lowered = tokenizer::head_text(sample).to_lowercase();
    for adapter in REGISTRY {
        if (adapter.detector)(&lowered) {
            info!("Detected {} export", adapter.name);
            return adapter.id;
        }
    }
    debug!("No adapter matched the sample");
    UNKNOWN
}

pub fn find_adapter(id: &str) -> Option<&'static AdapterDescriptor> {
    let id = id.trim();
    REGISTRY.iter().find(|a| a.id.eq_ignore_ascii_case(id))
}
