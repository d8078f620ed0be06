//! Import pipeline: decode, detect, parse.
//!
//! [`parse_universal`] is the entry point. A recognized export goes through
//! its adapter; anything else goes through mapping inference and is either
//! parsed generically or handed back for a person to confirm the mapping.

pub mod adapters;
pub mod generic;
pub mod inference;
pub mod locale;
pub mod normalize;
pub mod registry;
pub mod tokenizer;

use std::io::Cursor;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::models::{ImportOutcome, ParseResult, RequiresMappingResult, Role, Row};

pub use adapters::AdapterDescriptor;
pub use generic::{generic_parse, generic_parse_with_locale, generic_row_to_trade};
pub use inference::{infer_mapping, MappingInference};
pub use registry::{detect_broker, find_adapter};

/// An export to import: a display name, the declared mime type and a reader
/// over its bytes.
pub struct ImportFile<R> {
    pub name: String,
    pub mime: Option<String>,
    pub reader: R,
}

impl ImportFile<Cursor<Vec<u8>>> {
    pub fn from_bytes(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            reader: Cursor::new(bytes),
        }
    }
}

impl ImportFile<tokio::fs::File> {
    /// Open a file on disk, deriving the mime type from its extension.
    pub async fn open(path: &Path) -> Result<Self, ImportError> {
        let reader = tokio::fs::File::open(path).await?;
        Ok(Self {
            name: path.display().to_string(),
            mime: mime_from_extension(path).map(str::to_string),
            reader,
        })
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" => Some(tokenizer::XLSX_MIME),
        "tsv" => Some(tokenizer::TSV_MIME),
        "csv" | "txt" => Some("text/csv"),
        _ => None,
    }
}

/// Read the whole file and decode it to text.
pub async fn read_text<R>(file: ImportFile<R>) -> Result<String, ImportError>
where
    R: AsyncRead + Unpin,
{
    let ImportFile { name, mime, mut reader } = file;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    info!("Read {} ({} bytes)", name, bytes.len());
    tokenizer::decode(&bytes, mime.as_deref())
}

/// Detect, then parse with the matching adapter or the generic pipeline.
///
/// `locale` overrides the adapter default (or the configured default on the
/// generic path). An unconfident mapping is not an error: it comes back as
/// [`ImportOutcome::RequiresMapping`].
pub async fn parse_universal<R>(
    file: ImportFile<R>,
    locale: Option<&str>,
    config: &ImportConfig,
) -> Result<ImportOutcome, ImportError>
where
    R: AsyncRead + Unpin,
{
    let text = read_text(file).await?;
    parse_text(&text, locale, config)
}

/// Parse with a named adapter, skipping detection.
pub async fn parse_with_adapter<R>(
    file: ImportFile<R>,
    broker: &str,
    locale: Option<&str>,
    config: &ImportConfig,
) -> Result<ParseResult, ImportError>
where
    R: AsyncRead + Unpin,
{
    let adapter = find_adapter(broker).ok_or_else(|| ImportError::UnknownBroker(broker.to_string()))?;
    let text = read_text(file).await?;
    adapter.parse(&text, locale, config)
}

/// Adapter id for already-decoded text, or `"unknown"`.
pub fn detect_text(text: &str, config: &ImportConfig) -> &'static str {
    detect_broker(tokenizer::sample_text(text, config.sample_bytes))
}

/// Tokenize `text` and infer a mapping from its first rows.
pub fn infer_text(text: &str, config: &ImportConfig) -> Result<(MappingInference, Vec<String>, Vec<Row>), ImportError> {
    let table = tokenizer::tokenize_text(text)?;
    let sample_rows: Vec<Row> = table
        .rows
        .iter()
        .filter(|row| row.get(tokenizer::MALFORMED_KEY).is_none())
        .take(config.sample_rows)
        .cloned()
        .collect();
    let inference = infer_mapping(&table.headers, &sample_rows, config.confidence_threshold);
    Ok((inference, table.headers, sample_rows))
}

/// Synchronous core of [`parse_universal`] over decoded text.
pub fn parse_text(
    text: &str,
    locale: Option<&str>,
    config: &ImportConfig,
) -> Result<ImportOutcome, ImportError> {
    let broker = detect_text(text, config);
    if let Some(adapter) = find_adapter(broker) {
        return Ok(ImportOutcome::Parsed(adapter.parse(text, locale, config)?));
    }

    let mut effective = locale::resolve(locale, &config.default_locale)?;
    let (inference, headers, sample_rows) = infer_text(text, config)?;

    // Without an explicit locale, sampled dates pick the day/month order
    let mut date_conflict = None;
    if let Some(&readable) = inference.date_orders.first() {
        if !inference.date_orders.contains(&effective.date_order) {
            match locale {
                None => {
                    info!("Sampled dates only parse as {:?}, overriding {}", readable, effective.tag);
                    effective.date_order = readable;
                }
                Some(tag) => {
                    let column = inference.mapping.column(Role::Date).unwrap_or_default();
                    date_conflict = Some(format!("dates in {} do not parse under locale {}", column, tag));
                }
            }
        }
    }

    if inference.is_confident() && date_conflict.is_none() {
        info!("Mapping inferred with confidence, parsing generically");
        let result = generic_parse_with_locale(text, &inference.mapping, &effective, config)?;
        return Ok(ImportOutcome::Parsed(result));
    }

    let reason = match date_conflict {
        Some(conflict) if inference.is_confident() => conflict,
        Some(conflict) => format!("{}; {}", inference.reason(), conflict),
        None => inference.reason(),
    };
    info!("Mapping needs confirmation: {}", reason);
    Ok(ImportOutcome::RequiresMapping(RequiresMappingResult {
        raw_csv_text: text.to_string(),
        headers,
        inferred_mapping: inference.mapping,
        candidates: inference.candidates,
        sample_rows,
        reason,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension(Path::new("a.XLSX")), Some(tokenizer::XLSX_MIME));
        assert_eq!(mime_from_extension(Path::new("a.tsv")), Some(tokenizer::TSV_MIME));
        assert_eq!(mime_from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_text_dispatches_to_adapter() {
        let text = "Activity Date,Process Date,Settle Date,Instrument,Description,Trans Code,Quantity,Price,Amount\n\
                    1/15/2024,1/15/2024,1/17/2024,AAPL,Apple,Buy,10,$185.50,($1855.00)\n";
        let outcome = parse_text(text, None, &ImportConfig::default()).unwrap();
        let result = outcome.parsed().expect("parsed");
        assert_eq!(result.broker, "robinhood");
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn test_parse_text_requires_mapping() {
        let text = "Txn Date,Sym,Shares\n2024-01-15,AAPL,10\n";
        let outcome = parse_text(text, None, &ImportConfig::default()).unwrap();
        let pending = outcome.requires_mapping().expect("requires mapping");
        assert_eq!(pending.headers, vec!["Txn Date", "Sym", "Shares"]);
        assert_eq!(pending.raw_csv_text, text);
        assert_eq!(pending.sample_rows.len(), 1);
    }

    #[test]
    fn test_sampled_dates_choose_the_date_order() {
        let text = "Date,Action,Stock,Quantity,Price\n13/02/2024,BUY,AAPL,10,185.50\n03/04/2024,SELL,AAPL,5,190.00\n";
        let outcome = parse_text(text, None, &ImportConfig::default()).unwrap();
        let result = outcome.parsed().expect("parsed");
        assert_eq!(result.trades[1].date.to_string(), "2024-04-03");

        let month_first = "Date,Action,Stock,Quantity,Price\n03/04/2024,BUY,AAPL,10,185.50\n";
        let outcome = parse_text(month_first, None, &ImportConfig::default()).unwrap();
        let result = outcome.parsed().expect("parsed");
        assert_eq!(result.trades[0].date.to_string(), "2024-03-04");
    }

    #[test]
    fn test_explicit_empty_locale_is_an_error() {
        let text = "Date,Action,Stock,Quantity,Price\n2024-01-15,BUY,AAPL,10,185.50\n";
        let err = parse_text(text, Some(""), &ImportConfig::default()).unwrap_err();
        assert!(matches!(err, ImportError::MissingLocale));
    }
}
