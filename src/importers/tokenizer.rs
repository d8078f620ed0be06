//! Raw bytes → decoded text → header + rows.
//!
//! Spreadsheets are flattened to CSV text first so that every later stage,
//! including the column-mapping review loop, works on one text form.

use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::models::Row;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const TSV_MIME: &str = "text/tab-separated-values";

/// Key of the single cell carried by a row the CSV reader could not decode.
pub const MALFORMED_KEY: &str = "_malformed";

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_LINES: usize = 10;
const HEADER_SCAN_RECORDS: usize = 20;

/// A tokenized export: unique header names and data rows keyed by them.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub delimiter: u8,
}

pub fn is_xlsx(bytes: &[u8], mime: Option<&str>) -> bool {
    mime == Some(XLSX_MIME) || bytes.starts_with(b"PK\x03\x04")
}

/// Decode raw file bytes to text.
///
/// XLSX workbooks are flattened (first worksheet) to CSV. Text honors a
/// UTF-8/UTF-16 BOM and falls back to Windows-1252 when the bytes are not
/// valid UTF-8.
pub fn decode(bytes: &[u8], mime: Option<&str>) -> Result<String, ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::CatastrophicInput("file is empty".to_string()));
    }

    let text = if is_xlsx(bytes, mime) {
        xlsx_to_csv(bytes)?
    } else if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        debug!("Decoding with BOM as {}", encoding.name());
        encoding
            .decode_without_bom_handling(&bytes[bom_len..])
            .0
            .into_owned()
    } else {
        match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
            Some(text) => text.into_owned(),
            None => {
                info!("Input is not valid UTF-8, decoding as Windows-1252");
                WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
            }
        }
    };

    if text.contains('\0') {
        return Err(ImportError::CatastrophicInput(
            "binary content is not a supported export".to_string(),
        ));
    }
    if text.trim().is_empty() {
        return Err(ImportError::CatastrophicInput("file has no content".to_string()));
    }

    Ok(text)
}

fn xlsx_to_csv(bytes: &[u8]) -> Result<String, ImportError> {
    let unreadable = |e: String| ImportError::CatastrophicInput(format!("unreadable spreadsheet: {}", e));

    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| unreadable("workbook has no worksheets".to_string()))?
        .map_err(|e| unreadable(e.to_string()))?;

    info!("Flattening worksheet with {} rows", range.height());

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_to_text).collect();
        writer
            .write_record(&cells)
            .map_err(|e| unreadable(e.to_string()))?;
    }
    let data = writer.into_inner().map_err(|e| unreadable(e.to_string()))?;
    String::from_utf8(data).map_err(|e| unreadable(e.to_string()))
}

fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            // Serial days since the 1900-system epoch
            let days = dt.as_f64().floor() as i64;
            NaiveDate::from_ymd_opt(1899, 12, 30)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days)))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => {
            debug!("Spreadsheet cell error: {:?}", e);
            String::new()
        }
    }
}

/// Decode and tokenize in one step.
pub fn tokenize(bytes: &[u8], mime: Option<&str>) -> Result<Table, ImportError> {
    let text = decode(bytes, mime)?;
    if mime == Some(TSV_MIME) {
        tokenize_with_delimiter(&text, b'\t')
    } else {
        tokenize_text(&text)
    }
}

/// Split decoded text into a header and keyed rows.
///
/// Preamble lines before the header are skipped, all-blank rows are dropped,
/// short rows keep only the cells they have and extra cells are discarded.
pub fn tokenize_text(text: &str) -> Result<Table, ImportError> {
    let delimiter = sniff_delimiter(text);
    debug!("Sniffed delimiter {:?}", delimiter as char);
    tokenize_with_delimiter(text, delimiter)
}

pub fn tokenize_with_delimiter(text: &str, delimiter: u8) -> Result<Table, ImportError> {
    let scanned = scan_records(text, delimiter);
    let header_idx = find_header(&scanned).ok_or_else(|| {
        ImportError::CatastrophicInput("no header row with at least two columns".to_string())
    })?;
    if header_idx > 0 {
        info!("Skipping {} preamble line(s) before header", header_idx);
    }

    let header = &scanned[header_idx];
    let headers = unique_headers(&header.cells);
    let body = text.get(header.end..).unwrap_or_default();
    let rows = read_body(body, delimiter, &headers);

    Ok(Table {
        headers,
        rows,
        delimiter,
    })
}

/// The preamble and header line(s) of `text`, without any data rows.
///
/// Falls back to the first line when no header can be located.
pub fn head_text(text: &str) -> &str {
    let scanned = scan_records(text, sniff_delimiter(text));
    let end = match find_header(&scanned) {
        Some(idx) => scanned[idx].end,
        None => text.find('\n').map_or(text.len(), |i| i + 1),
    };
    text.get(..end).unwrap_or(text)
}

struct ScannedRecord {
    cells: Vec<String>,
    /// Byte offset just past the record terminator.
    end: usize,
}

fn csv_reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes())
}

fn scan_records(text: &str, delimiter: u8) -> Vec<ScannedRecord> {
    let mut reader = csv_reader(text, delimiter);
    let mut record = csv::StringRecord::new();
    let mut scanned = Vec::new();
    while scanned.len() < HEADER_SCAN_RECORDS {
        match reader.read_record(&mut record) {
            Ok(true) => scanned.push(ScannedRecord {
                cells: record.iter().map(str::to_string).collect(),
                end: past_line_feed(text, reader.position().byte() as usize),
            }),
            Ok(false) => break,
            Err(e) => {
                debug!("Stopped header scan at unreadable record: {}", e);
                break;
            }
        }
    }
    scanned
}

/// The reader stops after the `\r` of a CRLF; step over its `\n` too.
fn past_line_feed(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    if end > 0 && bytes.get(end - 1) == Some(&b'\r') && bytes.get(end) == Some(&b'\n') {
        end + 1
    } else {
        end
    }
}

fn non_empty(cells: &[String]) -> usize {
    cells.iter().filter(|c| !c.trim().is_empty()).count()
}

/// First record at least half as wide as the widest early record.
fn find_header(records: &[ScannedRecord]) -> Option<usize> {
    let widest = records.iter().map(|r| non_empty(&r.cells)).max()?;
    let needed = (widest + 1) / 2;
    records.iter().position(|r| {
        let n = non_empty(&r.cells);
        n >= 2 && n >= needed
    })
}

/// Data rows after the header.
///
/// A record that runs over several physical lines because of a stray quote
/// would swallow the rest of the file. When such a record does not fit the
/// header width, or its quote is still open at the end of input, only its
/// first line becomes a malformed row and reading restarts on the next line.
fn read_body(text: &str, delimiter: u8, headers: &[String]) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut offset = 0;
    while offset < text.len() {
        match read_until_runaway(&text[offset..], delimiter, headers, &mut rows) {
            Some(resume) => offset += resume,
            None => break,
        }
    }
    rows
}

/// Reads rows until end of input (`None`) or a runaway record, returning
/// the offset of the line after the runaway record's first line.
fn read_until_runaway(
    text: &str,
    delimiter: u8,
    headers: &[String],
    rows: &mut Vec<Row>,
) -> Option<usize> {
    let mut reader = csv_reader(text, delimiter);
    let mut record = csv::StringRecord::new();
    loop {
        let start = reader.position().byte() as usize;
        match reader.read_record(&mut record) {
            Ok(false) => return None,
            Ok(true) => {
                let end = reader.position().byte() as usize;
                let span = text.get(start..end).unwrap_or_default();
                let lead = span.len() - span.trim_start_matches(['\r', '\n']).len();
                let raw = span[lead..].trim_end_matches(['\r', '\n']);

                let open_at_eof = end >= text.len() && raw.matches('"').count() % 2 == 1;
                if let Some(first_break) = raw.find('\n') {
                    if record.len() != headers.len() || open_at_eof {
                        let line = raw[..first_break].trim_end_matches('\r');
                        warn!("Unbalanced quote in record starting {:?}", line);
                        rows.push(Row::from_pairs([(
                            MALFORMED_KEY.to_string(),
                            format!("unbalanced quote in {:?}", line),
                        )]));
                        return Some(start + lead + first_break + 1);
                    }
                }

                let row = Row::from_pairs(headers.iter().cloned().zip(record.iter().map(str::to_string)));
                if !row.is_blank() {
                    rows.push(row);
                }
            }
            Err(e) => {
                warn!("Skipping malformed record {}: {}", rows.len() + 1, e);
                rows.push(Row::from_pairs([(MALFORMED_KEY.to_string(), e.to_string())]));
                if reader.position().byte() as usize <= start {
                    return None;
                }
            }
        }
    }
}

/// Trimmed header names; blanks become `Column{n}` and repeats get ` (2)`,
/// ` (3)`, ... so every row key is unique.
fn unique_headers(cells: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let base = cell.trim().trim_start_matches('\u{feff}').trim().to_string();
        let base = if base.is_empty() {
            format!("Column{}", i + 1)
        } else {
            base
        };
        let mut name = base.clone();
        let mut n = 2;
        while out.contains(&name) {
            name = format!("{} ({})", base, n);
            n += 1;
        }
        out.push(name);
    }
    out
}

/// Pick the delimiter whose per-line count is most consistent across the
/// first non-empty lines. Ties keep the earlier candidate (comma first).
pub fn sniff_delimiter(text: &str) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = (b',', (0usize, 0usize));
    for delim in DELIMITERS {
        let counts: Vec<usize> = lines.iter().map(|l| count_unquoted(l, delim)).collect();
        let mut score = (0usize, 0usize);
        for &c in counts.iter().filter(|&&c| c > 0) {
            let freq = counts.iter().filter(|&&x| x == c).count();
            if (freq, c) > score {
                score = (freq, c);
            }
        }
        if score > best.1 {
            best = (delim, score);
        }
    }
    best.0
}

fn count_unquoted(line: &str, delim: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delim && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Leading slice of `text` of at most `max_bytes`, cut on a char boundary.
pub fn sample_text(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
