//! Output formatting for CLI display
//!
//! Every function returns a `String`; printing stays in the dispatcher.

use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::importers::adapters::AdapterDescriptor;
use crate::importers::MappingInference;
use crate::models::{ColumnMapping, ParseResult, RequiresMappingResult, TradeType};
use crate::utils::{format_amount, truncate_chars};

const PREVIEW_ROWS: usize = 20;
const MAX_WARNINGS_SHOWN: usize = 10;

/// Serialize any result for `--json`.
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Trade preview table plus import summary.
pub fn format_parse_result(result: &ParseResult) -> String {
    #[derive(Tabled)]
    struct TradePreview {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Type")]
        trade_type: String,
        #[tabled(rename = "Quantity")]
        qty: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Ccy")]
        currency: String,
        #[tabled(rename = "Fees")]
        fees: String,
    }

    let mut output = String::new();
    output.push_str(&format!(
        "\n{} {} export: {} trades\n\n",
        "✓".green().bold(),
        result.broker.bold(),
        result.trades.len()
    ));

    let preview: Vec<TradePreview> = result
        .trades
        .iter()
        .take(PREVIEW_ROWS)
        .map(|t| TradePreview {
            date: t.date.format("%Y-%m-%d").to_string(),
            ticker: t.ticker.clone(),
            trade_type: match t.trade_type {
                TradeType::Buy => t.trade_type.as_str().green().to_string(),
                TradeType::Sell => t.trade_type.as_str().red().to_string(),
            },
            qty: format_amount(t.qty),
            price: format_amount(t.price),
            currency: t.currency.clone(),
            fees: format_amount(t.fees),
        })
        .collect();

    if !preview.is_empty() {
        let table = Table::new(preview)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
            .with(Modify::new(Columns::new(6..)).with(Alignment::right()))
            .to_string();
        output.push_str(&table);
        output.push('\n');
    }
    if result.trades.len() > PREVIEW_ROWS {
        output.push_str(&format!(
            "\n... and {} more trades\n",
            result.trades.len() - PREVIEW_ROWS
        ));
    }

    if !result.warnings.is_empty() {
        output.push_str(&format!("\n{} Warnings:\n", "⚠".yellow().bold()));
        for warning in result.warnings.iter().take(MAX_WARNINGS_SHOWN) {
            output.push_str(&format!("  {}\n", warning));
        }
        if result.warnings.len() > MAX_WARNINGS_SHOWN {
            output.push_str(&format!(
                "  ... and {} more\n",
                result.warnings.len() - MAX_WARNINGS_SHOWN
            ));
        }
    }

    output.push_str(&format!("\n{}\n", result.summary().bright_black()));
    output
}

fn format_mapping_table(mapping: &ColumnMapping) -> String {
    #[derive(Tabled)]
    struct MappingRow {
        #[tabled(rename = "Role")]
        role: String,
        #[tabled(rename = "Column")]
        column: String,
        #[tabled(rename = "Confidence")]
        confidence: String,
    }

    let rows: Vec<MappingRow> = crate::models::Role::ALL
        .iter()
        .map(|role| {
            let (column, confidence) = match mapping.get(*role) {
                Some(a) => (a.column.clone(), format!("{:.2}", a.confidence)),
                None => ("-".to_string(), "-".to_string()),
            };
            let role = if role.is_required() {
                format!("{}*", role)
            } else {
                role.to_string()
            };
            MappingRow {
                role,
                column,
                confidence,
            }
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string()
}

/// Proposed mapping for an export that could not be parsed unattended.
pub fn format_requires_mapping(pending: &RequiresMappingResult, file: &str) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "\n{} Unrecognized format, mapping needs confirmation: {}\n\n",
        "?".yellow().bold(),
        pending.reason
    ));
    output.push_str(&format_mapping_table(&pending.inferred_mapping));
    output.push_str(&format!(
        "\n\nColumns: {}\n",
        truncate_chars(&pending.headers.join(", "), 200)
    ));
    output.push_str(&format!(
        "Confirm with: {} map {} --map date=<column> --map ticker=<column> --map quantity=<column> --map price=<column>\n",
        "broker-import".bold(),
        file
    ));
    output
}

pub fn format_inference(inference: &MappingInference) -> String {
    let mut output = format_mapping_table(&inference.mapping);
    let status = if inference.is_confident() {
        "resolved".green().to_string()
    } else {
        inference.reason().yellow().to_string()
    };
    output.push_str(&format!("\n\n{} {}\n", "Status:".bold(), status));
    output
}

pub fn format_brokers(adapters: &[AdapterDescriptor]) -> String {
    #[derive(Tabled)]
    struct BrokerRow {
        #[tabled(rename = "#")]
        order: usize,
        #[tabled(rename = "Id")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Locale")]
        locale: String,
        #[tabled(rename = "Version")]
        version: String,
    }

    let rows: Vec<BrokerRow> = adapters
        .iter()
        .enumerate()
        .map(|(i, a)| BrokerRow {
            order: i + 1,
            id: a.id.to_string(),
            name: a.name.to_string(),
            locale: a.default_locale.to_string(),
            version: a.version.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::modern()).to_string()
}
