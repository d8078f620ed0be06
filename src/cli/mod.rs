use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Role;

pub mod formatters;

#[derive(Parser)]
#[command(name = "broker-import")]
#[command(version, about = "Import broker and exchange trade exports")]
#[command(
    long_about = "Detect which broker or exchange produced an export, parse it into canonical trades, and infer a column mapping for unknown formats."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/broker-import/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse an export (auto-detects the broker)
    Parse {
        /// Path to the CSV, TSV or XLSX export
        file: PathBuf,

        /// Locale tag for dates and numbers (e.g., en-GB, de-DE)
        #[arg(short, long)]
        locale: Option<String>,

        /// Skip detection and use this adapter id
        #[arg(short, long)]
        broker: Option<String>,
    },

    /// Print the adapter id that recognizes a file
    Detect {
        /// Path to the export
        file: PathBuf,
    },

    /// Show the inferred column mapping with confidences
    Infer {
        /// Path to the export
        file: PathBuf,
    },

    /// Parse with a confirmed column mapping
    Map {
        /// Path to the export
        file: PathBuf,

        /// Role assignment, repeatable: --map date="Txn Date" --map price=Cost
        #[arg(short, long = "map", value_parser = parse_assignment, required = true)]
        map: Vec<(Role, String)>,

        /// Locale tag for dates and numbers
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// List the adapters in detection order
    Brokers,
}

/// `role=Column` → (role, column)
pub fn parse_assignment(value: &str) -> Result<(Role, String), String> {
    let (role, column) = value
        .split_once('=')
        .ok_or_else(|| format!("expected role=Column, got {:?}", value))?;
    let role: Role = role.parse()?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("no column given for {}", role));
    }
    Ok((role, column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("date=Txn Date").unwrap(),
            (Role::Date, "Txn Date".to_string())
        );
        assert_eq!(parse_assignment("symbol=Sym").unwrap().0, Role::Ticker);
        assert!(parse_assignment("price").is_err());
        assert!(parse_assignment("price=").is_err());
        assert!(parse_assignment("volume=Qty").is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["broker-import", "detect", "a.csv", "--json", "--no-color"]).unwrap();
        assert!(cli.json);
        assert!(cli.no_color);
    }
}
