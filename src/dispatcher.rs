//! Routes parsed CLI commands to the import pipeline and prints the result.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tracing::info;

use crate::cli::{formatters, Commands};
use crate::config::ImportConfig;
use crate::importers::{self, registry, ImportFile};
use crate::models::{ColumnMapping, ImportOutcome};

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, config: &ImportConfig, json_output: bool) -> Result<()> {
    match command {
        Commands::Parse { file, locale, broker } => {
            dispatch_parse(&file, locale.as_deref(), broker.as_deref(), config, json_output).await
        }
        Commands::Detect { file } => dispatch_detect(&file, config, json_output).await,
        Commands::Infer { file } => dispatch_infer(&file, config, json_output).await,
        Commands::Map { file, map, locale } => {
            dispatch_map(&file, ColumnMapping::confirmed(map), locale.as_deref(), config, json_output)
                .await
        }
        Commands::Brokers => {
            if json_output {
                #[derive(serde::Serialize)]
                struct JsonBroker<'a> {
                    id: &'a str,
                    name: &'a str,
                    default_locale: &'a str,
                    version: &'a str,
                }
                let brokers: Vec<JsonBroker> = registry::adapters()
                    .iter()
                    .map(|a| JsonBroker {
                        id: a.id,
                        name: a.name,
                        default_locale: a.default_locale,
                        version: a.version,
                    })
                    .collect();
                println!("{}", formatters::format_json(&brokers));
            } else {
                println!("{}", formatters::format_brokers(registry::adapters()));
            }
            Ok(())
        }
    }
}

async fn read_file(path: &Path) -> Result<String> {
    let file = ImportFile::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    importers::read_text(file)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn dispatch_parse(
    path: &Path,
    locale: Option<&str>,
    broker: Option<&str>,
    config: &ImportConfig,
    json_output: bool,
) -> Result<()> {
    info!("Parsing {}", path.display());
    let file = ImportFile::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let outcome = match broker {
        Some(id) => ImportOutcome::Parsed(
            importers::parse_with_adapter(file, id, locale, config)
                .await
                .with_context(|| format!("Failed to import {} as {}", path.display(), id))?,
        ),
        None => importers::parse_universal(file, locale, config)
            .await
            .with_context(|| format!("Failed to import {}", path.display()))?,
    };

    if json_output {
        println!("{}", formatters::format_json(&outcome));
        return Ok(());
    }
    match &outcome {
        ImportOutcome::Parsed(result) => print!("{}", formatters::format_parse_result(result)),
        ImportOutcome::RequiresMapping(pending) => print!(
            "{}",
            formatters::format_requires_mapping(pending, &path.display().to_string())
        ),
    }
    Ok(())
}

async fn dispatch_detect(path: &Path, config: &ImportConfig, json_output: bool) -> Result<()> {
    let text = read_file(path).await?;
    let broker = importers::detect_text(&text, config);
    if json_output {
        println!("{}", serde_json::json!({ "broker": broker }));
    } else if broker == registry::UNKNOWN {
        println!("{} {}", "?".yellow().bold(), broker);
    } else {
        println!("{} {}", "✓".green().bold(), broker);
    }
    Ok(())
}

async fn dispatch_infer(path: &Path, config: &ImportConfig, json_output: bool) -> Result<()> {
    let text = read_file(path).await?;
    let (inference, headers, _) = importers::infer_text(&text, config)?;
    if json_output {
        let value = serde_json::json!({
            "headers": headers,
            "mapping": inference.mapping,
            "candidates": inference.candidates,
            "confident": inference.is_confident(),
            "reason": inference.reason(),
        });
        println!("{}", formatters::format_json(&value));
    } else {
        print!("{}", formatters::format_inference(&inference));
    }
    Ok(())
}

async fn dispatch_map(
    path: &Path,
    mapping: ColumnMapping,
    locale: Option<&str>,
    config: &ImportConfig,
    json_output: bool,
) -> Result<()> {
    let text = read_file(path).await?;
    let result = importers::generic_parse(&text, &mapping, locale, config)
        .with_context(|| format!("Failed to parse {} with the given mapping", path.display()))?;
    if json_output {
        println!("{}", formatters::format_json(&ImportOutcome::Parsed(result)));
    } else {
        print!("{}", formatters::format_parse_result(&result));
    }
    Ok(())
}
