//! Save command

use crate::app::{OutputFormat, SaveArgs};
use crate::output::print_json;
use anyhow::{Context, Result};
use groundwork_core::{Config, Reconciler, ReindexOutcome};
use std::io::Read;

pub async fn run(args: SaveArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let content = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let outcome = super::library(config).save(&args.path, &content)?;

    let report = if args.reindex {
        let reconciler = Reconciler::from_config(config, super::open_index(config)?);
        Some(reconciler.reindex(Some(&[outcome.path.clone()])).await?)
    } else {
        None
    };

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "saved": outcome,
            "reindex": report,
        }))?,
        OutputFormat::Text => {
            println!("Saved {} ({} bytes)", outcome.path, outcome.bytes_written);
            if let Some(warning) = &outcome.yaml_warning {
                eprintln!("Warning: YAML may have syntax issues: {}", warning);
            }
            if let Some(report) = report.filter(|r| r.outcome == ReindexOutcome::Completed) {
                println!(
                    "Reindexed: indexed {}, updated {}, skipped {}",
                    report.indexed_count, report.updated_count, report.skipped_count
                );
            } else if args.reindex {
                eprintln!("Warning: vector store unavailable; document not reindexed");
            }
        }
    }
    Ok(())
}
