//! Reindex command

use crate::app::{OutputFormat, ReindexArgs};
use crate::output::print_json;
use anyhow::Result;
use groundwork_core::{Config, GroundworkError, Reconciler, ReindexOutcome};

pub async fn run(args: ReindexArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let store = super::open_index(config)?;
    let reconciler = Reconciler::from_config(config, store);

    let targets = (!args.targets.is_empty()).then_some(args.targets.as_slice());
    let report = reconciler.reindex(targets).await?;

    if format == OutputFormat::Json {
        print_json(&report)?;
    } else if report.outcome == ReindexOutcome::Completed {
        println!(
            "Indexed {}, updated {}, skipped {}, removed {}",
            report.indexed_count, report.updated_count, report.skipped_count, report.removed_count
        );
    }

    if report.outcome == ReindexOutcome::Unavailable {
        return Err(GroundworkError::Unavailable(
            "vector store is not available; nothing was indexed".to_string(),
        )
        .into());
    }
    Ok(())
}
