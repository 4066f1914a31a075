//! Status command

use crate::app::OutputFormat;
use crate::output::{print_json, Painter};
use anyhow::Result;
use groundwork_core::{Config, Reconciler};
use termcolor::Color;

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let store = super::open_index(config)?;
    let available = store.is_available();
    let status = Reconciler::from_config(config, store).status().await?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "store_available": available,
            "needs_indexing": status.needs_indexing(),
            "indexed": status.indexed,
            "unindexed": status.unindexed,
            "modified": status.modified,
            "missing": status.missing,
        }));
    }

    let mut out = Painter::stdout();
    out.plain(&format!("Documents:     {}", config.corpus.root.display()))?;
    if !available {
        out.line(Color::Red, "Vector store:  ", "unavailable")?;
    }
    out.line(Color::Green, "  Indexed:     ", &status.indexed.len().to_string())?;
    out.line(Color::Yellow, "  Unindexed:   ", &status.unindexed.len().to_string())?;
    out.line(Color::Yellow, "  Modified:    ", &status.modified.len().to_string())?;
    out.line(Color::Red, "  Missing:     ", &status.missing.len().to_string())?;

    for (heading, paths) in [
        ("Unindexed:", &status.unindexed),
        ("Modified:", &status.modified),
        ("Missing:", &status.missing),
    ] {
        if paths.is_empty() {
            continue;
        }
        out.plain("")?;
        out.plain(heading)?;
        for path in paths {
            out.plain(&format!("  {}", path))?;
        }
    }

    if status.needs_indexing() {
        out.plain("")?;
        out.plain("Run `groundwork reindex` to bring the index up to date.")?;
    }
    Ok(())
}
