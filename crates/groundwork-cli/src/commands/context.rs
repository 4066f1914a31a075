//! Context command

use crate::app::{ContextArgs, OutputFormat};
use crate::output::print_json;
use anyhow::Result;
use groundwork_core::retrieval::format_context;
use groundwork_core::{Config, ContextBuilder};

pub async fn run(args: ContextArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    let k = args.top_k.unwrap_or(config.retrieval.top_k);

    let builder = ContextBuilder::new(super::open_index(config)?);
    let hits = builder.search(&query, k).await;

    match format {
        OutputFormat::Json => {
            let passages: Vec<_> = hits
                .iter()
                .map(|hit| {
                    serde_json::json!({
                        "id": hit.entry.id,
                        "source": hit.entry.metadata.source,
                        "kind": hit.entry.metadata.kind,
                        "chunk_index": hit.entry.metadata.chunk_index,
                        "distance": hit.distance,
                        "text": hit.entry.text,
                    })
                })
                .collect();
            print_json(&passages)?;
        }
        OutputFormat::Text => {
            if hits.is_empty() {
                eprintln!("No relevant context found");
            } else {
                print!("{}", format_context(&hits));
            }
        }
    }
    Ok(())
}
