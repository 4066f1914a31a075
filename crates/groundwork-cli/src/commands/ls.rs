//! List command

use crate::app::OutputFormat;
use crate::output::print_json;
use anyhow::Result;
use groundwork_core::Config;

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let docs = super::library(config).list();

    match format {
        OutputFormat::Json => print_json(&docs)?,
        OutputFormat::Text => {
            for doc in docs {
                println!("{}  {:>9}  {}", doc.modified, doc.size, doc.path);
            }
        }
    }
    Ok(())
}
