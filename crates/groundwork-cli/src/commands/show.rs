//! Show command

use crate::app::{OutputFormat, ShowArgs};
use crate::output::print_json;
use anyhow::Result;
use groundwork_core::Config;

pub fn run(args: ShowArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let doc = super::library(config).read(&args.path)?;

    match format {
        OutputFormat::Json => print_json(&doc)?,
        OutputFormat::Text => {
            if doc.lossy {
                eprintln!("Warning: {} is not UTF-8; shown as Latin-1", doc.path);
            }
            print!("{}", doc.content);
            if !doc.content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
