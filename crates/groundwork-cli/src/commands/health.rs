//! Health command

use crate::app::OutputFormat;
use crate::output::{print_json, Painter};
use anyhow::Result;
use groundwork_core::llm::model_is_available;
use groundwork_core::{create_generator, Config, GroundworkError};
use termcolor::Color;

pub async fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let store_available = super::open_index(config)?.is_available();
    let generator = create_generator(config)?;

    let (models, connection_error) = match generator.check_connection().await {
        Ok(models) => (models, None),
        Err(e) => (Vec::new(), Some(e.to_string())),
    };
    let connected = connection_error.is_none();
    let model_available = model_is_available(&models, generator.model_name());
    let healthy = connected && model_available && store_available;

    if format == OutputFormat::Json {
        print_json(&serde_json::json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "generator_connected": connected,
            "model": generator.model_name(),
            "model_available": model_available,
            "available_models": models,
            "store_available": store_available,
            "error": connection_error,
        }))?;
    } else {
        let mut out = Painter::stdout();
        match &connection_error {
            None => out.line(Color::Green, "Generator:     ", &config.generation.url)?,
            Some(e) => out.line(Color::Red, "Generator:     ", &format!("unreachable ({})", e))?,
        }
        if model_available {
            out.line(Color::Green, "Model:         ", generator.model_name())?;
        } else {
            out.line(
                Color::Red,
                "Model:         ",
                &format!("{} not installed", generator.model_name()),
            )?;
        }
        if store_available {
            out.line(Color::Green, "Vector store:  ", "available")?;
        } else {
            out.line(Color::Red, "Vector store:  ", "unavailable")?;
        }
    }

    if !healthy {
        return Err(GroundworkError::Unavailable("backend checks failed".to_string()).into());
    }
    Ok(())
}
