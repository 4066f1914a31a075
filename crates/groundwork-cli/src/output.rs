//! Terminal output helpers

use anyhow::Result;
use serde::Serialize;
use std::io::{IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Stdout writer that only colors when attached to a terminal
pub struct Painter {
    stream: StandardStream,
}

impl Painter {
    pub fn stdout() -> Self {
        let choice = if std::io::stdout().is_terminal() {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stream: StandardStream::stdout(choice),
        }
    }

    /// `label` in `color`, followed by plain `rest` and a newline
    pub fn line(&mut self, color: Color, label: &str, rest: &str) -> Result<()> {
        self.stream
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(self.stream, "{}", label)?;
        self.stream.reset()?;
        writeln!(self.stream, "{}", rest)?;
        Ok(())
    }

    pub fn plain(&mut self, text: &str) -> Result<()> {
        writeln!(self.stream, "{}", text)?;
        Ok(())
    }
}
