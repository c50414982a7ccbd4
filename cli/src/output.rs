//! Output formatting: human-readable, JSON, or YAML, selectable per
//! invocation.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// A result renderable in all three `OutputFormat`s. `write_human` is the
/// only method implementors must supply; JSON/YAML fall out of `Serialize`.
pub trait Output: Serialize {
    fn write_human(&self) -> String;

    fn write(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Human => self.write_human(),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
            OutputFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }
}

pub fn print_output<T: Output>(value: &T, format: OutputFormat) -> Result<()> {
    println!("{}", value.write(format)?);
    Ok(())
}

pub fn print_error(message: &str) {
    eprintln!("{} {message}", "error:".red().bold());
}
