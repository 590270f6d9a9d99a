//! Terminal output
//!
//! Commands print through an [`OutputFormatter`], which writes colored text
//! for humans or JSON documents when `--json` is given.

use crate::error::Result;
use colored::Colorize;
use serde::Serialize;

/// Output formatter shared by every command handler
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    json: bool,
}

impl OutputFormatter {
    /// Create a formatter
    ///
    /// `no_color` disables ANSI colors for the whole process.
    pub fn new(json: bool, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { json }
    }

    pub const fn is_json(&self) -> bool {
        self.json
    }

    /// Print a value as pretty JSON on stdout
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn success(&self, message: &str) {
        if !self.json {
            println!("{} {message}", "✓".green().bold());
        }
    }

    pub fn info(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {message}", "warning:".yellow().bold());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {message}", "error:".red().bold());
    }

    /// A section title
    pub fn title(&self, text: &str) {
        if !self.json {
            println!("{}", text.bold());
        }
    }

    /// A `label: value` line, with the label dimmed
    pub fn field(&self, label: &str, value: &str) {
        if !self.json {
            println!("  {} {value}", format!("{label}:").dimmed());
        }
    }
}
