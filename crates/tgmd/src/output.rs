//! Colored diagnostics on stderr.
//!
//! Command results (rendered text, JSON, entity tables) are written to stdout
//! by the commands themselves; everything here is for the person at the
//! terminal.

use std::path::Path;

use console::{Style, Term};

use tgmd_config::CONFIG_FILENAME;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    red: Style,
    cyan_bold: Style,
    dim: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print which configuration file is in effect (cyan bold).
    pub(crate) fn config_source(&self, path: Option<&Path>) {
        let msg = match path {
            Some(path) => format!("Configuration: {}", path.display()),
            None => format!("Configuration: defaults (no {CONFIG_FILENAME} found)"),
        };
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print one effective setting as `key = value`, the key dimmed.
    pub(crate) fn setting(&self, key: &str, value: &str) {
        let _ = self
            .term
            .write_line(&format!("{} = {value}", self.dim.apply_to(key)));
    }
}
