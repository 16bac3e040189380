//! `tgmd check-config` command implementation.

use std::path::PathBuf;

use clap::Args;
use tgmd_config::Config;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check-config command.
#[derive(Args)]
pub(crate) struct CheckConfigArgs {
    /// Path to configuration file (default: auto-discover tgmd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CheckConfigArgs {
    /// Execute the check-config command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;

        output.config_source(config.config_path.as_deref());
        for (key, value) in describe(&config) {
            output.setting(key, &value);
        }
        output.success("Configuration is valid");
        Ok(())
    }
}

/// Effective settings as `(key, value)` pairs.
fn describe(config: &Config) -> Vec<(&'static str, String)> {
    let render = &config.render;
    let parser = &config.parser;
    let markup = &config.markup;
    vec![
        ("render.offset_encoding", format!("{:?}", render.offset_encoding)),
        ("render.max_depth", render.max_depth.to_string()),
        ("render.unknown_nodes", format!("{:?}", render.unknown_nodes)),
        ("render.newline", format!("{:?}", render.newline.as_str())),
        ("render.keep_code_fences", render.keep_code_fences.to_string()),
        ("parser.strikethrough", parser.strikethrough.to_string()),
        ("parser.emoji", parser.emoji.to_string()),
        ("parser.max_depth", parser.max_depth.to_string()),
        ("markup.strip_all", markup.strip_all.to_string()),
        ("markup.strip_tags", format!("{:?}", markup.strip_tags)),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_describe_defaults() {
        let settings = describe(&Config::default());
        assert_eq!(settings.len(), 10);
        assert_eq!(settings[0], ("render.offset_encoding", "Utf16".to_owned()));
        assert_eq!(settings[1], ("render.max_depth", "128".to_owned()));
        assert_eq!(settings[3], ("render.newline", r#""\n""#.to_owned()));
        assert_eq!(settings[6], ("parser.emoji", "true".to_owned()));
        assert_eq!(settings[7], ("parser.max_depth", "256".to_owned()));
        assert_eq!(settings[9], ("markup.strip_tags", "[]".to_owned()));
    }
}
