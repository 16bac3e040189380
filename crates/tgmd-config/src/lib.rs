//! Configuration management for tgmd.
//!
//! Parses `tgmd.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [render]
//! offset_encoding = "utf16"
//! max_depth = 128
//! unknown_nodes = "error"
//! newline = "lf"
//! keep_code_fences = false
//!
//! [parser]
//! strikethrough = true
//! emoji = true
//! max_depth = 256
//!
//! [markup]
//! strip_all = false
//! strip_tags = ["b", "i"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tgmd_renderer::ast::Newline;
use tgmd_renderer::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_NESTING, MarkupFilter, OffsetEncoding, ParseOptions,
    RenderOptions, UnknownNodePolicy,
};

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "tgmd.toml";

/// Upper bound accepted for `render.max_depth`.
const MAX_DEPTH_LIMIT: usize = 10_000;

/// Upper bound accepted for `parser.max_depth`.
const MAX_NESTING_LIMIT: usize = 1024;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the span offset unit.
    pub offset_encoding: Option<OffsetEncoding>,
    /// Override the nesting depth limit.
    pub max_depth: Option<usize>,
    /// Strip every raw inline tag.
    pub strip_html: Option<bool>,
    /// Override fence replay for fenced code blocks.
    pub keep_code_fences: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Renderer configuration.
    pub render: RenderConfig,
    /// Markdown parser configuration.
    pub parser: ParserConfig,
    /// Raw inline markup handling.
    pub markup: MarkupConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Renderer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Unit of span offsets.
    pub offset_encoding: OffsetEncoding,
    /// Maximum node nesting depth.
    pub max_depth: usize,
    /// Policy for nodes without a rendering rule.
    pub unknown_nodes: UnknownNodePolicy,
    /// Terminator written where the document recorded none.
    pub newline: Newline,
    /// Replay fence lines around code blocks.
    pub keep_code_fences: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            offset_encoding: OffsetEncoding::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            unknown_nodes: UnknownNodePolicy::default(),
            newline: Newline::Lf,
            keep_code_fences: false,
        }
    }
}

/// Markdown parser configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Recognize `~~strikethrough~~`.
    pub strikethrough: bool,
    /// Replace `:shortcode:` names and smileys with emoji.
    pub emoji: bool,
    /// Deepest container nesting kept while parsing.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strikethrough: true,
            emoji: true,
            max_depth: DEFAULT_MAX_NESTING,
        }
    }
}

/// Raw inline markup configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Consume every raw inline tag.
    pub strip_all: bool,
    /// Tag names to consume, case-insensitive.
    pub strip_tags: Vec<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tgmd.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let start = std::env::current_dir()?;
        Self::load_from(&start, config_path, cli_settings)
    }

    /// Same as [`load`](Self::load) with discovery starting at `start`.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_from(
        start: &Path,
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config(start) {
            Self::load_from_file(&discovered)?
        } else {
            tracing::debug!(start = %start.display(), "No config file found, using defaults");
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(encoding) = settings.offset_encoding {
            self.render.offset_encoding = encoding;
        }
        if let Some(max_depth) = settings.max_depth {
            self.render.max_depth = max_depth;
        }
        if let Some(strip_html) = settings.strip_html {
            self.markup.strip_all = strip_html;
        }
        if let Some(keep_code_fences) = settings.keep_code_fences {
            self.render.keep_code_fences = keep_code_fences;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_render()?;
        self.validate_parser()?;
        self.validate_markup()?;
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        let max_depth = self.render.max_depth;
        if max_depth == 0 {
            return Err(ConfigError::Validation(
                "render.max_depth must be greater than 0".to_owned(),
            ));
        }
        if max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::Validation(format!(
                "render.max_depth cannot exceed {MAX_DEPTH_LIMIT}"
            )));
        }
        if self.render.newline.is_none() {
            return Err(ConfigError::Validation(
                "render.newline must be a line terminator".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_parser(&self) -> Result<(), ConfigError> {
        let max_depth = self.parser.max_depth;
        if !(1..=MAX_NESTING_LIMIT).contains(&max_depth) {
            return Err(ConfigError::Validation(format!(
                "parser.max_depth must be between 1 and {MAX_NESTING_LIMIT}"
            )));
        }
        Ok(())
    }

    fn validate_markup(&self) -> Result<(), ConfigError> {
        if let Some(tag) = self
            .markup
            .strip_tags
            .iter()
            .find(|tag| !is_tag_name(tag))
        {
            return Err(ConfigError::Validation(format!(
                "markup.strip_tags contains invalid tag name {tag:?}"
            )));
        }
        Ok(())
    }

    /// Renderer options described by this configuration.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions::default()
            .with_offset_encoding(self.render.offset_encoding)
            .with_max_depth(self.render.max_depth)
            .with_unknown_nodes(self.render.unknown_nodes)
            .with_newline(self.render.newline)
            .with_keep_code_fences(self.render.keep_code_fences)
    }

    /// Parser options described by this configuration.
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default()
            .with_strikethrough(self.parser.strikethrough)
            .with_emoji(self.parser.emoji)
            .with_max_depth(self.parser.max_depth)
    }

    /// Markup interceptor described by this configuration.
    #[must_use]
    pub fn markup_filter(&self) -> MarkupFilter {
        if self.markup.strip_all {
            MarkupFilter::strip_all()
        } else if self.markup.strip_tags.is_empty() {
            MarkupFilter::keep_all()
        } else {
            MarkupFilter::strip_tags(&self.markup.strip_tags)
        }
    }
}

/// Tag names the markup filter can match: a letter, then letters, digits or
/// `-`.
fn is_tag_name(tag: &str) -> bool {
    tag.starts_with(|c: char| c.is_ascii_alphabetic())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
