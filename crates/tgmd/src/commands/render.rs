//! `tgmd render` command implementation.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use tgmd_config::{CliSettings, Config};
use tgmd_renderer::{OffsetEncoding, RenderOutput, Renderer};

use crate::error::CliError;

/// Output format of the render command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// Rendered text only.
    #[default]
    Text,
    /// Text and entities as JSON.
    Json,
    /// Rendered text followed by an entity table.
    Entities,
}

/// Span offset unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Offsets {
    Utf16,
    Utf8,
    Chars,
}

impl From<Offsets> for OffsetEncoding {
    fn from(offsets: Offsets) -> Self {
        match offsets {
            Offsets::Utf16 => Self::Utf16,
            Offsets::Utf8 => Self::Utf8,
            Offsets::Chars => Self::Chars,
        }
    }
}

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render; `-` or nothing reads stdin.
    input: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Path to configuration file (default: auto-discover tgmd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Drop every raw inline HTML tag (overrides config).
    #[arg(long)]
    strip_html: bool,

    /// Unit of entity offsets (overrides config).
    #[arg(long, value_enum)]
    offsets: Option<Offsets>,

    /// Keep fence lines of fenced code blocks (overrides config).
    #[arg(long)]
    keep_fences: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, input reading or rendering fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            offset_encoding: self.offsets.map(OffsetEncoding::from),
            strip_html: self.strip_html.then_some(true),
            keep_code_fences: self.keep_fences.then_some(true),
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let source = read_input(self.input.as_deref())?;
        let rendered = render_source(&source, &config)?;
        tracing::debug!(
            spans = rendered.spans.len(),
            format = ?self.format,
            "Rendered input"
        );

        let text = match self.format {
            Format::Text => rendered.text,
            Format::Json => {
                let mut json = serde_json::to_string_pretty(&rendered)?;
                json.push('\n');
                json
            }
            Format::Entities => format_entities(&rendered),
        };
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

fn read_input(input: Option<&Path>) -> Result<String, CliError> {
    match input {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => Ok(std::io::read_to_string(std::io::stdin())?),
    }
}

/// Render `source` with the renderer, parser and markup settings of `config`.
fn render_source(source: &str, config: &Config) -> Result<RenderOutput, CliError> {
    let renderer = Renderer::new()
        .with_options(config.render_options())
        .with_parse_options(config.parse_options());
    let mut filter = config.markup_filter();
    let rendered = renderer.render_markdown_with(source, &mut filter)?;
    if filter.consumed() > 0 {
        tracing::debug!(consumed = filter.consumed(), "Dropped inline markup");
    }
    Ok(rendered)
}

/// Rendered text followed by a `Type:Offset:Length:Text:Url` table.
fn format_entities(rendered: &RenderOutput) -> String {
    let mut table = rendered.text.clone();
    if !table.ends_with('\n') {
        table.push('\n');
    }
    table.push_str("Type:Offset:Length:Text:Url\n");
    for span in &rendered.spans {
        let _ = writeln!(
            table,
            "{}:{}:{}:{}:{}",
            span.kind,
            span.offset,
            span.length,
            rendered.span_text(span).unwrap_or_default(),
            span.url.as_deref().unwrap_or_default(),
        );
    }
    table
}
