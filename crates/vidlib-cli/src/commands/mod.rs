//! Command implementations for the vl CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod check;
pub mod completions;
pub mod config;
pub mod eval;

use std::path::PathBuf;

use vidlib_filter::{ExprFactory, FilterError, FlexibleDateParser};

use crate::cli::Cli;
use config::Config;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Filter parsing, type-checking or evaluation error.
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed records or tags input.
    #[error("invalid input: {0}")]
    Input(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Config file given on the command line or through `VL_CONFIG`.
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color,
            quiet: cli.quiet,
            config_path: cli.config.clone(),
        }
    }

    /// Whether to color output, honoring both `--no-color` and the config file.
    pub fn use_colors_for(&self, config: &Config) -> bool {
        self.use_colors && config.output.color != Some(false)
    }
}

/// Builds the date parser described by the config.
pub fn date_parser(config: &Config) -> FlexibleDateParser {
    FlexibleDateParser::new().with_formats(config.dates.formats.iter().cloned())
}

/// Builds an expression factory from the config's schema and tag names.
pub fn factory_from_config(config: &Config) -> Result<ExprFactory> {
    let factory = ExprFactory::new(config.schema.clone(), config.tags.names.iter().cloned())?;
    Ok(factory.with_date_parser(std::sync::Arc::new(date_parser(config))))
}
