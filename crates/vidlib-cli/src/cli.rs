//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the vl CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// vl - check and evaluate video library filter expressions
#[derive(Parser, Debug)]
#[command(name = "vl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (show debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (default: ~/.config/vl/config.toml)
    #[arg(long, global = true, env = "VL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and type-check a filter expression
    #[command(alias = "c")]
    Check {
        /// Filter expression (e.g., 'rating >= 7.5 AND Genre = "Drama"')
        expr: String,

        /// Print the expression tree
        #[arg(long)]
        tree: bool,
    },

    /// Evaluate a filter expression against records
    #[command(alias = "e")]
    Eval {
        /// Filter expression
        expr: String,

        /// JSON file holding an array of record objects
        #[arg(short, long)]
        records: PathBuf,

        /// JSON file mapping tag names to { handle: [values] }
        #[arg(short, long)]
        tags: Option<PathBuf>,

        /// Reference time for now/today/yesterday/tomorrow (RFC 3339)
        #[arg(long)]
        now: Option<String>,

        /// Limit results (default: 50)
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Show all matches (no limit)
        #[arg(long)]
        all: bool,
    },

    /// View and initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print config file path
    Path,

    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Supported shells for completions
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}
