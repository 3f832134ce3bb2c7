//! Check command implementation.
//!
//! Parses and type-checks a filter expression without evaluating it.

use log::debug;
use vidlib_filter::FilterError;

use super::config::load_config;
use super::{factory_from_config, CommandContext, Result};
use crate::output::{format_check_json, format_check_table, format_tree};

/// Options for the check command.
#[derive(Debug)]
pub struct CheckOptions {
    /// Filter expression.
    pub expr: String,
    /// Print the expression tree.
    pub tree: bool,
}

/// Executes the check command.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the expression does not
/// parse and type-check.
pub fn execute(ctx: &CommandContext, opts: &CheckOptions) -> Result<()> {
    let config = load_config(ctx.config_path.as_deref())?;
    let factory = factory_from_config(&config)?;

    let expr = factory.parse(&opts.expr).map_err(FilterError::from)?;
    debug!("parsed {} as {}", opts.expr, expr);

    if ctx.json_output {
        let output = format_check_json(&expr)?;
        println!("{output}");
    } else if !ctx.quiet {
        print!("{}", format_check_table(&expr, ctx.use_colors_for(&config)));
        if opts.tree {
            println!();
            print!("{}", format_tree(&expr));
        }
    }

    Ok(())
}
