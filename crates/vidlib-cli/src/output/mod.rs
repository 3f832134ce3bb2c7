//! Output formatting utilities for the vl CLI.
//!
//! This module provides functions for formatting results as text or JSON:
//!
//! - [`expressions`] - Parsed expression summaries, trees and diagnostics
//! - [`records`] - Eval results
//! - [`helpers`] - Common formatting utilities

mod expressions;
pub mod helpers;
mod records;

pub use expressions::{format_check_json, format_check_table, format_diagnostic, format_tree};
pub use records::{format_records_json, format_records_table};
