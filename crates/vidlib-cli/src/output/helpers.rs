//! Common helper functions for output formatting.

use owo_colors::OwoColorize;

/// Truncates a string to a maximum number of characters.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Formats a flag as "yes" / "no".
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Formats a label column, dimmed when colors are on.
pub fn format_label(label: &str, use_colors: bool) -> String {
    if use_colors {
        label.dimmed().to_string()
    } else {
        label.to_string()
    }
}
