//! Eval result output formatting.

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::commands::eval::EvalResult;

use super::helpers::truncate_str;

/// JSON output structure for the eval command.
#[derive(Serialize)]
pub struct EvalOutput<'a> {
    pub matched: usize,
    pub total: usize,
    pub truncated: bool,
    pub handles: Vec<&'a Json>,
    pub records: Vec<&'a Map<String, Json>>,
}

/// Formats eval results as JSON.
pub fn format_records_json(result: &EvalResult, handle: &str) -> Result<String, serde_json::Error> {
    let output = EvalOutput {
        matched: result.matched_total,
        total: result.total,
        truncated: result.matched.len() < result.matched_total,
        handles: result
            .matched
            .iter()
            .filter_map(|record| record.source().get(handle))
            .collect(),
        records: result.matched.iter().map(|record| record.source()).collect(),
    };

    serde_json::to_string_pretty(&output)
}

/// Formats eval results as a table.
pub fn format_records_table(
    result: &EvalResult,
    handle: &str,
    title_field: &str,
    use_colors: bool,
) -> String {
    if result.matched.is_empty() {
        return format!("No matching records ({} evaluated).\n", result.total);
    }

    let mut output = String::new();

    let header = format!("{:<10} {}", "Handle", "Title");
    if use_colors {
        output.push_str(&format!("{}\n", header.dimmed()));
    } else {
        output.push_str(&header);
        output.push('\n');
    }

    for record in &result.matched {
        let line = format!(
            "{:<10} {}",
            truncate_str(&record.display_field(handle), 10),
            record.display_field(title_field)
        );
        output.push_str(&line);
        output.push('\n');
    }

    let mut summary = format!("{} of {} records matched", result.matched_total, result.total);
    if result.matched.len() < result.matched_total {
        summary.push_str(&format!(
            " (showing {}, use --all to see every match)",
            result.matched.len()
        ));
    }
    if use_colors {
        output.push_str(&format!("\n{}\n", summary.dimmed()));
    } else {
        output.push('\n');
        output.push_str(&summary);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::eval::JsonRecord;
    use vidlib_filter::{DomainType, FlexibleDateParser, Schema};

    fn records() -> Vec<JsonRecord> {
        let schema = Schema::new("handle")
            .with_field("handle", DomainType::Integer)
            .with_field("title", DomainType::String);
        let dates = FlexibleDateParser::new();
        [
            serde_json::json!({"handle": 1, "title": "Heat"}),
            serde_json::json!({"handle": 22, "title": "Ran", "note": "kurosawa"}),
        ]
        .into_iter()
        .map(|json| match json {
            Json::Object(object) => JsonRecord::from_object(object, &schema, &dates).unwrap(),
            _ => unreachable!(),
        })
        .collect()
    }

    #[test]
    fn test_format_records_table() {
        let records = records();
        let result = EvalResult {
            matched: records.iter().collect(),
            matched_total: 2,
            total: 5,
        };
        let output = format_records_table(&result, "handle", "title", false);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "Handle     Title");
        assert_eq!(lines[1], "1          Heat");
        assert_eq!(lines[2], "22         Ran");
        assert_eq!(lines[4], "2 of 5 records matched");
    }

    #[test]
    fn test_format_records_table_truncated() {
        let records = records();
        let result = EvalResult {
            matched: records.iter().take(1).collect(),
            matched_total: 2,
            total: 2,
        };
        let output = format_records_table(&result, "handle", "title", false);
        assert!(output.contains("2 of 2 records matched (showing 1, use --all to see every match)"));
    }

    #[test]
    fn test_format_records_table_empty() {
        let result = EvalResult {
            matched: Vec::new(),
            matched_total: 0,
            total: 3,
        };
        assert_eq!(
            format_records_table(&result, "handle", "title", false),
            "No matching records (3 evaluated).\n"
        );
    }

    #[test]
    fn test_format_records_json() {
        let records = records();
        let result = EvalResult {
            matched: records.iter().collect(),
            matched_total: 2,
            total: 4,
        };
        let json: Json = serde_json::from_str(&format_records_json(&result, "handle").unwrap())
            .unwrap();

        assert_eq!(json["matched"], 2);
        assert_eq!(json["total"], 4);
        assert_eq!(json["truncated"], false);
        assert_eq!(json["handles"], serde_json::json!([1, 22]));
        assert_eq!(json["records"][1]["note"], "kurosawa");
    }
}
