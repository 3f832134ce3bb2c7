//! End-to-end tests for the `vl` binary.
//!
//! Each test runs the real binary inside a temporary sandbox holding its own
//! config file and input files, so tests never touch the user's config.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const CONFIG: &str = r#"
version = 1

[schema]
handle = "handle"

[schema.fields]
handle = "integer"
title = "string"
year = "integer"
rating = "double"
watched = "boolean"
added = "timestamp"

[tags]
names = ["Genre"]
"#;

const RECORDS: &str = r#"[
    {"handle": 1, "title": "Heat", "year": 1995, "rating": 8.3, "watched": true, "added": "2024-03-14"},
    {"handle": 2, "title": "War Horse", "year": 2011, "rating": 7.2, "watched": false, "added": "2024-03-10"},
    {"handle": 3, "title": "Ran", "year": 1985, "rating": 8.2, "watched": false, "added": "2024-03-15T09:00:00Z"},
    {"handle": 4, "title": "The War Game", "year": 1966, "rating": 7.9, "watched": true, "added": "2023-12-01"}
]"#;

const TAGS: &str = r#"{
    "Genre": {
        "1": ["Crime", "Drama"],
        "2": ["Drama", "War"],
        "3": ["Drama", "War"],
        "4": ["Documentary", "War"]
    },
    "Mood": {
        "3": ["Epic"]
    }
}"#;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: TempDir::new().expect("failed to create temporary sandbox"),
        };
        sandbox.write("config.toml", CONFIG);
        sandbox.write("records.json", RECORDS);
        sandbox.write("tags.json", TAGS);
        sandbox
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.path(name), content).expect("failed to write sandbox file");
    }

    fn command(&self, config: &Path) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_vl"));
        cmd.env("VL_CONFIG", config);
        cmd.env("XDG_CONFIG_HOME", self.path("xdg"));
        cmd.env_remove("RUST_LOG");
        cmd.arg("--no-color");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(&self.path("config.toml"))
            .args(args)
            .output()
            .expect("failed to run vl")
    }

    fn eval(&self, expr: &str, extra: &[&str]) -> Output {
        let records = self.path("records.json");
        let tags = self.path("tags.json");
        let mut args = vec![
            "eval",
            expr,
            "--records",
            records.to_str().unwrap(),
            "--tags",
            tags.to_str().unwrap(),
            "--now",
            "2024-03-15T18:30:00Z",
        ];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(text: &str) -> Value {
    serde_json::from_str(text)
        .unwrap_or_else(|err| panic!("not valid JSON ({err}):\n{text}"))
}

fn matched_handles(output: &Output) -> Vec<i64> {
    assert!(output.status.success(), "eval failed:\n{}", stderr(output));
    json(&stdout(output))["handles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h.as_i64().unwrap())
        .collect()
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_prints_canonical_text() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["check", "rating>=8 and genre='Drama'"]);

    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("(rating >= 8) AND (Genre = \"Drama\")\n"));
    assert!(text.contains("Reads tags:  yes"));
}

#[test]
fn test_check_tree() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["check", "NOT watched", "--tree"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Not\n  watched : Boolean\n"));
}

#[test]
fn test_check_json() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["--json", "check", "year < 1990"]);

    assert!(output.status.success());
    let value = json(&stdout(&output));
    assert_eq!(value["expression"], "year < 1990");
    assert_eq!(value["tree"]["operator"], "LessThan");
    assert_eq!(value["needs_tags"], false);
}

#[test]
fn test_check_reports_caret_diagnostic() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["check", "rating >"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Error: unexpected end of expression"));
    assert!(err.contains("rating >\n        ^ unexpected end of expression"));
}

#[test]
fn test_check_json_error() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["--json", "check", "ratng > 3"]);

    assert_eq!(output.status.code(), Some(1));
    let value = json(&stderr(&output));
    assert_eq!(value["error"]["code"], "PARSE_ERROR");
    assert_eq!(value["error"]["column"], 0);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("did you mean 'rating'?"));
}

// ============================================================================
// eval
// ============================================================================

#[test]
fn test_eval_filters_records() {
    let sandbox = Sandbox::new();

    let output = sandbox.eval(r#"title ~$ "war" AND Genre = "War""#, &["--json"]);
    assert_eq!(matched_handles(&output), vec![2, 4]);

    let output = sandbox.eval("rating > 8 OR Mood = 'Epic'", &["--json"]);
    assert_eq!(matched_handles(&output), vec![1, 3]);
}

#[test]
fn test_eval_relative_dates_use_reference_time() {
    let sandbox = Sandbox::new();
    let output = sandbox.eval(r#"added >= "yesterday""#, &["--json"]);
    assert_eq!(matched_handles(&output), vec![1, 3]);
}

#[test]
fn test_eval_table_and_limit() {
    let sandbox = Sandbox::new();
    let output = sandbox.eval("Genre = 'Drama'", &["--limit", "1"]);

    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.starts_with("Handle     Title\n1          Heat\n"));
    assert!(text.contains("3 of 4 records matched (showing 1, use --all to see every match)"));
}

#[test]
fn test_eval_rejects_non_boolean_filter() {
    let sandbox = Sandbox::new();
    let output = sandbox.eval("title", &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("must be a Boolean expression"));
}

#[test]
fn test_eval_missing_field_fails() {
    let sandbox = Sandbox::new();
    sandbox.write("records.json", r#"[{"handle": 9, "title": "Untitled"}]"#);
    let output = sandbox.eval("rating > 5", &[]);

    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("record has no value for field 'rating'"));
}

#[test]
fn test_eval_malformed_tags_file() {
    let sandbox = Sandbox::new();
    sandbox.write("tags.json", r#"{"Genre": {"one": ["Drama"]}}"#);
    let output = sandbox.eval("watched", &["--json"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json(&stderr(&output))["error"]["code"], "INPUT_ERROR");
}

#[test]
fn test_eval_missing_records_file() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["eval", "watched", "--records", "/nonexistent/records.json"]);
    assert_eq!(output.status.code(), Some(3));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_init_and_show() {
    let sandbox = Sandbox::new();
    let config = sandbox.path("fresh").join("config.toml");

    let output = sandbox
        .command(&config)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(config.exists());

    let output = sandbox
        .command(&config)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));

    let output = sandbox
        .command(&config)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    let value = json(&stdout(&output));
    assert_eq!(value["exists"], true);
    assert_eq!(value["config"]["schema"]["handle"], "handle");
    assert_eq!(value["config"]["tags"]["names"][0], "Genre");
}

#[test]
fn test_config_path_honors_flag() {
    let sandbox = Sandbox::new();
    let explicit = sandbox.path("other.toml");
    let output = sandbox.run(&["config", "path", "--config", explicit.to_str().unwrap()]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), explicit.display().to_string());
}

#[test]
fn test_bad_config_is_reported() {
    let sandbox = Sandbox::new();
    sandbox.write("config.toml", "version = 99\n");
    let output = sandbox.run(&["check", "TRUE"]);

    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("newer than this vl supports"));
}

#[test]
fn test_completions() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["completions", "bash"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("vl"));
}
