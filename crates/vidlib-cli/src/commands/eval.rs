//! Eval command implementation.
//!
//! Compiles a filter expression and runs it over records loaded from a JSON
//! file, with tag memberships from an optional second JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde_json::{Map, Value as Json};
use vidlib_filter::{
    ExprFactory, FieldValue, FilterError, FlexibleDateParser, MapRecord, MemoryTagStore, Record,
    Schema, TagStore,
};

use super::config::load_config;
use super::{date_parser, CommandContext, CommandError, Result};
use crate::output::{format_records_json, format_records_table};

/// Options for the eval command.
#[derive(Debug)]
pub struct EvalOptions {
    /// Filter expression.
    pub expr: String,
    /// JSON file with an array of record objects.
    pub records: PathBuf,
    /// JSON file with tag memberships.
    pub tags: Option<PathBuf>,
    /// Reference time for relative date words (RFC 3339).
    pub now: Option<String>,
    /// Limit results.
    pub limit: usize,
    /// Show all matches (no limit).
    pub all: bool,
}

/// A record read from the records file.
///
/// Keeps the source object so output can show undeclared keys too.
#[derive(Debug, Clone)]
pub struct JsonRecord {
    source: Map<String, Json>,
    record: MapRecord,
}

impl JsonRecord {
    /// Converts one JSON object according to the schema.
    pub fn from_object(
        source: Map<String, Json>,
        schema: &Schema,
        dates: &FlexibleDateParser,
    ) -> Result<Self> {
        let record = MapRecord::from_json(&source, schema, dates).map_err(FilterError::from)?;
        Ok(Self { source, record })
    }

    /// The raw JSON object.
    pub fn source(&self) -> &Map<String, Json> {
        &self.source
    }

    /// A field of the source object rendered for display.
    pub fn display_field(&self, name: &str) -> String {
        match self.source.get(name) {
            Some(Json::String(s)) => s.clone(),
            Some(Json::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

impl Record for JsonRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.record.field(name)
    }
}

/// The outcome of an eval run.
#[derive(Debug)]
pub struct EvalResult<'a> {
    /// Matching records, limited.
    pub matched: Vec<&'a JsonRecord>,
    /// Number of matching records before the limit.
    pub matched_total: usize,
    /// Number of records evaluated.
    pub total: usize,
}

/// Executes the eval command.
///
/// # Errors
///
/// Returns an error if the filter is invalid, an input file cannot be read or
/// is malformed, or a record cannot be evaluated.
pub fn execute(ctx: &CommandContext, opts: &EvalOptions) -> Result<()> {
    let config = load_config(ctx.config_path.as_deref())?;

    let mut dates = date_parser(&config);
    if let Some(now) = &opts.now {
        let reference = chrono::DateTime::parse_from_rfc3339(now)
            .map_err(|e| CommandError::Input(format!("invalid --now '{now}': {e}")))?;
        dates = dates.with_reference(reference.with_timezone(&chrono::Utc));
    }

    let memberships = match &opts.tags {
        Some(path) => read_tags(path)?,
        None => BTreeMap::new(),
    };
    let store = build_tag_store(&config.tags.names, &memberships)?;

    let factory = ExprFactory::from_store(config.schema.clone(), &store)?
        .with_date_parser(Arc::new(dates.clone()));
    let plan = factory.compile(&opts.expr)?;
    debug!("compiled filter: {}", plan.root());

    let records = read_records(&opts.records, &config.schema, &dates)?;
    info!("evaluating {} records", records.len());

    let tags: Option<&dyn TagStore> = Some(&store);
    let matched = plan.filter_records(&records, tags)?;
    let matched_total = matched.len();

    let limit = if opts.all { usize::MAX } else { opts.limit };
    let result = EvalResult {
        matched: matched.into_iter().take(limit).collect(),
        matched_total,
        total: records.len(),
    };

    let title_field = config.output.title_field.as_deref().unwrap_or("title");
    if ctx.json_output {
        let output = format_records_json(&result, config.schema.handle())?;
        println!("{output}");
    } else if !ctx.quiet {
        let output = format_records_table(
            &result,
            config.schema.handle(),
            title_field,
            ctx.use_colors_for(&config),
        );
        print!("{output}");
    }

    Ok(())
}

/// Tag name -> handle -> values.
type Memberships = BTreeMap<String, BTreeMap<i64, Vec<String>>>;

/// Reads a tags file of the form `{"Genre": {"7": ["Drama", "War"]}}`.
fn read_tags(path: &Path) -> Result<Memberships> {
    let content = fs::read_to_string(path)?;
    parse_tags(&content)
}

fn parse_tags(content: &str) -> Result<Memberships> {
    let raw: BTreeMap<String, BTreeMap<String, Vec<String>>> = serde_json::from_str(content)
        .map_err(|e| CommandError::Input(format!("tags file: {e}")))?;

    let mut memberships = Memberships::new();
    for (tag, by_handle) in raw {
        let entry = memberships.entry(tag.clone()).or_default();
        for (handle, values) in by_handle {
            let handle: i64 = handle.trim().parse().map_err(|_| {
                CommandError::Input(format!("tags file: handle '{handle}' under '{tag}' is not an integer"))
            })?;
            entry.insert(handle, values);
        }
    }
    Ok(memberships)
}

/// Builds a tag store knowing the configured tag names plus any named in the
/// tags file, loaded with the file's memberships.
fn build_tag_store(configured: &[String], memberships: &Memberships) -> Result<MemoryTagStore> {
    let mut names: Vec<String> = Vec::new();
    for name in configured.iter().chain(memberships.keys()) {
        if !names.iter().any(|n| n.to_lowercase() == name.to_lowercase()) {
            names.push(name.clone());
        }
    }

    let store = MemoryTagStore::new(names);
    for (tag, by_handle) in memberships {
        for (handle, values) in by_handle {
            store
                .assign_all(*handle, tag, values.iter().cloned())
                .map_err(FilterError::from)?;
        }
    }
    Ok(store)
}

/// Reads a records file holding a JSON array of objects.
fn read_records(path: &Path, schema: &Schema, dates: &FlexibleDateParser) -> Result<Vec<JsonRecord>> {
    let content = fs::read_to_string(path)?;
    parse_records(&content, schema, dates)
}

fn parse_records(content: &str, schema: &Schema, dates: &FlexibleDateParser) -> Result<Vec<JsonRecord>> {
    let json: Json = serde_json::from_str(content)
        .map_err(|e| CommandError::Input(format!("records file: {e}")))?;
    let Json::Array(items) = json else {
        return Err(CommandError::Input(
            "records file must hold a JSON array of objects".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Json::Object(object) => JsonRecord::from_object(object, schema, dates),
            _ => Err(CommandError::Input(format!(
                "records file: element {i} is not an object"
            ))),
        })
        .collect()
}
