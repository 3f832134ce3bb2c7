//! Config command implementation.
//!
//! View and initialize configuration settings.
//! Config file is located at ~/.config/vl/config.toml.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use vidlib_filter::{DomainType, Schema};

use super::{CommandContext, CommandError, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Default config file contents.
const DEFAULT_CONFIG: &str = r#"# vl - video library filter configuration

# Config schema version (do not modify)
version = 1

# Record schema. The handle field must be an integer; tag lookups key off it.
# Types: string, integer, double, boolean, timestamp, tag
[schema]
handle = "handle"

[schema.fields]
handle = "integer"
title = "string"
year = "integer"
rating = "double"
watched = "boolean"
added = "timestamp"

# Known tag names (matched case-insensitively in filters)
[tags]
names = ["Genre"]

# Extra chrono formats for date literals, tried after the built-in ones
[dates]
# formats = ["%d.%m.%Y"]

# Output preferences
[output]
# color = true              # Enable colors
# title_field = "title"     # Field shown next to the handle in eval results
"#;

/// Configuration file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Record schema.
    #[serde(default = "default_schema")]
    pub schema: Schema,

    /// Tag settings.
    #[serde(default)]
    pub tags: TagsConfig,

    /// Date parsing settings.
    #[serde(default)]
    pub dates: DatesConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

/// The schema used when no config file declares one.
fn default_schema() -> Schema {
    Schema::new(vidlib_filter::DEFAULT_HANDLE)
        .with_field("handle", DomainType::Integer)
        .with_field("title", DomainType::String)
        .with_field("year", DomainType::Integer)
        .with_field("rating", DomainType::Double)
        .with_field("watched", DomainType::Boolean)
        .with_field("added", DomainType::TimeStamp)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            schema: default_schema(),
            tags: TagsConfig::default(),
            dates: DatesConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Tag configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TagsConfig {
    /// Known tag names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

/// Date parsing configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatesConfig {
    /// Extra chrono formats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<String>,
}

/// Output configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Enable colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// Field shown next to the handle in eval results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_field: Option<String>,
}

/// Gets the config file path.
///
/// Resolution order: explicit path (`--config` / `VL_CONFIG`), then
/// `$XDG_CONFIG_HOME/vl/config.toml`, then `~/.config/vl/config.toml`.
pub fn get_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = env::var("VL_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("vl").join("config.toml"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("vl").join("config.toml"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Loads the configuration from disk. A missing file yields the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = get_config_path(explicit)?;

    if !path.exists() {
        debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {e}")))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {e}")))?;

    debug!("loaded config from {}", path.display());
    migrate_config(config)
}

/// Brings an older config up to the current version.
fn migrate_config(mut config: Config) -> Result<Config> {
    if config.version > CONFIG_VERSION {
        return Err(CommandError::Config(format!(
            "config version {} is newer than this vl supports ({})",
            config.version, CONFIG_VERSION
        )));
    }
    config.version = CONFIG_VERSION;
    Ok(config)
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let config = load_config(ctx.config_path.as_deref())?;
    let path = get_config_path(ctx.config_path.as_deref())?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        use owo_colors::OwoColorize;

        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{header}\n");
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());

        println!("[schema]");
        println!("  handle: {}", config.schema.handle());
        for (name, domain) in config.schema.fields() {
            println!("  {name}: {domain}");
        }

        println!("\n[tags]");
        if !config.tags.names.is_empty() {
            println!("  names: {}", config.tags.names.join(", "));
        }

        println!("\n[dates]");
        if !config.dates.formats.is_empty() {
            println!("  formats: {}", config.dates.formats.join(", "));
        }

        println!("\n[output]");
        if let Some(color) = config.output.color {
            println!("  color: {color}");
        }
        if let Some(ref field) = config.output.title_field {
            println!("  title_field: {field}");
        }

        if !path.exists() {
            println!("\n(No config file exists. Run 'vl config init' to create one.)");
        }
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path(ctx.config_path.as_deref())?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Executes the config init command.
pub fn execute_init(ctx: &CommandContext, force: bool) -> Result<()> {
    let path = get_config_path(ctx.config_path.as_deref())?;

    if path.exists() && !force {
        return Err(CommandError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CommandError::Config(format!("Failed to create config directory: {e}")))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .map_err(|e| CommandError::Config(format!("Failed to write config: {e}")))?;

    if ctx.json_output {
        let output = serde_json::json!({
            "status": "success",
            "path": path.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("Wrote default config to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn ctx_for(path: &Path) -> CommandContext {
        CommandContext {
            json_output: false,
            use_colors: false,
            quiet: true,
            config_path: Some(path.to_path_buf()),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.schema.validate().is_ok());
        assert!(config.tags.names.is_empty());
        assert!(config.output.color.is_none());
    }

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.schema.handle(), "handle");
        assert_eq!(config.schema.field_type("added"), Some(DomainType::TimeStamp));
        assert_eq!(config.tags.names, vec!["Genre".to_string()]);
        assert!(config.dates.formats.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
version = 1

[schema]
handle = "id"

[schema.fields]
id = "integer"
name = "string"
released = "datetime"

[tags]
names = ["Mood", "Genre"]

[dates]
formats = ["%d.%m.%Y"]

[output]
color = false
title_field = "name"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.schema.handle(), "id");
        assert_eq!(config.schema.field_type("released"), Some(DomainType::TimeStamp));
        assert_eq!(config.tags.names.len(), 2);
        assert_eq!(config.dates.formats, vec!["%d.%m.%Y".to_string()]);
        assert_eq!(config.output.color, Some(false));
        assert_eq!(config.output.title_field.as_deref(), Some("name"));
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.schema, default_schema());
    }

    #[test]
    fn test_config_rejects_unknown_type() {
        let toml_str = r#"
[schema.fields]
handle = "integer"
poster = "image"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config {
            tags: TagsConfig {
                names: vec!["Genre".to_string()],
            },
            ..Config::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("version = 1"));
        assert!(toml_str.contains("[schema"));
        assert!(toml_str.contains("timestamp"));

        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.schema, config.schema);
        assert_eq!(back.tags.names, config.tags.names);
    }

    #[test]
    fn test_migrate_rejects_future_version() {
        let config = Config {
            version: 999,
            ..Config::default()
        };
        assert!(matches!(migrate_config(config), Err(CommandError::Config(_))));

        let config = Config {
            version: 0,
            ..Config::default()
        };
        assert_eq!(migrate_config(config).unwrap().version, CONFIG_VERSION);
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = get_config_path(Some(Path::new("/tmp/explicit.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/explicit.toml"));
    }

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        let original = env::var("VL_CONFIG").ok();
        env::set_var("VL_CONFIG", "/tmp/vl-test/config.toml");

        let path = get_config_path(None);

        match original {
            Some(val) => env::set_var("VL_CONFIG", val),
            None => env::remove_var("VL_CONFIG"),
        }

        assert_eq!(path.unwrap(), PathBuf::from("/tmp/vl-test/config.toml"));
    }

    #[test]
    #[serial]
    fn test_config_path_from_xdg() {
        let original_config = env::var("VL_CONFIG").ok();
        let original_xdg = env::var("XDG_CONFIG_HOME").ok();
        env::remove_var("VL_CONFIG");
        env::set_var("XDG_CONFIG_HOME", "/tmp/xdg");

        let path = get_config_path(None);

        if let Some(val) = original_config {
            env::set_var("VL_CONFIG", val);
        }
        match original_xdg {
            Some(val) => env::set_var("XDG_CONFIG_HOME", val),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(path.unwrap(), PathBuf::from("/tmp/xdg/vl/config.toml"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(Some(&temp_dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.schema, default_schema());
    }

    #[test]
    fn test_init_writes_template_and_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let ctx = ctx_for(&path);

        execute_init(&ctx, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        assert!(matches!(execute_init(&ctx, false), Err(CommandError::Config(_))));

        fs::write(&path, "version = 1\n").unwrap();
        execute_init(&ctx, true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.tags.names, vec!["Genre".to_string()]);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[schema\nhandle = ").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(CommandError::Config(_))));
    }
}
