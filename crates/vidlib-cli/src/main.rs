use clap::Parser;
use log::LevelFilter;
use std::process::ExitCode;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, ConfigCommands};
use commands::check::CheckOptions;
use commands::eval::EvalOptions;
use commands::{CommandContext, CommandError};
use vidlib_filter::FilterError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let error_json = serde_json::json!({
                    "error": {
                        "code": error_code(&e),
                        "message": e.to_string(),
                        "column": error_column(&e),
                    }
                });
                match serde_json::to_string_pretty(&error_json) {
                    Ok(text) => eprintln!("{text}"),
                    Err(_) => eprintln!("Error: {e}"),
                }
            } else if let CommandError::Filter(FilterError::Grammar(diag)) = &e {
                eprintln!("Error: {}", diag.message);
                let use_colors = !cli.no_color;
                eprintln!("{}", output::format_diagnostic(diag, use_colors));
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Sets up logging: `-v` shows debug output, `-q` only errors. `RUST_LOG`
/// overrides both.
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> commands::Result<()> {
    let ctx = CommandContext::from_cli(cli);

    match &cli.command {
        Some(Commands::Check { expr, tree }) => {
            let opts = CheckOptions {
                expr: expr.clone(),
                tree: *tree,
            };
            commands::check::execute(&ctx, &opts)
        }
        Some(Commands::Eval {
            expr,
            records,
            tags,
            now,
            limit,
            all,
        }) => {
            let opts = EvalOptions {
                expr: expr.clone(),
                records: records.clone(),
                tags: tags.clone(),
                now: now.clone(),
                limit: *limit,
                all: *all,
            };
            commands::eval::execute(&ctx, &opts)
        }
        Some(Commands::Config { command }) => match command {
            Some(ConfigCommands::Show) | None => commands::config::execute_show(&ctx),
            Some(ConfigCommands::Path) => commands::config::execute_path(&ctx),
            Some(ConfigCommands::Init { force }) => commands::config::execute_init(&ctx, *force),
        },
        Some(Commands::Completions { shell }) => {
            commands::completions::execute(*shell).map_err(CommandError::Io)
        }
        None => {
            if !ctx.quiet {
                println!("vl - video library filter expressions");
                println!("Use --help for usage information");
            }
            Ok(())
        }
    }
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Filter(FilterError::Grammar(_)) => "PARSE_ERROR",
        CommandError::Filter(FilterError::Schema(_)) => "SCHEMA_ERROR",
        CommandError::Filter(FilterError::Type(_)) => "TYPE_ERROR",
        CommandError::Filter(FilterError::LiteralParse(_)) => "LITERAL_ERROR",
        CommandError::Filter(FilterError::Runtime(_)) => "RUNTIME_ERROR",
        CommandError::Filter(FilterError::Collaborator(_)) => "COLLABORATOR_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Input(_) => "INPUT_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// The diagnostic column of a parse error, for JSON output.
fn error_column(e: &CommandError) -> Option<usize> {
    match e {
        CommandError::Filter(FilterError::Grammar(diag)) => Some(diag.column),
        _ => None,
    }
}

/// Returns the process exit status for an error.
fn exit_status(e: &CommandError) -> u8 {
    match e {
        CommandError::Filter(FilterError::Runtime(_) | FilterError::Collaborator(_)) => 4,
        CommandError::Filter(_) => 1,
        CommandError::Config(_) => 5,
        CommandError::Io(_) => 3,
        CommandError::Input(_) | CommandError::Json(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidlib_filter::{CollaboratorError, ParseDiagnostic, SchemaError};

    #[test]
    fn test_error_codes() {
        let parse = CommandError::Filter(FilterError::Grammar(ParseDiagnostic::grammar(
            "age >",
            5,
            "unexpected end of expression",
        )));
        assert_eq!(error_code(&parse), "PARSE_ERROR");
        assert_eq!(error_column(&parse), Some(5));

        let schema = CommandError::Filter(FilterError::Schema(SchemaError::UnknownAttribute {
            name: "ratng".to_string(),
            suggestion: None,
        }));
        assert_eq!(error_code(&schema), "SCHEMA_ERROR");
        assert_eq!(error_column(&schema), None);

        assert_eq!(
            error_code(&CommandError::Config("bad".to_string())),
            "CONFIG_ERROR"
        );
        assert_eq!(
            error_code(&CommandError::Input("bad".to_string())),
            "INPUT_ERROR"
        );
    }

    #[test]
    fn test_exit_codes() {
        let missing = CommandError::Filter(FilterError::Collaborator(
            CollaboratorError::MissingField {
                field: "rating".to_string(),
            },
        ));
        assert_eq!(exit_status(&missing), 4);
        assert_eq!(exit_status(&CommandError::Config("bad".to_string())), 5);
        assert_eq!(
            exit_status(&CommandError::Io(std::io::Error::other("disk"))),
            3
        );
        assert_eq!(exit_status(&CommandError::Input("bad".to_string())), 1);
    }
}
