//! Quartermaster CLI - typed, categorized configuration settings.

use clap::Parser;
use quartermaster::cli::{Cli, Commands, ConfigCommands};
use quartermaster::commands::{self, Output};
use quartermaster::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use quartermaster::logging;
use quartermaster::storage::{
    DecodeMode, SettingFilter, SettingsStore, StorageBackend, open_backend,
};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use std::process;

fn main() {
    logging::init();

    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        config_path: cli.config.clone(),
        output_format: cli.human_readable.then_some(OutputFormat::Human),
        store: cli.store.clone(),
        strict: cli.strict.then_some(true),
    };

    let resolved = match resolve_config(&overrides) {
        Ok(resolved) => resolved,
        Err(e) => {
            report_error(&e, cli.human_readable);
            process::exit(1);
        }
    };
    let human = *resolved.output_format() == OutputFormat::Human;

    match run_command(cli.command, &resolved, human) {
        Ok(code) => process::exit(code),
        Err(e) => {
            report_error(&e, human);
            process::exit(1);
        }
    }
}

fn report_error(error: &quartermaster::Error, human: bool) {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!("{}", serde_json::json!({ "error": error.to_string() }));
    }
}

/// Open the settings store named by the resolved preferences.
fn open_store(
    resolved: &ResolvedConfig,
) -> Result<SettingsStore<Box<dyn StorageBackend>>, quartermaster::Error> {
    let mode = if resolved.strict() {
        DecodeMode::Strict
    } else {
        DecodeMode::Lenient
    };
    let store = SettingsStore::new(open_backend(resolved.store())?)
        .with_mode(mode)
        .with_default_type(resolved.default_type());
    tracing::debug!(location = %store.location(), ?mode, "opened settings store");
    Ok(store)
}

/// Ask on stderr, read the answer from stdin. End of input declines.
fn confirm_on_terminal(prompt: &str) -> Result<bool, quartermaster::Error> {
    eprint!("{}", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(commands::is_affirmative(&answer))
}

/// Run a command, returning the process exit code on success.
fn run_command(
    command: Commands,
    resolved: &ResolvedConfig,
    human: bool,
) -> Result<i32, quartermaster::Error> {
    match command {
        Commands::Get { key, default } => {
            let store = open_store(resolved)?;
            let result = commands::setting_get(&store, &key, default.as_deref())?;
            output(&result, human);
        }
        Commands::Set {
            key,
            value,
            category,
            setting_type,
        } => {
            let mut store = open_store(resolved)?;
            let result = commands::setting_set(
                &mut store,
                &key,
                &value,
                category.as_deref(),
                setting_type,
            )?;
            output(&result, human);
        }
        Commands::Add {
            key,
            value,
            category,
            setting_type,
        } => {
            let mut store = open_store(resolved)?;
            let result = commands::setting_add(
                &mut store,
                &key,
                &value,
                category.as_deref(),
                setting_type,
            )?;
            output(&result, human);
        }
        Commands::Change { key, value } => {
            let mut store = open_store(resolved)?;
            let result = commands::setting_change(&mut store, &key, &value)?;
            output(&result, human);
        }
        Commands::Has { key } => {
            let store = open_store(resolved)?;
            let result = commands::setting_has(&store, &key)?;
            output(&result, human);
            if !result.exists {
                return Ok(1);
            }
        }
        Commands::List {
            category,
            uncategorized,
        } => {
            let store = open_store(resolved)?;
            let filter = match (category, uncategorized) {
                (Some(name), _) => SettingFilter::Category(name),
                (None, true) => SettingFilter::Uncategorized,
                (None, false) => SettingFilter::All,
            };
            let result = commands::setting_list(&store, &filter)?;
            output(&result, human);
        }
        Commands::Categories => {
            let store = open_store(resolved)?;
            let result = commands::category_list(&store)?;
            output(&result, human);
        }
        Commands::Forget { key, force } => {
            let mut store = open_store(resolved)?;
            let result =
                commands::setting_forget(&mut store, &key, force, &mut confirm_on_terminal)?;
            output(&result, human);
        }
        Commands::Export { output: path } => {
            let store = open_store(resolved)?;
            let document = commands::store_export(&store)?;
            match path {
                Some(path) if path != Path::new("-") => {
                    let result = commands::write_export(&document, &path)?;
                    output(&result, human);
                }
                _ => println!("{}", document.to_json()),
            }
        }
        Commands::Import { input, overwrite } => {
            let content = if input == "-" {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                fs::read_to_string(&input)?
            };
            let mut store = open_store(resolved)?;
            let result = commands::store_import(&mut store, &content, overwrite)?;
            output(&result, human);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(resolved);
                output(&result, human);
            }
            ConfigCommands::Init { force } => {
                let path = resolved.config_path.clone().ok_or_else(|| {
                    quartermaster::Error::Config(
                        "Could not determine config directory; pass --config".to_string(),
                    )
                })?;
                let result = commands::config_init(&path, resolved, force)?;
                output(&result, human);
            }
        },
    }
    Ok(0)
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
