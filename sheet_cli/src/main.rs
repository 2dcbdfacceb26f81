//! sheet-cli - Compute a character sheet from a JSON build file
//!
//! ```text
//! sheet-cli <character.json> [--compendium <dir>]... [--constants <file.toml>] [--json]
//! ```

mod summary;

use clap::Parser;
use sheet_core::compendium::{resolve_compendiums, Compendium};
use sheet_core::config::ConfigError;
use sheet_core::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Calculation(#[from] sheet_core::CalculationError),
}

/// Compute a character sheet from a JSON build file
#[derive(Parser, Debug)]
#[command(name = "sheet-cli")]
#[command(about = "Compute a character sheet from a JSON build file", long_about = None)]
#[command(version)]
struct Args {
    /// Character base data (JSON)
    character: PathBuf,

    /// Directory holding `<id>.json` compendium files; may be repeated
    #[arg(long = "compendium", value_name = "DIR")]
    compendium_dirs: Vec<PathBuf>,

    /// Engine constants (TOML) replacing the built-in rules
    #[arg(long, value_name = "FILE")]
    constants: Option<PathBuf>,

    /// Print the full sheet as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Find `<id>.json` in the first directory that has it
fn load_compendium(dirs: &[PathBuf], id: &str) -> Option<Compendium> {
    let path = dirs
        .iter()
        .map(|dir| dir.join(format!("{}.json", id)))
        .find(|path| path.is_file())?;
    match read_json(&path) {
        Ok(compendium) => Some(compendium),
        Err(error) => {
            tracing::warn!(compendium = id, %error, "skipping unreadable compendium");
            None
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let base: CharacterBaseData = read_json(&args.character)?;

    let mut options = CalculationOptions::default();
    if let Some(path) = &args.constants {
        options = options.with_constants(EngineConstants::load(path)?);
    }

    let context = if args.compendium_dirs.is_empty() {
        None
    } else {
        let compendium = resolve_compendiums(&base.active_compendiums, |id| {
            load_compendium(&args.compendium_dirs, id)
        });
        Some(CalculationContext::new(compendium))
    };

    let sheet = calculate_character_sheet(&base, context.as_ref(), &options)?;
    if args.json {
        let json = serde_json::to_string_pretty(&sheet).map_err(|source| CliError::Json {
            path: args.character.clone(),
            source,
        })?;
        println!("{}", json);
    } else {
        print!("{}", summary::render(&sheet));
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}
