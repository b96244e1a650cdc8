mod cli;
mod commands;
mod provider;

use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use assist::NoteAssistant;
use clap::Parser;
use config::{AppConfig, ConfigStore, StorageBackend, StorageConfig};
use note_storage::{FallbackStorage, KeyValueStorage, MemoryStorage, SqliteStorage};
use note_store::{NoteSession, NoteStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::provider::CommandProvider;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_store = match &cli.config_dir {
        Some(dir) => Ok(ConfigStore::from_dir(dir)),
        None => ConfigStore::from_default_location(),
    };
    let config = match config_store.and_then(|store| store.load_or_init()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            AppConfig::default()
        }
    };

    let _log_guard = match config.logging.log_directory() {
        Ok(dir) => Some(init_local_logger(&dir, &config.logging.filter)),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    };

    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let storage = open_storage(&config.storage)?;
    let store = NoteStore::open(storage);
    let mut session = NoteSession::new(store).with_min_password_len(config.lock.min_password_len);
    let assistant = CommandProvider::from_config(&config.assist).map(NoteAssistant::new);
    commands::run(
        &mut session,
        cli.command,
        assistant.as_ref(),
        &mut io::stdout().lock(),
    )
}

/// Opens the configured medium. The quota only applies to the memory backend.
fn open_storage(config: &StorageConfig) -> Result<Box<dyn KeyValueStorage>> {
    let primary: Box<dyn KeyValueStorage> = match config.backend {
        StorageBackend::Memory => Box::new(match config.quota_bytes {
            Some(quota) => MemoryStorage::with_quota(quota),
            None => MemoryStorage::new(),
        }),
        StorageBackend::Sqlite => {
            let path = config.database_path()?;
            let storage = SqliteStorage::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            info!(path = %path.display(), "sqlite storage ready");
            Box::new(storage)
        }
    };

    if config.fallback_to_memory {
        Ok(Box::new(FallbackStorage::new(primary)))
    } else {
        Ok(primary)
    }
}

fn init_local_logger(
    log_dir: &Path,
    default_filter: &str,
) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "notes.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
