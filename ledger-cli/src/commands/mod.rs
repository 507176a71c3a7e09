//! CLI command implementations

pub mod client;
pub mod create;
pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod logs;
pub mod reverse;
pub mod show;
pub mod statement;

use std::path::PathBuf;

use anyhow::{Context, Result};
use ledger_core::{EntryPoint, LedgerContext, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let ledger_dir = get_ledger_dir().ok()?;
    std::fs::create_dir_all(&ledger_dir).ok()?;
    LoggingService::new(&ledger_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the ledger directory from `LEDGER_DIR` or default to `~/.ledger`
pub fn get_ledger_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".ledger"))
}

/// Open the ledger context
pub fn get_context() -> Result<LedgerContext> {
    let ledger_dir = get_ledger_dir()?;

    std::fs::create_dir_all(&ledger_dir)
        .with_context(|| format!("Failed to create ledger directory: {:?}", ledger_dir))?;

    LedgerContext::new(&ledger_dir).context("Failed to initialize ledger context")
}
