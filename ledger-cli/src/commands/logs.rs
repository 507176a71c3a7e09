//! Logs command - inspect the command journal
//!
//! The journal records which commands ran, the movement they touched and, for
//! failures, the error kind. It never holds amounts, accounts or names.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_ledger_dir;
use crate::output;
use ledger_core::services::logging::now_ms;
use ledger_core::{EntryPoint, LogEntry, LoggingService, MovementId};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent journal entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only failed commands
        #[arg(long)]
        errors: bool,
        /// Only entries about this movement, oldest first
        #[arg(long, conflicts_with = "errors")]
        movement: Option<MovementId>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count failed commands per error kind
    Failures {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete entries older than N days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Journal size and location
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_journal() -> Result<LoggingService> {
    LoggingService::new(&get_ledger_dir()?, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn when(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// Movement ids are long; the first block is enough in a table
fn short_movement(entry: &LogEntry) -> String {
    entry
        .movement_id
        .as_deref()
        .map(|id| id.split('-').next().unwrap_or(id).to_string())
        .unwrap_or_default()
}

fn journal_table(entries: &[LogEntry]) -> comfy_table::Table {
    let mut table = output::create_table();
    table.set_header(vec!["Time", "Command", "Movement", "Outcome"]);
    for entry in entries {
        let outcome = match entry.error_message.as_deref() {
            Some(kind) => kind.red().to_string(),
            None => "ok".green().to_string(),
        };
        table.add_row(vec![
            when(entry.timestamp),
            entry.command.clone().unwrap_or_else(|| entry.event.clone()),
            short_movement(entry),
            outcome,
        ]);
    }
    table
}

pub fn run(command: LogsCommands) -> Result<()> {
    let journal = open_journal()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            movement,
            json,
        } => {
            let entries = match movement {
                Some(id) => journal.movement_history(id, limit)?,
                None if errors => journal.get_errors(limit)?,
                None => journal.get_recent(limit)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                output::info("Journal is empty for this selection.");
            } else {
                println!("{}", journal_table(&entries));
            }
        }
        LogsCommands::Failures { json } => {
            let failures = journal.failures_by_kind()?;

            if json {
                let counts: serde_json::Map<String, serde_json::Value> = failures
                    .into_iter()
                    .map(|(kind, n)| (kind, serde_json::Value::from(n)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else if failures.is_empty() {
                output::success("No failed commands recorded.");
            } else {
                let mut table = output::create_table();
                table.set_header(vec!["Error kind", "Failures"]);
                for (kind, n) in failures {
                    table.add_row(vec![kind, n.to_string()]);
                }
                println!("{}", table);
            }
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let prompt = format!("Delete journal entries older than {} days?", older_than_days);
            if !force && !json && !Confirm::new().with_prompt(prompt).default(false).interact()? {
                output::info("Cancelled.");
                return Ok(());
            }

            let deleted = journal.delete_before(now_ms() - i64::from(older_than_days) * DAY_MS)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                output::success(&format!("Deleted {} journal entries", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let total = journal.count()?;
            let failed: u64 = journal.failures_by_kind()?.iter().map(|(_, n)| n).sum();
            let path = journal.db_path();
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "entries": total,
                        "failed": failed,
                        "path": path.to_string_lossy(),
                        "sizeBytes": size,
                    })
                );
            } else {
                println!("{}", "Journal".bold());
                println!("  Entries:  {} ({} failed)", total, failed);
                println!("  File:     {} ({})", path.display(), output::format_size(size));
            }
        }
    }

    Ok(())
}
