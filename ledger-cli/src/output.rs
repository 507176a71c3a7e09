//! Output formatting utilities

use std::collections::HashMap;

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use rust_decimal::Decimal;
use serde::Serialize;

use ledger_core::domain::result::Result as CoreResult;
use ledger_core::{Movement, OperationResult};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// First block of a movement id, enough to tell rows apart
pub fn short_id(movement: &Movement) -> String {
    movement.id.simple().to_string()[..8].to_string()
}

fn status_cell(movement: &Movement) -> Cell {
    if movement.is_reversible {
        Cell::new("reversible").fg(Color::Green)
    } else {
        Cell::new("final").fg(Color::DarkGrey)
    }
}

/// Table of movements, oldest first
pub fn movement_table(movements: &[Movement]) -> Table {
    let mut sorted: Vec<&Movement> = movements.iter().collect();
    sorted.sort_by_key(|m| (m.date, m.id));

    let mut table = create_table();
    table.set_header(vec![
        "ID", "Date", "Type", "Sender", "Recipient", "Amount", "Balance", "Status",
    ]);
    for m in sorted {
        table.add_row(vec![
            Cell::new(short_id(m)),
            Cell::new(m.date.format("%Y-%m-%d %H:%M")),
            Cell::new(&m.movement_type),
            Cell::new(m.sender_client_id),
            Cell::new(
                m.recipient_client_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "external".to_string()),
            ),
            Cell::new(format_amount(m.amount)),
            Cell::new(format_amount(m.balance_snapshot)),
            status_cell(m),
        ]);
    }
    table
}

/// Detailed view of one movement
pub fn print_movement(m: &Movement) {
    println!("{}", format!("Movement {}", m.id).bold());
    println!("  Date:        {}", m.date.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Type:        {}", m.movement_type);
    println!("  From:        {} (client {})", m.origin_account, m.sender_client_id);
    match m.recipient_client_id {
        Some(id) => println!("  To:          {} (client {})", m.destination_account, id),
        None => println!("  To:          {} (external)", m.destination_account),
    }
    println!("  Amount:      {}", format_amount(m.amount));
    println!("  Balance:     {}", format_amount(m.balance_snapshot));
    if m.is_reversible {
        println!(
            "  Status:      {} until {}",
            "reversible".green(),
            m.reversal_deadline.format("%Y-%m-%d %H:%M")
        );
    } else {
        println!("  Status:      {}", "final".dimmed());
    }
}

/// Print a core result as an `OperationResult` JSON document
///
/// Failures are printed too, then handed back so the command still exits
/// with an error.
pub fn emit_json<T: Serialize>(result: CoreResult<T>) -> Result<()> {
    match result {
        Ok(data) => {
            println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
            Ok(())
        }
        Err(e) => {
            let mut context = HashMap::new();
            context.insert("kind".to_string(), serde_json::Value::from(e.kind()));
            let failure = OperationResult::<T>::fail_with_context(e.to_string(), context);
            println!("{}", serde_json::to_string_pretty(&failure)?);
            Err(e.into())
        }
    }
}
