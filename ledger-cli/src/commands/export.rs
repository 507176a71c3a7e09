//! Export command - write movements to a JSON file

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::get_context;
use crate::output;
use ledger_core::ClientId;

pub async fn run(file: &Path, client: Option<ClientId>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.movement_service;

    let movements = match client {
        Some(id) => service.all_movements_for_client(id).await,
        None => service.all_movements().await,
    };
    let result = match movements {
        Ok(movements) => service
            .export_movements(file, &movements)
            .await
            .map(|()| movements.len()),
        Err(e) => Err(e),
    };

    if json {
        return output::emit_json(
            result.map(|count| json!({ "path": file.display().to_string(), "exported": count })),
        );
    }

    let count = result?;
    println!(
        "{} Exported {} movement(s) to {}",
        "✓".green(),
        count,
        file.display()
    );
    Ok(())
}
