//! Delete command - remove a movement from the ledger

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use super::get_context;
use crate::output;
use ledger_core::MovementId;

pub async fn run(id: MovementId, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.movement_service;

    if !force && !json {
        let movement = service.get_movement(id).await?;
        println!();
        output::print_movement(&movement);
        println!();
        output::warning("Deleting a movement cannot be undone.");

        if !Confirm::new()
            .with_prompt("Delete this movement?")
            .default(false)
            .interact()?
        {
            println!("{}", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let result = service.delete_movement(id).await;

    if json {
        return output::emit_json(result.map(|()| json!({ "id": id, "deleted": true })));
    }

    result?;
    println!("{} Movement {} deleted", "✓".green(), id);
    Ok(())
}
