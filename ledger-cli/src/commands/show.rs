//! Show command - display one movement

use anyhow::Result;

use super::get_context;
use crate::output;
use ledger_core::MovementId;

pub async fn run(id: MovementId, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.movement_service.get_movement(id).await;

    if json {
        return output::emit_json(result);
    }

    output::print_movement(&result?);
    Ok(())
}
