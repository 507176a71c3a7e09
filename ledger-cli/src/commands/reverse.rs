//! Reverse command - undo a movement within its reversal window

use anyhow::Result;
use serde_json::json;

use super::get_context;
use crate::output;
use ledger_core::MovementId;

pub async fn run(id: MovementId, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.movement_service.reverse_movement(id).await;

    if json {
        return output::emit_json(result.map(|()| json!({ "id": id, "reversed": true })));
    }

    result?;
    output::success(&format!("Movement {} reversed", id));
    Ok(())
}
