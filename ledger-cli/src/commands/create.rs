//! Create command - record a transfer

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use super::get_context;
use crate::output;
use ledger_core::{ClientId, CreateMovement};

pub struct CreateArgs {
    pub sender: ClientId,
    pub recipient: Option<ClientId>,
    pub origin: String,
    pub destination: String,
    pub movement_type: String,
    pub amount: Decimal,
}

pub async fn run(args: CreateArgs, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.movement_service;

    let request = CreateMovement {
        sender_client_id: args.sender,
        recipient_client_id: args.recipient,
        origin_account: args.origin,
        destination_account: args.destination,
        movement_type: args.movement_type,
        amount: args.amount,
    };

    let result = match service.create_movement(request).await {
        Ok(id) => service.get_movement(id).await,
        Err(e) => Err(e),
    };

    if json {
        return output::emit_json(result);
    }

    let movement = result?;
    println!("\n{} Movement recorded\n", "✓".green());
    output::print_movement(&movement);
    println!();
    Ok(())
}
