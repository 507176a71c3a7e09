//! List command - query views over the ledger

use anyhow::{bail, Result};
use clap::ValueEnum;

use super::get_context;
use crate::output;
use ledger_core::ClientId;

/// Which of a client's views to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// Everything the client sent or received
    All,
    /// The client's own movements
    My,
    Sent,
    Received,
    /// Movements of the client in either role
    Client,
}

pub async fn run(
    client: Option<ClientId>,
    view: View,
    movement_type: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.movement_service;

    let result = match (client, movement_type) {
        (Some(id), _) => match view {
            View::All => service.all_movements_for_client(id).await,
            View::My => service.my_movements(id).await,
            View::Sent => service.sent_by_client(id).await,
            View::Received => service.received_by_client(id).await,
            View::Client => service.movements_by_client_id(id).await,
        },
        (None, Some(t)) => service.movements_by_type(&t).await,
        (None, None) => bail!("Either --client or --type is required"),
    };

    if json {
        return output::emit_json(result);
    }

    let movements = result?;
    if movements.is_empty() {
        output::info("No movements found.");
        return Ok(());
    }

    println!("{}", output::movement_table(&movements));
    println!("{} movement(s)", movements.len());
    Ok(())
}
