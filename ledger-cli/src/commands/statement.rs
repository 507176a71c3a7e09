//! Statement command - render movement documents

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use colored::Colorize;

use super::get_context;
use crate::output;
use ledger_core::{ClientId, MovementId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    All,
    Sent,
    Received,
}

#[derive(Subcommand)]
pub enum StatementCommands {
    /// Receipt for a single movement
    Movement {
        /// Movement id
        id: MovementId,
        /// Only render if this client sent or received the movement
        #[arg(long)]
        client: Option<ClientId>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Statement of a client's movements
    Client {
        /// Client id
        id: ClientId,
        #[arg(long, value_enum, default_value_t = Direction::All)]
        direction: Direction,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Statement of every movement in the ledger
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: StatementCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.movement_service;

    let (result, json) = match command {
        StatementCommands::Movement { id, client, json } => {
            let result = match client {
                Some(client_id) => service.generate_my_movement_pdf(client_id, id).await,
                None => service.generate_movement_pdf(id).await,
            };
            (result, json)
        }
        StatementCommands::Client {
            id,
            direction,
            json,
        } => {
            let result = match direction {
                Direction::All => service.generate_all_my_movements_pdf(id).await,
                Direction::Sent => service.generate_all_my_sent_pdf(id).await,
                Direction::Received => service.generate_all_my_received_pdf(id).await,
            };
            (result, json)
        }
        StatementCommands::All { json } => (service.generate_all_movements_pdf().await, json),
    };

    if json {
        return output::emit_json(result);
    }

    let path = result?;
    println!("{} Statement written to {}", "✓".green(), path.display());
    Ok(())
}
