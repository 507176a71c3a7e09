//! Client command - register clients in the local directory

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;

use super::get_context;
use crate::output;
use ledger_core::{Client, ClientId};

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a client, replacing any existing one with the same id
    Add {
        /// Client id
        id: ClientId,
        /// Display name
        name: String,
        /// Bank account as IBAN=BALANCE (repeatable)
        #[arg(long = "account", value_parser = parse_account)]
        accounts: Vec<(String, Decimal)>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered clients
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_account(s: &str) -> std::result::Result<(String, Decimal), String> {
    let (iban, balance) = s
        .split_once('=')
        .ok_or_else(|| format!("expected IBAN=BALANCE, got '{}'", s))?;
    let iban = iban.trim();
    if iban.is_empty() {
        return Err("IBAN must not be empty".to_string());
    }
    let balance = balance
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid balance '{}': {}", balance, e))?;
    Ok((iban.to_string(), balance))
}

pub fn run(command: ClientCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ClientCommands::Add {
            id,
            name,
            accounts,
            json,
        } => {
            let client = accounts
                .into_iter()
                .fold(Client::new(id, name), |client, (iban, balance)| {
                    client.with_account(iban, balance)
                });
            let result = ctx.repository.upsert_client(&client).map(|()| client.clone());

            if json {
                return output::emit_json(result);
            }
            result?;
            println!(
                "{} Client {} ({}) saved with {} account(s)",
                "✓".green(),
                client.id,
                client.name,
                client.accounts.len()
            );
        }
        ClientCommands::List { json } => {
            let result = ctx.repository.get_clients();
            if json {
                return output::emit_json(result);
            }

            let clients = result?;
            if clients.is_empty() {
                output::info("No clients registered.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Name", "Accounts", "Total balance"]);
            for client in &clients {
                table.add_row(vec![
                    client.id.to_string(),
                    client.name.clone(),
                    client
                        .accounts
                        .iter()
                        .map(|a| a.iban.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    client
                        .total_balance()
                        .map(output::format_amount)
                        .unwrap_or_else(|| "overflow".to_string()),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
