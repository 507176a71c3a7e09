//! Ledger CLI - movement ledger in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{client, create, delete, export, import, list, logs, reverse, show, statement};
use ledger_core::{ClientId, LogEvent, MovementId};

/// Ledger - record, reverse and query movements between client accounts
#[derive(Parser)]
#[command(name = "ledger", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage clients and their accounts
    Client {
        #[command(subcommand)]
        command: client::ClientCommands,
    },

    /// Record a transfer
    Create {
        /// Sending client id
        #[arg(long)]
        sender: ClientId,
        /// Receiving client id (omit for external accounts)
        #[arg(long)]
        recipient: Option<ClientId>,
        /// Origin account (IBAN)
        #[arg(long)]
        origin: String,
        /// Destination account (IBAN)
        #[arg(long)]
        destination: String,
        /// Movement type tag
        #[arg(long = "type", default_value = "transfer")]
        movement_type: String,
        /// Amount to move, greater than zero
        #[arg(long)]
        amount: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reverse a movement within 7 days of its creation
    Reverse {
        /// Movement id
        id: MovementId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a movement
    Show {
        /// Movement id
        id: MovementId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List movements of a client or of a type
    List {
        /// Client whose movements to list
        #[arg(long, required_unless_present = "movement_type")]
        client: Option<ClientId>,
        /// Which of the client's views to show
        #[arg(long, value_enum, default_value_t = list::View::All)]
        view: list::View,
        /// List movements with this type tag instead
        #[arg(long = "type", conflicts_with = "client")]
        movement_type: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a movement
    Delete {
        /// Movement id
        id: MovementId,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export movements to a JSON file
    Export {
        /// Destination file
        file: PathBuf,
        /// Only movements this client sent or received
        #[arg(long)]
        client: Option<ClientId>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import movements from a JSON export
    Import {
        /// Source file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render statements
    Statement {
        #[command(subcommand)]
        command: statement::StatementCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Client { .. } => "client",
            Commands::Create { .. } => "create",
            Commands::Reverse { .. } => "reverse",
            Commands::Show { .. } => "show",
            Commands::List { .. } => "list",
            Commands::Delete { .. } => "delete",
            Commands::Export { .. } => "export",
            Commands::Import { .. } => "import",
            Commands::Statement { .. } => "statement",
            Commands::Logs { .. } => "logs",
        }
    }

    fn movement_id(&self) -> Option<MovementId> {
        match self {
            Commands::Reverse { id, .. } | Commands::Show { id, .. } | Commands::Delete { id, .. } => {
                Some(*id)
            }
            _ => None,
        }
    }
}

/// Diagnostics go to stderr, filtered by `LEDGER_LOG` (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LEDGER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let logger = commands::get_logger();
    let command = cli.command.name();
    let mut event = LogEvent::new("command_executed").with_command(command);
    if let Some(id) = cli.command.movement_id() {
        event = event.with_movement(id);
    }
    commands::log_event(&logger, event);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Journal the kind only, never the message
            let kind = e
                .downcast_ref::<ledger_core::Error>()
                .map(|core| core.kind())
                .unwrap_or("cli_error");
            commands::log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(command)
                    .with_error(kind),
            );
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Client { command } => client::run(command),
        Commands::Create {
            sender,
            recipient,
            origin,
            destination,
            movement_type,
            amount,
            json,
        } => {
            let args = create::CreateArgs {
                sender,
                recipient,
                origin,
                destination,
                movement_type,
                amount,
            };
            create::run(args, json).await
        }
        Commands::Reverse { id, json } => reverse::run(id, json).await,
        Commands::Show { id, json } => show::run(id, json).await,
        Commands::List {
            client,
            view,
            movement_type,
            json,
        } => list::run(client, view, movement_type, json).await,
        Commands::Delete { id, force, json } => delete::run(id, force, json).await,
        Commands::Export { file, client, json } => export::run(&file, client, json).await,
        Commands::Import { file, json } => import::run(&file, json).await,
        Commands::Statement { command } => statement::run(command).await,
        Commands::Logs { command } => logs::run(command),
    }
}
