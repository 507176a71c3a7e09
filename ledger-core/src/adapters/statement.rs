//! Plain-text statement renderer
//!
//! Stands in for the external PDF service: writes one document per request
//! into a statements directory and returns its path.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Client, Movement};
use crate::ports::PdfRenderer;

pub struct TextStatementRenderer {
    output_dir: PathBuf,
}

impl TextStatementRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_document(&self, prefix: &str, body: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let name = format!(
            "{}_{}_{}.txt",
            prefix,
            Utc::now().format("%Y%m%dT%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let path = self.output_dir.join(name);
        fs::write(&path, body)?;
        Ok(path)
    }
}

fn movement_block(out: &mut String, movement: &Movement) {
    let recipient = movement
        .recipient_client_id
        .map(|id| format!("client {}", id))
        .unwrap_or_else(|| "external".to_string());
    let status = if movement.is_reversible {
        format!("reversible until {}", movement.reversal_deadline.format("%Y-%m-%d %H:%M"))
    } else {
        "final".to_string()
    };

    let _ = writeln!(out, "Movement    {}", movement.id);
    let _ = writeln!(out, "  Date      {}", movement.date.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "  Type      {}", movement.movement_type);
    let _ = writeln!(out, "  From      {} (client {})", movement.origin_account, movement.sender_client_id);
    let _ = writeln!(out, "  To        {} ({})", movement.destination_account, recipient);
    let _ = writeln!(out, "  Amount    {:.2}", movement.amount);
    let _ = writeln!(out, "  Balance   {:.2}", movement.balance_snapshot);
    let _ = writeln!(out, "  Status    {}", status);
}

impl PdfRenderer for TextStatementRenderer {
    fn render_movement(&self, movement: &Movement) -> Result<PathBuf> {
        let mut body = String::from("MOVEMENT RECEIPT\n\n");
        movement_block(&mut body, movement);
        self.write_document("movement", &body)
    }

    fn render_movements(&self, movements: &[Movement], client: Option<&Client>) -> Result<PathBuf> {
        let mut body = String::from("MOVEMENTS STATEMENT\n");
        if let Some(client) = client {
            let _ = writeln!(body, "Client {} - {}", client.id, client.name);
        }
        let _ = writeln!(body, "{} movement(s)\n", movements.len());

        for movement in movements {
            movement_block(&mut body, movement);
            body.push('\n');
        }

        let total: Decimal = movements.iter().map(|m| m.amount).sum();
        let _ = writeln!(body, "Total moved {:.2}", total);

        let prefix = match client {
            Some(c) => format!("statement_client_{}", c.id),
            None => "statement_all".to_string(),
        };
        self.write_document(&prefix, &body)
    }
}
