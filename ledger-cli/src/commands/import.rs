//! Import command - load movements from a JSON export

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use super::get_context;
use crate::output;

pub async fn run(file: &Path, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let spinner = if json {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
        pb.set_message(format!("Importing {}", file.display()));
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let result = ctx.movement_service.import_movements(file).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if json {
        return output::emit_json(result);
    }

    let movements = result?;
    println!(
        "{} Imported {} movement(s) from {}",
        "✓".green(),
        movements.len(),
        file.display()
    );
    if !movements.is_empty() {
        println!("{}", output::movement_table(&movements));
    }
    Ok(())
}
