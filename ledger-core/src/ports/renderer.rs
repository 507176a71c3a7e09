//! Document renderer port
//!
//! Turns movements into a statement document. Formatting is entirely the
//! renderer's job; the ledger only chooses which movements go in.

use std::path::PathBuf;

use crate::domain::result::Result;
use crate::domain::{Client, Movement};

pub trait PdfRenderer: Send + Sync {
    /// Render a single movement, returning the path of the document
    fn render_movement(&self, movement: &Movement) -> Result<PathBuf>;

    /// Render a list of movements, optionally headed by their owning client
    fn render_movements(&self, movements: &[Movement], client: Option<&Client>) -> Result<PathBuf>;
}
