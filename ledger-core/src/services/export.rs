//! JSON export and import of movements
//!
//! The file is a pretty-printed JSON array of movements in their serialized
//! (camelCase) shape. Parsing is purely structural; invariants are checked
//! by the caller before anything is persisted.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::result::Result;
use crate::domain::Movement;

/// Write `movements` to `destination`, replacing any existing file
pub fn export_json(destination: &Path, movements: &[Movement]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(destination)?);
    serde_json::to_writer_pretty(&mut writer, movements)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read the movements stored in `source`
pub fn import_json(source: &Path) -> Result<Vec<Movement>> {
    let reader = BufReader::new(File::open(source)?);
    let movements = serde_json::from_reader(reader)?;
    Ok(movements)
}
