//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the MovementStore and ClientDirectory ports
//! - An in-process concurrent map for the Cache port
//! - Plain-text statements for the PdfRenderer port

pub mod duckdb;
pub mod memory_cache;
pub mod statement;
