//! Ledger Core - movement ledger with a cache-consistent query layer
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Movement, Client) and the reversal rule
//! - **ports**: Trait definitions for external dependencies (store, directory, cache, renderer)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB, in-memory cache, text statements)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use adapters::memory_cache::InMemoryCache;
use adapters::statement::TextStatementRenderer;
use config::Config;
use services::MovementService;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{BankAccount, Client, ClientId, CreateMovement, Movement, MovementId};
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

/// Main context for ledger operations
///
/// Wires configuration, the DuckDB store (which also serves as the client
/// directory), the cache and the statement renderer into a `MovementService`.
pub struct LedgerContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub cache: Arc<InMemoryCache>,
    pub movement_service: MovementService,
}

impl LedgerContext {
    /// Open the ledger stored in `data_dir`, creating it if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join("ledger.duckdb"))?);
        repository.ensure_schema()?;

        Ok(Self::assemble(config, repository))
    }

    /// A throwaway ledger backed by an in-memory database
    ///
    /// Statements still go to `config.statements_dir`.
    pub fn in_memory(config: Config) -> Result<Self> {
        let repository = Arc::new(DuckDbRepository::open_in_memory()?);
        repository.ensure_schema()?;

        Ok(Self::assemble(config, repository))
    }

    fn assemble(config: Config, repository: Arc<DuckDbRepository>) -> Self {
        let cache = Arc::new(InMemoryCache::new(config.cache_ttl));
        let renderer = Arc::new(TextStatementRenderer::new(config.statements_dir.clone()));

        let movement_service = MovementService::new(
            repository.clone(),
            repository.clone(),
            cache.clone(),
            renderer,
        )
        .with_timeouts(config.timeouts());

        Self {
            config,
            repository,
            cache,
            movement_service,
        }
    }
}
