//! Movement store port - durable movement repository

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{ClientId, Movement, MovementId, NewMovement};

/// Durable, queryable repository of movements
///
/// Implementations must make `mark_irreversible` an atomic read-modify-write
/// on a single row: of several concurrent calls for the same id, at most one
/// returns `true`.
#[async_trait]
pub trait MovementStore: Send + Sync {
    /// Persist a new movement, assigning its id
    async fn insert(&self, movement: NewMovement) -> Result<Movement>;

    /// Persist movements that already carry ids (import)
    ///
    /// All or nothing: a duplicate id fails the whole batch with `Conflict`.
    async fn insert_all(&self, movements: &[Movement]) -> Result<()>;

    /// Get a movement by id
    async fn get(&self, id: MovementId) -> Result<Option<Movement>>;

    /// Movements sent by a client
    async fn find_by_sender(&self, client_id: ClientId) -> Result<Vec<Movement>>;

    /// Movements received by a client
    async fn find_by_recipient(&self, client_id: ClientId) -> Result<Vec<Movement>>;

    /// Movements with the given type tag
    async fn find_by_type(&self, movement_type: &str) -> Result<Vec<Movement>>;

    /// Every movement in the store
    async fn find_all(&self) -> Result<Vec<Movement>>;

    /// Flip `is_reversible` from true to false
    ///
    /// Returns false when the movement is missing or was already irreversible.
    async fn mark_irreversible(&self, id: MovementId) -> Result<bool>;

    /// Delete a movement, returning whether a row was removed
    async fn delete(&self, id: MovementId) -> Result<bool>;
}
