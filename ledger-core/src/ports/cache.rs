//! Cache port - key-value cache mirroring movements and query views

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::{ClientId, Movement, MovementId};

/// Structured cache key: an entity or view tag plus an identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A single movement
    Movement(MovementId),
    /// All movements of a client, sent and received
    AllForClient(ClientId),
    /// The authenticated client's own movements
    MyMovements(ClientId),
    Sent(ClientId),
    Received(ClientId),
    /// Movements of a client in either role
    ByClient(ClientId),
    ByType(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Movement(id) => write!(f, "MOVEMENT:{}", id),
            CacheKey::AllForClient(c) => write!(f, "MOVEMENTS:ALL:{}", c),
            CacheKey::MyMovements(c) => write!(f, "MOVEMENTS:ALL:MY:{}", c),
            CacheKey::Sent(c) => write!(f, "MOVEMENTS:SENT:{}", c),
            CacheKey::Received(c) => write!(f, "MOVEMENTS:RECEIVED:{}", c),
            CacheKey::ByClient(c) => write!(f, "MOVEMENTS:CLIENT:{}", c),
            CacheKey::ByType(t) => write!(f, "MOVEMENTS:TYPE:{}", t),
        }
    }
}

/// A cached value: one movement or a whole query view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CacheEntry {
    Movement(Movement),
    Movements(Vec<Movement>),
}

/// Key-value cache
///
/// Callers treat every error as a miss (reads) or drop it (writes); the cache
/// is never the source of truth. Entry lifetime is the adapter's concern.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<()>;

    async fn delete(&self, key: &CacheKey) -> Result<()>;
}
