//! Client directory port
//!
//! Client onboarding lives outside the ledger; this is the read-only view the
//! ledger needs of it.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{Client, ClientId};

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Resolve a client with its accounts
    async fn find_client(&self, id: ClientId) -> Result<Option<Client>>;

    /// Whether a client with this id exists
    async fn client_exists(&self, id: ClientId) -> Result<bool> {
        Ok(self.find_client(id).await?.is_some())
    }
}
