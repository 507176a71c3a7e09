//! Movement service - creation, reversal, cached queries, export/import and
//! statement generation
//!
//! Writes go to the store first and then refresh the `MOVEMENT:<id>` cache
//! entry. Reads try the cache and fall back to the store, repopulating the
//! cache on the way out. The cache is best-effort: its failures are logged
//! and never reach the caller.

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::reversal;
use crate::domain::{Client, ClientId, CreateMovement, Movement, MovementId, NewMovement};
use crate::ports::{Cache, CacheEntry, CacheKey, ClientDirectory, MovementStore, PdfRenderer};
use crate::services::export;

/// Upper bounds on individual store and cache calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Store and directory calls; exceeding it fails with `TransientStore`
    pub store: Duration,
    /// Cache calls; exceeding it counts as a miss
    pub cache: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_millis(5000),
            cache: Duration::from_millis(250),
        }
    }
}

/// The movement ledger
pub struct MovementService {
    store: Arc<dyn MovementStore>,
    directory: Arc<dyn ClientDirectory>,
    cache: Arc<dyn Cache>,
    renderer: Arc<dyn PdfRenderer>,
    timeouts: Timeouts,
    /// Serializes balance-affecting creations per sender; entries live only
    /// while some creation holds or awaits them
    sender_locks: DashMap<ClientId, Arc<Mutex<()>>>,
}

impl MovementService {
    pub fn new(
        store: Arc<dyn MovementStore>,
        directory: Arc<dyn ClientDirectory>,
        cache: Arc<dyn Cache>,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            store,
            directory,
            cache,
            renderer,
            timeouts: Timeouts::default(),
            sender_locks: DashMap::new(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    // === Writes ===

    /// Record a transfer and return its store-assigned id
    ///
    /// The balance snapshot is the sender's account total minus everything
    /// its unreversed movements already moved out, minus this amount. It is
    /// read and recorded while holding the sender's creation lock, so two
    /// transfers from one sender never start from the same position.
    pub async fn create_movement(&self, request: CreateMovement) -> Result<MovementId> {
        if request.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(request.amount));
        }
        if request.origin_account.trim().is_empty() || request.destination_account.trim().is_empty()
        {
            return Err(Error::invalid_movement(
                "origin and destination accounts are required",
            ));
        }

        let sender_id = request.sender_client_id;
        let lock = self.sender_lock(sender_id);
        let created = {
            let _guard = lock.lock().await;
            self.create_locked(request).await
        };
        drop(lock);
        self.sender_locks
            .remove_if(&sender_id, |_, entry| Arc::strong_count(entry) == 1);

        let movement = created?;
        info!(
            movement_id = %movement.id,
            sender = movement.sender_client_id,
            "Movement created"
        );
        Ok(movement.id)
    }

    /// The part of a creation that runs under the sender's lock
    async fn create_locked(&self, request: CreateMovement) -> Result<Movement> {
        let sender = self
            .store_call("find sender", self.directory.find_client(request.sender_client_id))
            .await?
            .ok_or(Error::SenderNotFound(request.sender_client_id))?;

        if let Some(recipient_id) = request.recipient_client_id {
            let exists = self
                .store_call("find recipient", self.directory.client_exists(recipient_id))
                .await?;
            if !exists {
                return Err(Error::RecipientNotFound(recipient_id));
            }
        }

        let outstanding = if sender.accounts.is_empty() {
            Decimal::ZERO
        } else {
            self.outstanding_sent(sender.id).await?
        };
        let balance_snapshot = sender
            .balance_after(outstanding, request.amount)
            .ok_or(Error::InvalidAmount(request.amount))?;

        let new_movement = NewMovement::new(request, balance_snapshot, Utc::now());
        let movement = self
            .store_call("insert movement", self.store.insert(new_movement))
            .await?;

        self.cache_set(
            &CacheKey::Movement(movement.id),
            CacheEntry::Movement(movement.clone()),
        )
        .await;
        Ok(movement)
    }

    /// Reverse a movement within its reversal window
    ///
    /// Of several concurrent reversals of the same movement exactly one
    /// succeeds; the others fail with `MovementNotReversible`.
    pub async fn reverse_movement(&self, id: MovementId) -> Result<()> {
        let movement = self
            .store_call("load movement", self.store.get(id))
            .await?
            .ok_or(Error::MovementNotFound(id))?;

        if !reversal::is_reversible(&movement, Utc::now()) {
            return Err(Error::MovementNotReversible(id));
        }

        let flipped = match self
            .store_call("mark irreversible", self.store.mark_irreversible(id))
            .await
        {
            Ok(flipped) => flipped,
            Err(e) => {
                // Outcome unknown: the next read must go to the store
                self.cache_delete(&CacheKey::Movement(id)).await;
                return Err(e);
            }
        };
        if !flipped {
            // Lost the race against another reversal (or a delete)
            return Err(Error::MovementNotReversible(id));
        }

        let reversed = Movement {
            is_reversible: false,
            ..movement
        };
        self.cache_set(&CacheKey::Movement(id), CacheEntry::Movement(reversed))
            .await;

        info!(movement_id = %id, "Movement reversed");
        Ok(())
    }

    /// Delete a movement and invalidate its own cache entry
    ///
    /// Aggregate views that contain it are left to expire.
    pub async fn delete_movement(&self, id: MovementId) -> Result<()> {
        self.store_call("load movement", self.store.get(id))
            .await?
            .ok_or(Error::MovementNotFound(id))?;

        let deleted = self
            .store_call("delete movement", self.store.delete(id))
            .await;
        self.cache_delete(&CacheKey::Movement(id)).await;
        if !deleted? {
            return Err(Error::MovementNotFound(id));
        }

        info!(movement_id = %id, "Movement deleted");
        Ok(())
    }

    // === Reads ===

    /// Get a single movement, read-through on `MOVEMENT:<id>`
    pub async fn get_movement(&self, id: MovementId) -> Result<Movement> {
        let key = CacheKey::Movement(id);
        if let Some(CacheEntry::Movement(movement)) = self.cache_get(&key).await {
            debug!(key = %key, "Cache hit");
            return Ok(movement);
        }

        let movement = self
            .store_call("load movement", self.store.get(id))
            .await?
            .ok_or(Error::MovementNotFound(id))?;
        self.cache_set(&key, CacheEntry::Movement(movement.clone()))
            .await;
        Ok(movement)
    }

    /// Every movement a client sent or received
    pub async fn all_movements_for_client(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.ensure_client(client_id).await?;
        self.cached_view(CacheKey::AllForClient(client_id), self.load_both_roles(client_id))
            .await
    }

    /// The requesting client's own movements, sent or received
    pub async fn my_movements(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.ensure_client(client_id).await?;
        self.cached_view(CacheKey::MyMovements(client_id), self.load_both_roles(client_id))
            .await
    }

    pub async fn sent_by_client(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.ensure_client(client_id).await?;
        let load = self.store_call("find by sender", self.store.find_by_sender(client_id));
        self.cached_view(CacheKey::Sent(client_id), load).await
    }

    pub async fn received_by_client(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.ensure_client(client_id).await?;
        let load = self.store_call("find by recipient", self.store.find_by_recipient(client_id));
        self.cached_view(CacheKey::Received(client_id), load).await
    }

    /// Movements of a client in either role
    pub async fn movements_by_client_id(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.ensure_client(client_id).await?;
        self.cached_view(CacheKey::ByClient(client_id), self.load_both_roles(client_id))
            .await
    }

    pub async fn movements_by_type(&self, movement_type: &str) -> Result<Vec<Movement>> {
        let load = self.store_call("find by type", self.store.find_by_type(movement_type));
        self.cached_view(CacheKey::ByType(movement_type.to_string()), load)
            .await
    }

    /// Every movement in the store, bypassing the cache
    pub async fn all_movements(&self) -> Result<Vec<Movement>> {
        self.store_call("find all", self.store.find_all()).await
    }

    // === Export / import ===

    pub async fn export_movements(&self, destination: &Path, movements: &[Movement]) -> Result<()> {
        export::export_json(destination, movements)?;
        info!(count = movements.len(), path = %destination.display(), "Movements exported");
        Ok(())
    }

    /// Load movements from an export file and persist them
    ///
    /// Every record is validated before anything is written; one bad record
    /// rejects the whole file. Ids are kept, so importing into a store that
    /// already holds one of them fails with `Conflict`.
    pub async fn import_movements(&self, source: &Path) -> Result<Vec<Movement>> {
        let movements = export::import_json(source)?;
        for movement in &movements {
            movement.validate()?;
        }

        self.store_call("insert imported movements", self.store.insert_all(&movements))
            .await?;

        info!(count = movements.len(), path = %source.display(), "Movements imported");
        Ok(movements)
    }

    // === Statements ===

    pub async fn generate_movement_pdf(&self, id: MovementId) -> Result<PathBuf> {
        let movement = self.get_movement(id).await?;
        self.renderer.render_movement(&movement)
    }

    /// Render one of the client's own movements
    ///
    /// Fails with `OwnershipMismatch` unless the client sent or received it.
    pub async fn generate_my_movement_pdf(
        &self,
        client_id: ClientId,
        id: MovementId,
    ) -> Result<PathBuf> {
        self.ensure_client(client_id).await?;
        let movement = self.get_movement(id).await?;
        if !movement.involves(client_id) {
            return Err(Error::OwnershipMismatch {
                movement: id,
                client: client_id,
            });
        }
        self.renderer.render_movement(&movement)
    }

    pub async fn generate_all_my_movements_pdf(&self, client_id: ClientId) -> Result<PathBuf> {
        let client = self.require_client(client_id).await?;
        let movements = self.my_movements(client_id).await?;
        self.renderer.render_movements(&movements, Some(&client))
    }

    pub async fn generate_all_my_sent_pdf(&self, client_id: ClientId) -> Result<PathBuf> {
        let client = self.require_client(client_id).await?;
        let movements = self.sent_by_client(client_id).await?;
        self.renderer.render_movements(&movements, Some(&client))
    }

    pub async fn generate_all_my_received_pdf(&self, client_id: ClientId) -> Result<PathBuf> {
        let client = self.require_client(client_id).await?;
        let movements = self.received_by_client(client_id).await?;
        self.renderer.render_movements(&movements, Some(&client))
    }

    pub async fn generate_all_movements_pdf(&self) -> Result<PathBuf> {
        let movements = self.all_movements().await?;
        self.renderer.render_movements(&movements, None)
    }

    // === Internals ===

    fn sender_lock(&self, sender: ClientId) -> Arc<Mutex<()>> {
        let entry = self.sender_locks.entry(sender).or_default();
        Arc::clone(entry.value())
    }

    /// What the sender's unreversed movements have moved out so far
    async fn outstanding_sent(&self, sender: ClientId) -> Result<Decimal> {
        let sent = self
            .store_call("find by sender", self.store.find_by_sender(sender))
            .await?;
        sent.iter()
            .filter(|m| m.is_reversible)
            .try_fold(Decimal::ZERO, |total, m| total.checked_add(m.amount))
            .ok_or_else(|| Error::invalid_movement("outstanding total of the sender overflows"))
    }

    async fn ensure_client(&self, client_id: ClientId) -> Result<()> {
        let exists = self
            .store_call("find client", self.directory.client_exists(client_id))
            .await?;
        if exists {
            Ok(())
        } else {
            Err(Error::ClientNotFound(client_id))
        }
    }

    async fn require_client(&self, client_id: ClientId) -> Result<Client> {
        self.store_call("find client", self.directory.find_client(client_id))
            .await?
            .ok_or(Error::ClientNotFound(client_id))
    }

    async fn load_both_roles(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        let sent = self
            .store_call("find by sender", self.store.find_by_sender(client_id))
            .await?;
        let received = self
            .store_call("find by recipient", self.store.find_by_recipient(client_id))
            .await?;
        Ok(union_by_id(sent, received))
    }

    /// Serve a view from the cache, or run `load` and cache its result
    ///
    /// `load` is only polled on a miss. Empty results are not cached, and a
    /// cached empty list counts as a miss.
    async fn cached_view<F>(&self, key: CacheKey, load: F) -> Result<Vec<Movement>>
    where
        F: Future<Output = Result<Vec<Movement>>>,
    {
        if let Some(CacheEntry::Movements(movements)) = self.cache_get(&key).await {
            if !movements.is_empty() {
                debug!(key = %key, count = movements.len(), "Cache hit");
                return Ok(movements);
            }
        }

        debug!(key = %key, "Cache miss, loading from store");
        let movements = load.await?;
        if movements.is_empty() {
            return Ok(movements);
        }

        for movement in &movements {
            self.cache_set(
                &CacheKey::Movement(movement.id),
                CacheEntry::Movement(movement.clone()),
            )
            .await;
        }
        self.cache_set(&key, CacheEntry::Movements(movements.clone()))
            .await;

        Ok(movements)
    }

    async fn store_call<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout(self.timeouts.store, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::transient_store(format!(
                "{} timed out after {:?}",
                operation, self.timeouts.store
            ))),
        }
    }

    async fn cache_get(&self, key: &CacheKey) -> Option<CacheEntry> {
        match timeout(self.timeouts.cache, self.cache.get(key)).await {
            Ok(Ok(entry)) => entry,
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                None
            }
            Err(_) => {
                warn!(key = %key, "Cache read timed out, falling back to store");
                None
            }
        }
    }

    async fn cache_set(&self, key: &CacheKey, entry: CacheEntry) {
        match timeout(self.timeouts.cache, self.cache.set(key, entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "Cache write failed"),
            Err(_) => warn!(key = %key, "Cache write timed out"),
        }
    }

    async fn cache_delete(&self, key: &CacheKey) {
        match timeout(self.timeouts.cache, self.cache.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "Cache invalidation failed"),
            Err(_) => warn!(key = %key, "Cache invalidation timed out"),
        }
    }
}

/// Concatenate two movement lists, keeping the first occurrence of each id
fn union_by_id(first: Vec<Movement>, second: Vec<Movement>) -> Vec<Movement> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|m| seen.insert(m.id))
        .collect()
}
