//! Movement service behaviour against a real DuckDB store
//!
//! Run with: cargo test --test movement_service_test

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use ledger_core::adapters::duckdb::DuckDbRepository;
use ledger_core::adapters::memory_cache::InMemoryCache;
use ledger_core::adapters::statement::TextStatementRenderer;
use ledger_core::domain::result::Result;
use ledger_core::domain::NewMovement;
use ledger_core::ports::{Cache, CacheEntry, CacheKey, ClientDirectory, MovementStore};
use ledger_core::services::{MovementService, Timeouts};
use ledger_core::{Client, ClientId, CreateMovement, Error, Movement, MovementId};

/// Delegates to DuckDB and counts the calls that read movements
struct CountingStore {
    inner: Arc<DuckDbRepository>,
    reads: AtomicUsize,
}

impl CountingStore {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MovementStore for CountingStore {
    async fn insert(&self, movement: NewMovement) -> Result<Movement> {
        self.inner.insert(movement).await
    }

    async fn insert_all(&self, movements: &[Movement]) -> Result<()> {
        self.inner.insert_all(movements).await
    }

    async fn get(&self, id: MovementId) -> Result<Option<Movement>> {
        self.hit();
        self.inner.get(id).await
    }

    async fn find_by_sender(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.hit();
        self.inner.find_by_sender(client_id).await
    }

    async fn find_by_recipient(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.hit();
        self.inner.find_by_recipient(client_id).await
    }

    async fn find_by_type(&self, movement_type: &str) -> Result<Vec<Movement>> {
        self.hit();
        self.inner.find_by_type(movement_type).await
    }

    async fn find_all(&self) -> Result<Vec<Movement>> {
        self.hit();
        self.inner.find_all().await
    }

    async fn mark_irreversible(&self, id: MovementId) -> Result<bool> {
        self.inner.mark_irreversible(id).await
    }

    async fn delete(&self, id: MovementId) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// A cache that is always down
struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>> {
        Err(Error::transient_cache("connection refused"))
    }

    async fn set(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<()> {
        Err(Error::transient_cache("connection refused"))
    }

    async fn delete(&self, _key: &CacheKey) -> Result<()> {
        Err(Error::transient_cache("connection refused"))
    }
}

/// A store that never answers
struct HangingStore;

#[async_trait]
impl MovementStore for HangingStore {
    async fn insert(&self, _movement: NewMovement) -> Result<Movement> {
        std::future::pending().await
    }

    async fn insert_all(&self, _movements: &[Movement]) -> Result<()> {
        std::future::pending().await
    }

    async fn get(&self, _id: MovementId) -> Result<Option<Movement>> {
        std::future::pending().await
    }

    async fn find_by_sender(&self, _client_id: ClientId) -> Result<Vec<Movement>> {
        std::future::pending().await
    }

    async fn find_by_recipient(&self, _client_id: ClientId) -> Result<Vec<Movement>> {
        std::future::pending().await
    }

    async fn find_by_type(&self, _movement_type: &str) -> Result<Vec<Movement>> {
        std::future::pending().await
    }

    async fn find_all(&self) -> Result<Vec<Movement>> {
        std::future::pending().await
    }

    async fn mark_irreversible(&self, _id: MovementId) -> Result<bool> {
        std::future::pending().await
    }

    async fn delete(&self, _id: MovementId) -> Result<bool> {
        std::future::pending().await
    }
}

/// Answers reads at once from `known`; writes go to DuckDB, or never finish
/// when there is no database
struct InstantReadStore {
    known: Vec<Movement>,
    writes: Option<Arc<DuckDbRepository>>,
}

impl InstantReadStore {
    fn matching(&self, keep: impl Fn(&Movement) -> bool) -> Vec<Movement> {
        self.known.iter().filter(|m| keep(m)).cloned().collect()
    }
}

#[async_trait]
impl MovementStore for InstantReadStore {
    async fn insert(&self, movement: NewMovement) -> Result<Movement> {
        match &self.writes {
            Some(repo) => repo.insert(movement).await,
            None => std::future::pending().await,
        }
    }

    async fn insert_all(&self, movements: &[Movement]) -> Result<()> {
        match &self.writes {
            Some(repo) => repo.insert_all(movements).await,
            None => std::future::pending().await,
        }
    }

    async fn get(&self, id: MovementId) -> Result<Option<Movement>> {
        Ok(self.known.iter().find(|m| m.id == id).cloned())
    }

    async fn find_by_sender(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        Ok(self.matching(|m| m.sender_client_id == client_id))
    }

    async fn find_by_recipient(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        Ok(self.matching(|m| m.recipient_client_id == Some(client_id)))
    }

    async fn find_by_type(&self, movement_type: &str) -> Result<Vec<Movement>> {
        Ok(self.matching(|m| m.movement_type == movement_type))
    }

    async fn find_all(&self) -> Result<Vec<Movement>> {
        Ok(self.known.clone())
    }

    async fn mark_irreversible(&self, id: MovementId) -> Result<bool> {
        match &self.writes {
            Some(repo) => repo.mark_irreversible(id).await,
            None => std::future::pending().await,
        }
    }

    async fn delete(&self, id: MovementId) -> Result<bool> {
        match &self.writes {
            Some(repo) => repo.delete(id).await,
            None => std::future::pending().await,
        }
    }
}

/// Client directory held in memory
struct InstantDirectory(Vec<Client>);

#[async_trait]
impl ClientDirectory for InstantDirectory {
    async fn find_client(&self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.0.iter().find(|c| c.id == id).cloned())
    }

    async fn client_exists(&self, id: ClientId) -> Result<bool> {
        Ok(self.0.iter().any(|c| c.id == id))
    }
}

/// A service whose store calls get no time at all
fn zero_deadline_service(
    store: InstantReadStore,
    cache: Arc<InMemoryCache>,
    dir: &TempDir,
) -> MovementService {
    let clients = vec![
        Client::new(1, "Ana").with_account("ES0100000000000000000001", Decimal::new(1000, 0)),
        Client::new(2, "Bruno"),
    ];
    MovementService::new(
        Arc::new(store),
        Arc::new(InstantDirectory(clients)),
        cache,
        Arc::new(TextStatementRenderer::new(dir.path())),
    )
    .with_timeouts(Timeouts {
        store: Duration::ZERO,
        cache: Duration::from_millis(50),
    })
}

struct Harness {
    service: MovementService,
    repo: Arc<DuckDbRepository>,
    store: Arc<CountingStore>,
    cache: Arc<InMemoryCache>,
    dir: TempDir,
}

/// Clients 1 and 2 hold accounts, client 3 holds none
fn seeded_repository() -> Arc<DuckDbRepository> {
    let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
    repo.ensure_schema().unwrap();
    repo.upsert_client(
        &Client::new(1, "Ana")
            .with_account("ES0100000000000000000001", Decimal::new(100000, 2))
            .with_account("ES0100000000000000000002", Decimal::new(50000, 2)),
    )
    .unwrap();
    repo.upsert_client(&Client::new(2, "Bruno").with_account("ES0200000000000000000001", Decimal::new(5000, 2)))
        .unwrap();
    repo.upsert_client(&Client::new(3, "Carla")).unwrap();
    repo
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let repo = seeded_repository();
    let store = Arc::new(CountingStore {
        inner: Arc::clone(&repo),
        reads: AtomicUsize::new(0),
    });
    let cache = Arc::new(InMemoryCache::default());
    let renderer = Arc::new(TextStatementRenderer::new(dir.path().join("statements")));

    let service = MovementService::new(store.clone(), repo.clone(), cache.clone(), renderer);

    Harness {
        service,
        repo,
        store,
        cache,
        dir,
    }
}

fn transfer(sender: ClientId, recipient: Option<ClientId>, amount: i64) -> CreateMovement {
    CreateMovement {
        sender_client_id: sender,
        recipient_client_id: recipient,
        origin_account: "ES0100000000000000000001".to_string(),
        destination_account: "ES0200000000000000000001".to_string(),
        movement_type: "transfer".to_string(),
        amount: Decimal::new(amount, 0),
    }
}

fn ids(movements: &[Movement]) -> HashSet<MovementId> {
    movements.iter().map(|m| m.id).collect()
}

#[tokio::test]
async fn test_created_movement_is_reversible_for_seven_days() {
    let h = harness();

    let id = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    let movement = h.repo.get(id).await.unwrap().unwrap();

    assert!(movement.is_reversible);
    assert_eq!(movement.reversal_deadline, movement.date + chrono::Duration::days(7));
    assert!(h.cache.contains(&CacheKey::Movement(id)));
}

#[tokio::test]
async fn test_balance_snapshot_is_recorded_at_creation() {
    let h = harness();

    let id = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    let movement = h.service.get_movement(id).await.unwrap();
    assert_eq!(movement.balance_snapshot, Decimal::new(140000, 2));

    let id = h.service.create_movement(transfer(3, Some(1), 25)).await.unwrap();
    let movement = h.service.get_movement(id).await.unwrap();
    assert_eq!(movement.balance_snapshot, Decimal::ZERO);
}

#[tokio::test]
async fn test_snapshots_follow_earlier_transfers_of_the_sender() {
    let h = harness();

    let first = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    let second = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    assert_eq!(h.service.get_movement(first).await.unwrap().balance_snapshot, Decimal::new(1400, 0));
    assert_eq!(h.service.get_movement(second).await.unwrap().balance_snapshot, Decimal::new(1300, 0));

    // A reversed movement gives its amount back
    h.service.reverse_movement(first).await.unwrap();
    let third = h.service.create_movement(transfer(1, None, 50)).await.unwrap();
    assert_eq!(h.service.get_movement(third).await.unwrap().balance_snapshot, Decimal::new(1350, 0));

    // Receiving does not change what the recipient records as sender
    let from_bruno = h.service.create_movement(transfer(2, Some(1), 5)).await.unwrap();
    assert_eq!(h.service.get_movement(from_bruno).await.unwrap().balance_snapshot, Decimal::new(45, 0));
}

#[tokio::test]
async fn test_overflowing_position_is_rejected() {
    let h = harness();
    h.repo
        .upsert_client(&Client::new(4, "Dani").with_account("ES0400000000000000000001", Decimal::NEGATIVE_ONE))
        .unwrap();
    let request = CreateMovement {
        amount: Decimal::MAX,
        ..transfer(4, Some(1), 1)
    };

    let result = h.service.create_movement(request).await;

    assert!(matches!(result, Err(Error::InvalidAmount(amount)) if amount == Decimal::MAX));
    assert_eq!(h.repo.movement_count().unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_sender_leaves_no_trace() {
    let h = harness();

    let result = h.service.create_movement(transfer(99, Some(2), 100)).await;

    assert!(matches!(result, Err(Error::SenderNotFound(99))));
    assert_eq!(h.repo.movement_count().unwrap(), 0);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_unknown_recipient_leaves_no_trace() {
    let h = harness();

    let result = h.service.create_movement(transfer(1, Some(42), 100)).await;

    assert!(matches!(result, Err(Error::RecipientNotFound(42))));
    assert_eq!(h.repo.movement_count().unwrap(), 0);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() {
    let h = harness();

    let zero = h.service.create_movement(transfer(1, Some(2), 0)).await;
    let negative = h.service.create_movement(transfer(1, Some(2), -5)).await;

    assert!(matches!(zero, Err(Error::InvalidAmount(_))));
    assert!(matches!(negative, Err(Error::InvalidAmount(_))));
    assert_eq!(h.repo.movement_count().unwrap(), 0);
}

#[tokio::test]
async fn test_transfer_between_clients_then_double_reversal() {
    let h = harness();

    let a = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();

    let sent = h.service.sent_by_client(1).await.unwrap();
    let received = h.service.received_by_client(2).await.unwrap();
    assert_eq!(ids(&sent), HashSet::from([a]));
    assert_eq!(ids(&received), HashSet::from([a]));

    h.service.reverse_movement(a).await.unwrap();
    assert!(!h.service.get_movement(a).await.unwrap().is_reversible);
    assert!(!h.repo.get(a).await.unwrap().unwrap().is_reversible);

    let second = h.service.reverse_movement(a).await;
    assert!(matches!(second, Err(Error::MovementNotReversible(id)) if id == a));
}

#[tokio::test]
async fn test_external_transfer_is_visible_to_sender_only() {
    let h = harness();

    let b = h.service.create_movement(transfer(1, None, 30)).await.unwrap();

    let all = h.service.all_movements_for_client(1).await.unwrap();
    assert!(ids(&all).contains(&b));

    for client in [1, 2, 3] {
        let received = h.service.received_by_client(client).await.unwrap();
        assert!(!ids(&received).contains(&b));
    }
}

#[tokio::test]
async fn test_reversal_after_deadline_fails_and_changes_nothing() {
    let h = harness();
    let date = Utc::now() - chrono::Duration::days(8);
    let old = NewMovement::new(transfer(1, Some(2), 10), Decimal::ZERO, date).with_id(Uuid::new_v4());
    h.repo.insert_all(std::slice::from_ref(&old)).await.unwrap();

    let result = h.service.reverse_movement(old.id).await;

    assert!(matches!(result, Err(Error::MovementNotReversible(_))));
    assert!(h.repo.get(old.id).await.unwrap().unwrap().is_reversible);
}

#[tokio::test]
async fn test_reverse_unknown_movement() {
    let h = harness();
    let id = Uuid::new_v4();

    assert!(matches!(
        h.service.reverse_movement(id).await,
        Err(Error::MovementNotFound(missing)) if missing == id
    ));
}

#[tokio::test]
async fn test_second_identical_query_is_served_from_cache() {
    let h = harness();
    h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    h.service.create_movement(transfer(2, Some(1), 5)).await.unwrap();

    let first = h.service.all_movements_for_client(1).await.unwrap();
    let reads_after_first = h.store.reads();
    let second = h.service.all_movements_for_client(1).await.unwrap();

    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.len(), 2);
    assert_eq!(h.store.reads(), reads_after_first);
}

#[tokio::test]
async fn test_view_miss_populates_item_entries() {
    let h = harness();
    let id = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    h.cache.clear();

    h.service.movements_by_type("transfer").await.unwrap();

    assert!(h.cache.contains(&CacheKey::ByType("transfer".to_string())));
    assert!(h.cache.contains(&CacheKey::Movement(id)));
}

#[tokio::test]
async fn test_empty_view_is_not_cached() {
    let h = harness();

    assert!(h.service.sent_by_client(3).await.unwrap().is_empty());
    let reads = h.store.reads();
    assert!(h.service.sent_by_client(3).await.unwrap().is_empty());

    assert_eq!(h.store.reads(), reads + 1);
    assert!(!h.cache.contains(&CacheKey::Sent(3)));
}

#[tokio::test]
async fn test_aggregate_views_are_not_invalidated_by_writes() {
    let h = harness();
    let a = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    assert_eq!(ids(&h.service.sent_by_client(1).await.unwrap()), HashSet::from([a]));

    let c = h.service.create_movement(transfer(1, Some(2), 7)).await.unwrap();

    // Still the cached view until it expires
    assert_eq!(ids(&h.service.sent_by_client(1).await.unwrap()), HashSet::from([a]));

    h.cache.delete(&CacheKey::Sent(1)).await.unwrap();
    assert_eq!(ids(&h.service.sent_by_client(1).await.unwrap()), HashSet::from([a, c]));
}

#[tokio::test]
async fn test_self_transfer_appears_once_across_roles() {
    let h = harness();
    let own = h.service.create_movement(transfer(1, Some(1), 10)).await.unwrap();

    let by_client = h.service.movements_by_client_id(1).await.unwrap();
    let mine = h.service.my_movements(1).await.unwrap();

    assert_eq!(by_client.iter().filter(|m| m.id == own).count(), 1);
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_client_views_require_known_client() {
    let h = harness();

    assert!(matches!(h.service.all_movements_for_client(77).await, Err(Error::ClientNotFound(77))));
    assert!(matches!(h.service.my_movements(77).await, Err(Error::ClientNotFound(77))));
    assert!(matches!(h.service.sent_by_client(77).await, Err(Error::ClientNotFound(77))));
    assert!(matches!(h.service.received_by_client(77).await, Err(Error::ClientNotFound(77))));
    assert!(matches!(h.service.movements_by_client_id(77).await, Err(Error::ClientNotFound(77))));
}

#[tokio::test]
async fn test_movements_by_type() {
    let h = harness();
    let deposit = CreateMovement {
        movement_type: "deposit".to_string(),
        ..transfer(2, None, 40)
    };
    let d = h.service.create_movement(deposit).await.unwrap();
    h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();

    let deposits = h.service.movements_by_type("deposit").await.unwrap();
    assert_eq!(ids(&deposits), HashSet::from([d]));
    assert!(h.service.movements_by_type("fee").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_invalidates_item_entry() {
    let h = harness();
    let id = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    assert!(h.cache.contains(&CacheKey::Movement(id)));

    h.service.delete_movement(id).await.unwrap();

    assert!(!h.cache.contains(&CacheKey::Movement(id)));
    assert!(matches!(h.service.get_movement(id).await, Err(Error::MovementNotFound(_))));
    assert!(matches!(h.service.delete_movement(id).await, Err(Error::MovementNotFound(_))));
    assert_eq!(h.repo.movement_count().unwrap(), 0);
}

#[tokio::test]
async fn test_cache_outage_is_invisible_to_callers() {
    let dir = TempDir::new().unwrap();
    let repo = seeded_repository();
    let service = MovementService::new(
        repo.clone(),
        repo.clone(),
        Arc::new(FailingCache),
        Arc::new(TextStatementRenderer::new(dir.path())),
    );

    let id = service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    assert_eq!(service.get_movement(id).await.unwrap().id, id);
    assert_eq!(ids(&service.sent_by_client(1).await.unwrap()), HashSet::from([id]));
    service.reverse_movement(id).await.unwrap();
    service.delete_movement(id).await.unwrap();
}

#[tokio::test]
async fn test_hanging_store_times_out_as_transient() {
    let dir = TempDir::new().unwrap();
    let repo = seeded_repository();
    let service = MovementService::new(
        Arc::new(HangingStore),
        repo,
        Arc::new(InMemoryCache::default()),
        Arc::new(TextStatementRenderer::new(dir.path())),
    )
    .with_timeouts(Timeouts {
        store: Duration::from_millis(50),
        cache: Duration::from_millis(50),
    });

    let created = service.create_movement(transfer(1, Some(2), 100)).await;
    let reversed = service.reverse_movement(Uuid::new_v4()).await;

    assert!(matches!(created, Err(Error::TransientStore(_))));
    assert!(matches!(reversed, Err(Error::TransientStore(_))));
    assert!(created.unwrap_err().is_transient());
}

#[tokio::test]
async fn test_create_outcome_matches_store_under_zero_deadline() {
    let dir = TempDir::new().unwrap();
    let repo = seeded_repository();
    let cache = Arc::new(InMemoryCache::default());
    let store = InstantReadStore {
        known: Vec::new(),
        writes: Some(repo.clone()),
    };
    let service = zero_deadline_service(store, cache.clone(), &dir);

    let id = service.create_movement(transfer(1, Some(2), 100)).await.unwrap();

    assert_eq!(repo.movement_count().unwrap(), 1);
    assert!(repo.get(id).await.unwrap().is_some());
    assert!(cache.contains(&CacheKey::Movement(id)));
}

#[tokio::test]
async fn test_reverse_outcome_matches_store_and_cache_under_zero_deadline() {
    let dir = TempDir::new().unwrap();
    let repo = seeded_repository();
    let movement = NewMovement::new(transfer(1, Some(2), 100), Decimal::ZERO, Utc::now())
        .with_id(Uuid::new_v4());
    repo.insert_all(std::slice::from_ref(&movement)).await.unwrap();

    let cache = Arc::new(InMemoryCache::default());
    cache
        .set(&CacheKey::Movement(movement.id), CacheEntry::Movement(movement.clone()))
        .await
        .unwrap();
    let store = InstantReadStore {
        known: vec![movement.clone()],
        writes: Some(repo.clone()),
    };
    let service = zero_deadline_service(store, cache.clone(), &dir);

    service.reverse_movement(movement.id).await.unwrap();

    assert!(!repo.get(movement.id).await.unwrap().unwrap().is_reversible);
    match cache.get(&CacheKey::Movement(movement.id)).await.unwrap() {
        Some(CacheEntry::Movement(cached)) => assert!(!cached.is_reversible),
        other => panic!("unexpected cache entry: {:?}", other),
    }
}

#[tokio::test]
async fn test_stalled_writes_drop_the_cached_copy() {
    let dir = TempDir::new().unwrap();
    let movement = NewMovement::new(transfer(1, Some(2), 100), Decimal::ZERO, Utc::now())
        .with_id(Uuid::new_v4());
    let cache = Arc::new(InMemoryCache::default());
    let key = CacheKey::Movement(movement.id);
    let store = InstantReadStore {
        known: vec![movement.clone()],
        writes: None,
    };
    let service = zero_deadline_service(store, cache.clone(), &dir);

    cache.set(&key, CacheEntry::Movement(movement.clone())).await.unwrap();
    let reversed = service.reverse_movement(movement.id).await;
    assert!(matches!(reversed, Err(Error::TransientStore(_))));
    assert!(!cache.contains(&key));

    cache.set(&key, CacheEntry::Movement(movement.clone())).await.unwrap();
    let deleted = service.delete_movement(movement.id).await;
    assert!(matches!(deleted, Err(Error::TransientStore(_))));
    assert!(!cache.contains(&key));

    let created = service.create_movement(transfer(1, Some(2), 10)).await;
    assert!(matches!(created, Err(Error::TransientStore(_))));
}

#[tokio::test]
async fn test_export_then_import_reproduces_movements() {
    let source = harness();
    source.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    source.service.create_movement(transfer(1, None, 3)).await.unwrap();
    let reversed = source.service.create_movement(transfer(2, Some(1), 9)).await.unwrap();
    source.service.reverse_movement(reversed).await.unwrap();

    let exported = source.service.all_movements().await.unwrap();
    let path = source.dir.path().join("export").join("movements.json");
    source.service.export_movements(&path, &exported).await.unwrap();

    let target = harness();
    let imported = target.service.import_movements(&path).await.unwrap();
    let persisted = target.service.all_movements().await.unwrap();

    let sort = |mut v: Vec<Movement>| {
        v.sort_by_key(|m| m.id);
        v
    };
    assert_eq!(sort(imported), sort(exported.clone()));
    assert_eq!(sort(persisted), sort(exported));
}

#[tokio::test]
async fn test_import_into_same_store_conflicts() {
    let h = harness();
    h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    let path = h.dir.path().join("movements.json");
    let all = h.service.all_movements().await.unwrap();
    h.service.export_movements(&path, &all).await.unwrap();

    let result = h.service.import_movements(&path).await;

    assert!(matches!(result, Err(Error::Conflict(_))));
    assert_eq!(h.repo.movement_count().unwrap(), 1);
}

#[tokio::test]
async fn test_import_revalidates_records() {
    let h = harness();
    let good = NewMovement::new(transfer(1, Some(2), 10), Decimal::ZERO, Utc::now()).with_id(Uuid::new_v4());
    let mut bad = NewMovement::new(transfer(1, Some(2), 10), Decimal::ZERO, Utc::now()).with_id(Uuid::new_v4());
    bad.amount = Decimal::new(-10, 0);

    let path = h.dir.path().join("tampered.json");
    std::fs::write(&path, serde_json::to_string(&vec![good, bad]).unwrap()).unwrap();

    let result = h.service.import_movements(&path).await;

    assert!(matches!(result, Err(Error::InvalidAmount(_))));
    assert_eq!(h.repo.movement_count().unwrap(), 0);
}

#[tokio::test]
async fn test_my_movement_document_checks_ownership() {
    let h = harness();
    let a = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();

    let sender_doc = h.service.generate_my_movement_pdf(1, a).await.unwrap();
    let recipient_doc = h.service.generate_my_movement_pdf(2, a).await.unwrap();
    assert!(sender_doc.exists());
    assert!(recipient_doc.exists());

    let stranger = h.service.generate_my_movement_pdf(3, a).await;
    assert!(matches!(
        stranger,
        Err(Error::OwnershipMismatch { movement, client: 3 }) if movement == a
    ));
}

#[tokio::test]
async fn test_statement_documents() {
    let h = harness();
    let a = h.service.create_movement(transfer(1, Some(2), 100)).await.unwrap();
    h.service.create_movement(transfer(2, Some(1), 20)).await.unwrap();

    let single = h.service.generate_movement_pdf(a).await.unwrap();
    assert!(std::fs::read_to_string(&single).unwrap().contains(&a.to_string()));

    let sent = h.service.generate_all_my_sent_pdf(1).await.unwrap();
    let sent_text = std::fs::read_to_string(&sent).unwrap();
    assert!(sent_text.contains("Client 1 - Ana"));
    assert!(sent_text.contains("1 movement(s)"));

    let received = h.service.generate_all_my_received_pdf(1).await.unwrap();
    assert!(std::fs::read_to_string(&received).unwrap().contains("1 movement(s)"));

    let mine = h.service.generate_all_my_movements_pdf(1).await.unwrap();
    assert!(std::fs::read_to_string(&mine).unwrap().contains("2 movement(s)"));

    let everything = h.service.generate_all_movements_pdf().await.unwrap();
    assert!(std::fs::read_to_string(&everything).unwrap().contains("2 movement(s)"));

    assert!(matches!(
        h.service.generate_all_my_sent_pdf(50).await,
        Err(Error::ClientNotFound(50))
    ));
}
