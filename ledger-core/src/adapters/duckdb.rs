//! DuckDB repository implementation
//!
//! Implements both the movement store and the client directory over a single
//! database file. The connection sits behind a mutex. Reads reach it through
//! `spawn_blocking` so a slow query never stalls the runtime. Writes run in a
//! transaction on the calling task and finish within the poll that starts
//! them: a caller that gives up on a write never leaves it running behind its
//! back.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{BankAccount, Client, ClientId, Movement, MovementId, NewMovement};
use crate::ports::{ClientDirectory, MovementStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const MOVEMENT_COLUMNS: &str = "movement_id, sender_client_id, recipient_client_id, \
     origin_account, destination_account, movement_type, amount, movement_date, \
     balance_snapshot, is_reversible, reversal_deadline";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database open.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading stays off; nothing here needs one
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Run the read `f` against the connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::store(format!("Store task failed: {}", e)))?
    }

    /// Run `f` inside a transaction on the calling thread
    ///
    /// Returns once the transaction has committed, or rolled back because `f`
    /// or the commit failed.
    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;
        // Dropping the transaction without commit rolls it back
        let tx = conn.transaction()?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }

    // === Client operations ===

    /// Insert or replace a client together with its accounts
    pub fn upsert_client(&self, client: &Client) -> Result<()> {
        self.write(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO sys_clients (client_id, name) VALUES (?, ?)",
                params![client.id, client.name],
            )?;
            tx.execute("DELETE FROM sys_bank_accounts WHERE client_id = ?", [client.id])?;
            for account in &client.accounts {
                tx.execute(
                    "INSERT INTO sys_bank_accounts (iban, client_id, balance) VALUES (?, ?, ?)",
                    params![account.iban, client.id, account.balance.to_string()],
                )?;
            }
            Ok(())
        })
    }

    /// All registered clients, ordered by id
    pub fn get_clients(&self) -> Result<Vec<Client>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;
        let mut stmt = conn.prepare("SELECT client_id FROM sys_clients ORDER BY client_id")?;
        let ids: Vec<ClientId> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        let mut clients = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(client) = load_client(&conn, id)? {
                clients.push(client);
            }
        }
        Ok(clients)
    }

    /// Number of stored movements
    pub fn movement_count(&self) -> Result<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::store(format!("Lock poisoned: {}", e)))?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_movements", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl MovementStore for DuckDbRepository {
    async fn insert(&self, movement: NewMovement) -> Result<Movement> {
        let movement = movement.with_id(Uuid::new_v4());
        self.write(|tx| insert_movement(tx, &movement))?;
        Ok(movement)
    }

    async fn insert_all(&self, movements: &[Movement]) -> Result<()> {
        self.write(|tx| {
            for movement in movements {
                insert_movement(tx, movement)?;
            }
            Ok(())
        })
    }

    async fn get(&self, id: MovementId) -> Result<Option<Movement>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM sys_movements WHERE movement_id = ?",
                MOVEMENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id.to_string()], MovementRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().next().map(MovementRow::into_movement).transpose()
        })
        .await
    }

    async fn find_by_sender(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.with_conn(move |conn| {
            query_movements(conn, "WHERE sender_client_id = ?", params![client_id])
        })
        .await
    }

    async fn find_by_recipient(&self, client_id: ClientId) -> Result<Vec<Movement>> {
        self.with_conn(move |conn| {
            query_movements(conn, "WHERE recipient_client_id = ?", params![client_id])
        })
        .await
    }

    async fn find_by_type(&self, movement_type: &str) -> Result<Vec<Movement>> {
        let movement_type = movement_type.to_string();
        self.with_conn(move |conn| {
            query_movements(conn, "WHERE movement_type = ?", params![movement_type])
        })
        .await
    }

    async fn find_all(&self) -> Result<Vec<Movement>> {
        self.with_conn(|conn| query_movements(conn, "", params![]))
            .await
    }

    async fn mark_irreversible(&self, id: MovementId) -> Result<bool> {
        self.write(|tx| {
            // Conditional update: only the caller that sees the row still
            // reversible gets a changed row back
            let changed = tx.execute(
                "UPDATE sys_movements SET is_reversible = false
                 WHERE movement_id = ? AND is_reversible = true",
                [id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }

    async fn delete(&self, id: MovementId) -> Result<bool> {
        self.write(|tx| {
            let deleted = tx.execute(
                "DELETE FROM sys_movements WHERE movement_id = ?",
                [id.to_string()],
            )?;
            Ok(deleted > 0)
        })
    }
}

#[async_trait]
impl ClientDirectory for DuckDbRepository {
    async fn find_client(&self, id: ClientId) -> Result<Option<Client>> {
        self.with_conn(move |conn| load_client(conn, id)).await
    }

    async fn client_exists(&self, id: ClientId) -> Result<bool> {
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sys_clients WHERE client_id = ?",
                [id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }
}

/// Raw column values of a movement row, before parsing
struct MovementRow {
    id: String,
    sender_client_id: ClientId,
    recipient_client_id: Option<ClientId>,
    origin_account: String,
    destination_account: String,
    movement_type: String,
    amount: String,
    date: String,
    balance_snapshot: String,
    is_reversible: bool,
    reversal_deadline: String,
}

impl MovementRow {
    // Column order matches MOVEMENT_COLUMNS
    fn from_row(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender_client_id: row.get(1)?,
            recipient_client_id: row.get(2)?,
            origin_account: row.get(3)?,
            destination_account: row.get(4)?,
            movement_type: row.get(5)?,
            amount: row.get(6)?,
            date: row.get(7)?,
            balance_snapshot: row.get(8)?,
            is_reversible: row.get(9)?,
            reversal_deadline: row.get(10)?,
        })
    }

    fn into_movement(self) -> Result<Movement> {
        Ok(Movement {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| Error::store(format!("Corrupt movement id '{}': {}", self.id, e)))?,
            sender_client_id: self.sender_client_id,
            recipient_client_id: self.recipient_client_id,
            origin_account: self.origin_account,
            destination_account: self.destination_account,
            movement_type: self.movement_type,
            amount: parse_decimal(&self.amount)?,
            date: parse_timestamp(&self.date)?,
            balance_snapshot: parse_decimal(&self.balance_snapshot)?,
            is_reversible: self.is_reversible,
            reversal_deadline: parse_timestamp(&self.reversal_deadline)?,
        })
    }
}

fn insert_movement(conn: &Connection, movement: &Movement) -> Result<()> {
    let sql = format!(
        "INSERT INTO sys_movements ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        MOVEMENT_COLUMNS
    );
    conn.execute(
        &sql,
        params![
            movement.id.to_string(),
            movement.sender_client_id,
            movement.recipient_client_id,
            movement.origin_account,
            movement.destination_account,
            movement.movement_type,
            movement.amount.to_string(),
            format_timestamp(&movement.date),
            movement.balance_snapshot.to_string(),
            movement.is_reversible,
            format_timestamp(&movement.reversal_deadline),
        ],
    )?;
    Ok(())
}

fn query_movements(
    conn: &Connection,
    filter: &str,
    params: &[&dyn duckdb::ToSql],
) -> Result<Vec<Movement>> {
    let sql = format!(
        "SELECT {} FROM sys_movements {} ORDER BY movement_date, movement_id",
        MOVEMENT_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, MovementRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(MovementRow::into_movement).collect()
}

fn load_client(conn: &Connection, id: ClientId) -> Result<Option<Client>> {
    let mut stmt = conn.prepare("SELECT name FROM sys_clients WHERE client_id = ?")?;
    let names: Vec<String> = stmt
        .query_map([id], |row| row.get(0))?
        .collect::<std::result::Result<_, _>>()?;
    let Some(name) = names.into_iter().next() else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT iban, balance FROM sys_bank_accounts WHERE client_id = ? ORDER BY iban",
    )?;
    let raw: Vec<(String, String)> = stmt
        .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;

    let accounts = raw
        .into_iter()
        .map(|(iban, balance)| {
            Ok(BankAccount {
                iban,
                balance: parse_decimal(&balance)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Client { id, name, accounts }))
}

// Timestamps are stored as fixed-width RFC 3339 UTC text, which keeps them
// lossless and lets ORDER BY sort chronologically.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::store(format!("Corrupt timestamp '{}': {}", s, e)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::store(format!("Corrupt decimal '{}': {}", s, e)))
}
