//! Movement domain model

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Client identifier as issued by the client directory
pub type ClientId = i64;

/// Store-assigned movement identifier
pub type MovementId = Uuid;

/// Days after creation during which a movement may be reversed
pub const REVERSAL_WINDOW_DAYS: i64 = 7;

/// Deadline for reversing a movement created at `date`
pub fn reversal_deadline_for(date: DateTime<Utc>) -> DateTime<Utc> {
    date + Duration::days(REVERSAL_WINDOW_DAYS)
}

/// A recorded transfer between two accounts
///
/// Field names serialize in camelCase; this is the shape of the export file
/// and of cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: MovementId,
    pub sender_client_id: ClientId,
    /// Absent for transfers to accounts outside the bank's client base
    pub recipient_client_id: Option<ClientId>,
    pub origin_account: String,
    pub destination_account: String,
    /// Free-form classification tag, e.g. "transfer" or "deposit"
    #[serde(rename = "type")]
    pub movement_type: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    /// Sender position recorded at creation time; never re-derived
    pub balance_snapshot: Decimal,
    pub is_reversible: bool,
    pub reversal_deadline: DateTime<Utc>,
}

impl Movement {
    /// Whether `client_id` took part in this movement, as sender or recipient
    pub fn involves(&self, client_id: ClientId) -> bool {
        self.sender_client_id == client_id || self.recipient_client_id == Some(client_id)
    }

    /// Re-check the invariants a persisted movement must satisfy
    ///
    /// Used on import, where records come from a file rather than from
    /// `NewMovement::new`.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(self.amount));
        }
        if self.reversal_deadline != reversal_deadline_for(self.date) {
            return Err(Error::invalid_movement(format!(
                "movement {} has reversal deadline {} but was created at {}",
                self.id, self.reversal_deadline, self.date
            )));
        }
        if self.origin_account.trim().is_empty() || self.destination_account.trim().is_empty() {
            return Err(Error::invalid_movement(format!(
                "movement {} is missing an account reference",
                self.id
            )));
        }
        Ok(())
    }
}

/// Request to create a movement, as supplied by a caller
#[derive(Debug, Clone)]
pub struct CreateMovement {
    pub sender_client_id: ClientId,
    pub recipient_client_id: Option<ClientId>,
    pub origin_account: String,
    pub destination_account: String,
    pub movement_type: String,
    pub amount: Decimal,
}

/// A movement that has not been persisted yet (no id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub sender_client_id: ClientId,
    pub recipient_client_id: Option<ClientId>,
    pub origin_account: String,
    pub destination_account: String,
    pub movement_type: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub balance_snapshot: Decimal,
    pub is_reversible: bool,
    pub reversal_deadline: DateTime<Utc>,
}

impl NewMovement {
    /// Build a fresh, reversible movement dated `date`
    pub fn new(request: CreateMovement, balance_snapshot: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            sender_client_id: request.sender_client_id,
            recipient_client_id: request.recipient_client_id,
            origin_account: request.origin_account,
            destination_account: request.destination_account,
            movement_type: request.movement_type,
            amount: request.amount,
            date,
            balance_snapshot,
            is_reversible: true,
            reversal_deadline: reversal_deadline_for(date),
        }
    }

    /// Attach the store-assigned id
    pub fn with_id(self, id: MovementId) -> Movement {
        Movement {
            id,
            sender_client_id: self.sender_client_id,
            recipient_client_id: self.recipient_client_id,
            origin_account: self.origin_account,
            destination_account: self.destination_account,
            movement_type: self.movement_type,
            amount: self.amount,
            date: self.date,
            balance_snapshot: self.balance_snapshot,
            is_reversible: self.is_reversible,
            reversal_deadline: self.reversal_deadline,
        }
    }
}
