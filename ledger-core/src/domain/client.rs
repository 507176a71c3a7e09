//! Client domain model
//!
//! Clients are owned by the client directory; the ledger only reads them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::movement::ClientId;

/// A bank account held by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub iban: String,
    pub balance: Decimal,
}

/// A bank client as resolved by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub accounts: Vec<BankAccount>,
}

impl Client {
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            accounts: Vec::new(),
        }
    }

    pub fn with_account(mut self, iban: impl Into<String>, balance: Decimal) -> Self {
        self.accounts.push(BankAccount {
            iban: iban.into(),
            balance,
        });
        self
    }

    /// Sum of the balances of all accounts held by this client, `None` if it
    /// does not fit in a `Decimal`
    pub fn total_balance(&self) -> Option<Decimal> {
        self.accounts
            .iter()
            .try_fold(Decimal::ZERO, |total, a| total.checked_add(a.balance))
    }

    /// Sender position after moving `amount` out, as recorded on a movement
    ///
    /// `outstanding` is what the sender's earlier, unreversed movements already
    /// took out of the accounts. A client without accounts always records 0.
    /// `None` when the position overflows.
    pub fn balance_after(&self, outstanding: Decimal, amount: Decimal) -> Option<Decimal> {
        if self.accounts.is_empty() {
            return Some(Decimal::ZERO);
        }
        self.total_balance()?
            .checked_sub(outstanding)?
            .checked_sub(amount)
    }
}
