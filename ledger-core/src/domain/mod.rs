//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod client;
mod movement;
pub mod result;
pub mod reversal;

pub use client::{BankAccount, Client};
pub use movement::{
    reversal_deadline_for, ClientId, CreateMovement, Movement, MovementId, NewMovement,
    REVERSAL_WINDOW_DAYS,
};
