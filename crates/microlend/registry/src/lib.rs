#![deny(unsafe_code)]
//! # microlend-registry
//!
//! Collateralized peer-to-peer loans on top of a pluggable value-transfer
//! primitive and block-height clock.
//!
//! ```text
//! Created --fund--> Active --repay--> Repaid
//!                      \--(height >= funded_at + duration) + claim--> Defaulted
//! ```
//!
//! - [`LoanRegistry`]: lifecycle operations and read-only queries.
//! - [`LendingConfig`]: minimum principal, rate denominator, escrow account, reputation settings.
//! - [`ValueTransfer`] / [`HeightClock`]: collaborator seams, with
//!   [`InMemoryBank`] and [`ManualClock`] as in-process implementations.
//! - [`LendingJournal`]: hash-chained audit trail of committed transitions.
//!
//! Terminal transitions update the borrower's record in the embedded
//! [`microlend_reputation::ReputationLedger`].

pub mod config;
pub mod env;
pub mod error;
pub mod journal;
pub mod registry;
pub mod settlement;

pub use config::LendingConfig;
pub use env::{HeightClock, InMemoryBank, ManualClock, TransferError, ValueTransfer};
pub use error::LendingError;
pub use journal::{JournalEntry, LendingJournal, LoanEvent};
pub use registry::LoanRegistry;
pub use settlement::{SettledLegs, TransferLeg};

pub use microlend_reputation::{ReputationConfig, ReputationLedger};
pub use microlend_types::{
    Height, LendingTier, Loan, LoanId, LoanStatus, Principal, ReputationRecord,
};
