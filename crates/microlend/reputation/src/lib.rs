#![deny(unsafe_code)]
//! # microlend-reputation
//!
//! Tracks each borrower's repayment history and derives a lending score.
//!
//! The ledger is a leaf component: it never looks at loans. The loan registry
//! calls [`ReputationLedger::record_repayment`] or
//! [`ReputationLedger::record_default`] exactly once per loan, when the loan
//! reaches a terminal state.

pub mod config;
pub mod error;
pub mod ledger;

pub use config::ReputationConfig;
pub use error::ReputationError;
pub use ledger::ReputationLedger;
