#![deny(unsafe_code)]
//! # microlend-types
//!
//! Value types shared by the micro-lending ledger crates.
//!
//! - [`Principal`] and [`LoanId`]: participant and loan identifiers.
//! - [`Loan`] and [`LoanStatus`]: the loan record and its lifecycle tag.
//! - [`ReputationRecord`] and [`LendingTier`]: per-borrower repayment history.
//!
//! Everything here is plain data. Snapshots handed out by the registry are
//! owned copies of these types, never references into ledger storage.

pub mod ids;
pub mod loan;
pub mod reputation;

pub use ids::{Height, LoanId, Principal};
pub use loan::{Loan, LoanStatus, ParseStatusError};
pub use reputation::{LendingTier, ReputationRecord};
