//! Reputation snapshot types.

use serde::{Deserialize, Serialize};

/// Repayment history of a single borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    /// Loans fully repaid as borrower.
    pub loans_paid: u64,
    /// Loans whose collateral was claimed by the lender.
    pub loans_defaulted: u64,
    pub lending_score: u32,
}

impl ReputationRecord {
    /// Record for an identity with no history.
    pub const fn fresh(initial_score: u32) -> Self {
        Self {
            loans_paid: 0,
            loans_defaulted: 0,
            lending_score: initial_score,
        }
    }

    pub fn loans_resolved(&self) -> u64 {
        self.loans_paid.saturating_add(self.loans_defaulted)
    }
}

/// Coarse trust band derived from a lending score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LendingTier {
    Restricted,
    Watch,
    Standard,
    Trusted,
}
