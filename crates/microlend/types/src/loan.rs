//! Loan record and lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ids::{Height, LoanId, Principal};

/// Lifecycle of a loan.
///
/// `Created -> Active -> {Repaid | Defaulted}`. The two last states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Created,
    Active,
    Repaid,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Active => "ACTIVE",
            Self::Repaid => "REPAID",
            Self::Defaulted => "DEFAULTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Repaid | Self::Defaulted)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Active)
                | (Self::Active, Self::Repaid)
                | (Self::Active, Self::Defaulted)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown loan status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for LoanStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "ACTIVE" => Ok(Self::Active),
            "REPAID" => Ok(Self::Repaid),
            "DEFAULTED" => Ok(Self::Defaulted),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Snapshot of a loan as stored by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower: Principal,
    /// Set once, when the loan is funded.
    pub lender: Option<Principal>,
    /// Principal requested, in base units.
    pub amount: u64,
    /// Rate applied to `amount` at repayment, over the registry's rate denominator.
    pub interest_rate: u64,
    /// Heights after funding within which repayment must occur.
    pub duration: u64,
    /// Amount escrowed from the borrower at creation.
    pub collateral: u64,
    pub status: LoanStatus,
    /// Height recorded when the loan became active.
    pub funded_at: Option<Height>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// Height from which the lender may claim the collateral.
    ///
    /// Saturates so a loan with an enormous duration simply never matures.
    pub fn maturity_height(&self) -> Option<Height> {
        self.funded_at
            .map(|funded_at| funded_at.saturating_add(self.duration))
    }

    pub fn is_borrower(&self, who: &Principal) -> bool {
        &self.borrower == who
    }

    pub fn is_lender(&self, who: &Principal) -> bool {
        self.lender.as_ref() == Some(who)
    }
}
