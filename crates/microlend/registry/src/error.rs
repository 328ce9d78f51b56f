use microlend_reputation::ReputationError;
use microlend_types::{LoanId, LoanStatus, Principal};
use thiserror::Error;

use crate::env::TransferError;

/// Failures surfaced by loan registry operations.
///
/// Every variant is detected before any state is touched, so a failed
/// operation leaves loans, balances, reputation and the journal unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    #[error("{0} not found")]
    NotFound(LoanId),

    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: u64, reason: String },

    #[error("insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Principal,
        required: u64,
        available: u64,
    },

    #[error("{loan_id} already funded or resolved (status {status})")]
    LoanExists { loan_id: LoanId, status: LoanStatus },

    #[error("{caller} is not authorized to {action} {loan_id}")]
    Unauthorized {
        caller: Principal,
        loan_id: LoanId,
        action: &'static str,
    },

    #[error("{loan_id} not due: matures at height {maturity}, current height {current}")]
    LoanNotDue {
        loan_id: LoanId,
        maturity: u64,
        current: u64,
    },

    #[error("{loan_id} is not active (status {status})")]
    LoanNotActive { loan_id: LoanId, status: LoanStatus },

    #[error("settlement failed: {0}")]
    Settlement(String),

    #[error("journal error: {0}")]
    Journal(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LendingError {
    /// Stable numeric code for the failure kind.
    pub fn code(&self) -> u32 {
        match self {
            Self::NotFound(_) => 101,
            Self::InvalidAmount { .. } => 102,
            Self::InsufficientBalance { .. } => 103,
            Self::LoanExists { .. } => 104,
            Self::Unauthorized { .. } => 105,
            Self::LoanNotDue { .. } => 106,
            Self::LoanNotActive { .. } => 107,
            Self::Settlement(_) => 108,
            Self::Journal(_) => 109,
            Self::InvalidConfig(_) => 110,
        }
    }

    /// Short kebab-case name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::InvalidAmount { .. } => "invalid-amount",
            Self::InsufficientBalance { .. } => "insufficient-balance",
            Self::LoanExists { .. } => "loan-exists",
            Self::Unauthorized { .. } => "unauthorized",
            Self::LoanNotDue { .. } => "loan-not-due",
            Self::LoanNotActive { .. } => "loan-not-active",
            Self::Settlement(_) => "settlement",
            Self::Journal(_) => "journal",
            Self::InvalidConfig(_) => "invalid-config",
        }
    }

    pub(crate) fn invalid_amount(amount: u64, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }
}

impl From<TransferError> for LendingError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InsufficientBalance {
                account,
                required,
                available,
            } => Self::InsufficientBalance {
                account,
                required,
                available,
            },
            other => Self::Settlement(other.to_string()),
        }
    }
}

impl From<ReputationError> for LendingError {
    fn from(err: ReputationError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
