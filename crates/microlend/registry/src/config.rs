use microlend_reputation::ReputationConfig;
use microlend_types::Principal;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Loan registry settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Smallest principal a borrower may request, in base units.
    pub min_loan_amount: u64,
    /// Divisor for `interest_rate`; with 1000, a rate of 50 is 5%.
    pub rate_denominator: u64,
    /// Account holding escrowed collateral.
    pub escrow_account: String,
    pub reputation: ReputationConfig,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            min_loan_amount: 1_000_000,
            rate_denominator: 1000,
            escrow_account: "microlend.escrow".to_string(),
            reputation: ReputationConfig::default(),
        }
    }
}

impl LendingConfig {
    /// Higher minimum principal and harsher reputation steps.
    pub fn strict() -> Self {
        Self {
            min_loan_amount: 10_000_000,
            reputation: ReputationConfig::strict(),
            ..Self::default()
        }
    }

    /// Low minimum principal, suited to small demos.
    pub fn relaxed() -> Self {
        Self {
            min_loan_amount: 1,
            ..Self::default()
        }
    }

    /// Parse a JSON document; fields left out keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, LendingError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LendingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LendingError> {
        if self.min_loan_amount == 0 {
            return Err(LendingError::InvalidConfig(
                "min_loan_amount must be greater than zero".to_string(),
            ));
        }
        if self.rate_denominator == 0 {
            return Err(LendingError::InvalidConfig(
                "rate_denominator must be greater than zero".to_string(),
            ));
        }
        if self.escrow_account.trim().is_empty() {
            return Err(LendingError::InvalidConfig(
                "escrow_account must not be empty".to_string(),
            ));
        }
        self.reputation.validate()?;
        Ok(())
    }

    pub fn escrow_principal(&self) -> Principal {
        Principal::new(self.escrow_account.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LendingConfig::default();
        assert_eq!(c.min_loan_amount, 1_000_000);
        assert_eq!(c.rate_denominator, 1000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn presets_are_valid() {
        assert!(LendingConfig::strict().validate().is_ok());
        assert!(LendingConfig::relaxed().validate().is_ok());
        assert!(LendingConfig::strict().min_loan_amount > LendingConfig::default().min_loan_amount);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = LendingConfig::from_json_str(
            r#"{"min_loan_amount": 500, "reputation": {"default_penalty": 15}}"#,
        )
        .unwrap();
        assert_eq!(c.min_loan_amount, 500);
        assert_eq!(c.rate_denominator, 1000);
        assert_eq!(c.reputation.default_penalty, 15);
        assert_eq!(c.reputation.initial_score, 50);
    }

    #[test]
    fn rejects_zero_denominator() {
        let err = LendingConfig::from_json_str(r#"{"rate_denominator": 0}"#).unwrap_err();
        assert_eq!(err.code(), 110);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(LendingConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn reputation_errors_surface_as_config_errors() {
        let c = LendingConfig {
            reputation: ReputationConfig {
                repayment_reward: 0,
                ..ReputationConfig::default()
            },
            ..LendingConfig::default()
        };
        assert!(matches!(c.validate(), Err(LendingError::InvalidConfig(_))));
    }
}
