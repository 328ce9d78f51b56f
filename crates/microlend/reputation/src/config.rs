use serde::{Deserialize, Serialize};

use crate::error::ReputationError;

/// Score bounds, step sizes and tier thresholds for the reputation ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Score of an identity with no history.
    pub initial_score: u32,
    /// Floor applied after a default.
    pub min_score: u32,
    /// Cap applied after a repayment.
    pub max_score: u32,
    /// Points gained per repaid loan.
    pub repayment_reward: u32,
    /// Points lost per defaulted loan.
    pub default_penalty: u32,
    /// At or above this score a borrower is `Trusted`.
    pub trusted_threshold: u32,
    /// Below this score a borrower is `Restricted`.
    pub restricted_threshold: u32,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            initial_score: 50,
            min_score: 0,
            max_score: 100,
            repayment_reward: 10,
            default_penalty: 20,
            trusted_threshold: 80,
            restricted_threshold: 30,
        }
    }
}

impl ReputationConfig {
    /// Harsher settings: slower to earn, faster to lose.
    pub fn strict() -> Self {
        Self {
            repayment_reward: 5,
            default_penalty: 30,
            trusted_threshold: 90,
            restricted_threshold: 40,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ReputationError> {
        if !(self.min_score < self.initial_score && self.initial_score < self.max_score) {
            return Err(ReputationError::ScoreBounds {
                min: self.min_score,
                initial: self.initial_score,
                max: self.max_score,
            });
        }
        if self.repayment_reward == 0 {
            return Err(ReputationError::ZeroStep("repayment_reward"));
        }
        if self.default_penalty == 0 {
            return Err(ReputationError::ZeroStep("default_penalty"));
        }
        if self.restricted_threshold > self.trusted_threshold {
            return Err(ReputationError::TierThresholds {
                restricted: self.restricted_threshold,
                trusted: self.trusted_threshold,
            });
        }
        Ok(())
    }
}
