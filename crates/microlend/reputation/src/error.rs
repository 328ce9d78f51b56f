use thiserror::Error;

/// Errors raised while validating reputation settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReputationError {
    #[error("score bounds out of order: min {min} < initial {initial} < max {max} must hold")]
    ScoreBounds { min: u32, initial: u32, max: u32 },

    #[error("{0} must be greater than zero")]
    ZeroStep(&'static str),

    #[error("tier thresholds out of order: restricted {restricted} must not exceed trusted {trusted}")]
    TierThresholds { restricted: u32, trusted: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds_display() {
        let err = ReputationError::ScoreBounds {
            min: 0,
            initial: 120,
            max: 100,
        };
        assert!(err.to_string().contains("initial 120"));
    }

    #[test]
    fn zero_step_display() {
        let err = ReputationError::ZeroStep("repayment_reward");
        assert_eq!(
            err.to_string(),
            "repayment_reward must be greater than zero"
        );
    }
}
