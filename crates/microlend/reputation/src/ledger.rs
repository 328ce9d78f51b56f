use std::collections::HashMap;

use microlend_types::{LendingTier, Principal, ReputationRecord};
use tracing::debug;

use crate::config::ReputationConfig;
use crate::error::ReputationError;

/// One reputation record per borrower, created on first resolution.
///
/// Reads never create records: an unknown identity reports the fresh
/// `{0, 0, initial_score}` record without touching storage.
#[derive(Debug, Clone)]
pub struct ReputationLedger {
    config: ReputationConfig,
    records: HashMap<Principal, ReputationRecord>,
}

impl ReputationLedger {
    /// Create an empty ledger after validating the settings.
    pub fn new(config: ReputationConfig) -> Result<Self, ReputationError> {
        config.validate()?;
        Ok(Self {
            config,
            records: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// Stored record for `who`, or the fresh default.
    pub fn get_user_reputation(&self, who: &Principal) -> ReputationRecord {
        self.records
            .get(who)
            .copied()
            .unwrap_or_else(|| self.fresh())
    }

    /// Credit a fully repaid loan to `who`.
    pub fn record_repayment(&mut self, who: &Principal) -> ReputationRecord {
        let reward = self.config.repayment_reward;
        let max = self.config.max_score;
        let record = self.entry(who);
        record.loans_paid = record.loans_paid.saturating_add(1);
        record.lending_score = record.lending_score.saturating_add(reward).min(max);
        let updated = *record;

        debug!(
            borrower = %who,
            loans_paid = updated.loans_paid,
            score = updated.lending_score,
            "Repayment recorded"
        );
        updated
    }

    /// Debit a defaulted loan to `who`.
    pub fn record_default(&mut self, who: &Principal) -> ReputationRecord {
        let penalty = self.config.default_penalty;
        let min = self.config.min_score;
        let record = self.entry(who);
        record.loans_defaulted = record.loans_defaulted.saturating_add(1);
        record.lending_score = record.lending_score.saturating_sub(penalty).max(min);
        let updated = *record;

        debug!(
            borrower = %who,
            loans_defaulted = updated.loans_defaulted,
            score = updated.lending_score,
            "Default recorded"
        );
        updated
    }

    /// Trust band for `who` based on the current score.
    pub fn tier(&self, who: &Principal) -> LendingTier {
        self.classify(self.get_user_reputation(who).lending_score)
    }

    pub fn classify(&self, score: u32) -> LendingTier {
        if score >= self.config.trusted_threshold {
            LendingTier::Trusted
        } else if score >= self.config.initial_score {
            LendingTier::Standard
        } else if score >= self.config.restricted_threshold {
            LendingTier::Watch
        } else {
            LendingTier::Restricted
        }
    }

    /// Number of identities with a stored record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn fresh(&self) -> ReputationRecord {
        ReputationRecord::fresh(self.config.initial_score)
    }

    fn entry(&mut self, who: &Principal) -> &mut ReputationRecord {
        let fresh = self.fresh();
        self.records.entry(who.clone()).or_insert(fresh)
    }
}

impl Default for ReputationLedger {
    fn default() -> Self {
        Self {
            config: ReputationConfig::default(),
            records: HashMap::new(),
        }
    }
}
