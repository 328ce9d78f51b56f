//! Multi-leg value movement: all legs settle or none do.

use std::collections::HashMap;

use microlend_types::Principal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::env::{TransferError, ValueTransfer};

/// One directed transfer within a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub from: Principal,
    pub to: Principal,
    pub amount: u64,
}

impl TransferLeg {
    pub fn new(from: &Principal, to: &Principal, amount: u64) -> Self {
        Self {
            from: from.clone(),
            to: to.clone(),
            amount,
        }
    }

    fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            amount: self.amount,
        }
    }
}

/// Legs that were applied, kept so they can be reversed.
#[derive(Debug, Clone, Default)]
pub struct SettledLegs {
    legs: Vec<TransferLeg>,
}

impl SettledLegs {
    pub fn legs(&self) -> &[TransferLeg] {
        &self.legs
    }

    /// Reverse every applied leg, newest first.
    pub fn unwind(self, bank: &dyn ValueTransfer) -> Result<(), TransferError> {
        for leg in self.legs.iter().rev() {
            let back = leg.reversed();
            bank.transfer(&back.from, &back.to, back.amount)?;
        }
        Ok(())
    }
}

/// Dry-run the legs against current balances without moving anything.
///
/// Credits from earlier legs count toward later debits, matching the order
/// [`settle`] applies them in.
pub fn preflight(bank: &dyn ValueTransfer, legs: &[TransferLeg]) -> Result<(), TransferError> {
    let mut projected: HashMap<&Principal, u64> = HashMap::new();

    for leg in legs.iter().filter(|leg| leg.amount > 0) {
        if leg.from == leg.to {
            return Err(TransferError::SelfTransfer(leg.from.clone()));
        }

        let available = *projected
            .entry(&leg.from)
            .or_insert_with(|| bank.balance_of(&leg.from));
        if available < leg.amount {
            return Err(TransferError::InsufficientBalance {
                account: leg.from.clone(),
                required: leg.amount,
                available,
            });
        }
        projected.insert(&leg.from, available - leg.amount);

        let credited = projected
            .entry(&leg.to)
            .or_insert_with(|| bank.balance_of(&leg.to));
        *credited = credited
            .checked_add(leg.amount)
            .ok_or_else(|| TransferError::Overflow(leg.to.clone()))?;
    }
    Ok(())
}

/// Apply the legs in order. If one fails, the ones already applied are
/// reversed before the error is returned.
pub fn settle(bank: &dyn ValueTransfer, legs: &[TransferLeg]) -> Result<SettledLegs, TransferError> {
    let mut settled = SettledLegs::default();

    for leg in legs.iter().filter(|leg| leg.amount > 0) {
        if let Err(err) = bank.transfer(&leg.from, &leg.to, leg.amount) {
            let applied = settled.legs.len();
            if let Err(unwind_err) = settled.unwind(bank) {
                error!(
                    error = %unwind_err,
                    applied,
                    "Failed to unwind partial settlement"
                );
            }
            return Err(err);
        }
        settled.legs.push(leg.clone());
    }

    debug!(legs = settled.legs.len(), "Settlement applied");
    Ok(settled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::InMemoryBank;

    fn p(id: &str) -> Principal {
        Principal::new(id)
    }

    #[test]
    fn all_legs_settle() {
        let bank = InMemoryBank::with_balances([("borrower", 100u64), ("escrow", 50u64)]);
        let legs = [
            TransferLeg::new(&p("borrower"), &p("lender"), 80),
            TransferLeg::new(&p("escrow"), &p("borrower"), 50),
        ];
        preflight(&bank, &legs).unwrap();
        let settled = settle(&bank, &legs).unwrap();
        assert_eq!(settled.legs().len(), 2);
        assert_eq!(bank.balance_of(&p("borrower")), 70);
        assert_eq!(bank.balance_of(&p("lender")), 80);
        assert_eq!(bank.balance_of(&p("escrow")), 0);
    }

    #[test]
    fn failing_second_leg_unwinds_first() {
        let bank = InMemoryBank::with_balances([("borrower", 100u64), ("escrow", 10u64)]);
        let legs = [
            TransferLeg::new(&p("borrower"), &p("lender"), 80),
            TransferLeg::new(&p("escrow"), &p("borrower"), 50),
        ];
        let err = settle(&bank, &legs).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientBalance { .. }));
        assert_eq!(bank.balance_of(&p("borrower")), 100);
        assert_eq!(bank.balance_of(&p("lender")), 0);
        assert_eq!(bank.balance_of(&p("escrow")), 10);
    }

    #[test]
    fn preflight_detects_shortfall_without_moving_value() {
        let bank = InMemoryBank::with_balances([("borrower", 10u64)]);
        let legs = [TransferLeg::new(&p("borrower"), &p("lender"), 11)];
        assert!(preflight(&bank, &legs).is_err());
        assert_eq!(bank.balance_of(&p("borrower")), 10);
    }

    #[test]
    fn preflight_counts_earlier_credits() {
        let bank = InMemoryBank::with_balances([("a", 10u64)]);
        let legs = [
            TransferLeg::new(&p("a"), &p("b"), 10),
            TransferLeg::new(&p("b"), &p("c"), 10),
        ];
        assert!(preflight(&bank, &legs).is_ok());
    }

    #[test]
    fn zero_legs_are_skipped() {
        let bank = InMemoryBank::new();
        let legs = [TransferLeg::new(&p("a"), &p("b"), 0)];
        let settled = settle(&bank, &legs).unwrap();
        assert!(settled.legs().is_empty());
    }

    #[test]
    fn unwind_restores_balances() {
        let bank = InMemoryBank::with_balances([("a", 10u64)]);
        let settled = settle(&bank, &[TransferLeg::new(&p("a"), &p("b"), 4)]).unwrap();
        settled.unwind(&bank).unwrap();
        assert_eq!(bank.balance_of(&p("a")), 10);
        assert_eq!(bank.balance_of(&p("b")), 0);
    }
}
