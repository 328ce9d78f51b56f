//! Collaborators the registry depends on: value transfer and block height.
//!
//! The registry only sees the traits. [`InMemoryBank`] and [`ManualClock`]
//! are reference implementations for embedding and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use microlend_types::{Height, Principal};
use thiserror::Error;

/// Failures reported by a [`ValueTransfer`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Principal,
        required: u64,
        available: u64,
    },

    #[error("sender and recipient are both {0}")]
    SelfTransfer(Principal),

    #[error("balance overflow crediting {0}")]
    Overflow(Principal),
}

/// Atomic value movement between two accounts.
///
/// A failed transfer must leave both balances untouched.
pub trait ValueTransfer: Send + Sync {
    fn balance_of(&self, account: &Principal) -> u64;

    fn transfer(&self, from: &Principal, to: &Principal, amount: u64) -> Result<(), TransferError>;
}

/// Monotonically non-decreasing height counter.
pub trait HeightClock: Send + Sync {
    fn current_height(&self) -> Height;
}

/// Mutex-guarded balance map.
#[derive(Debug, Default)]
pub struct InMemoryBank {
    balances: Mutex<HashMap<Principal, u64>>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the bank with opening balances.
    pub fn with_balances<I, P>(balances: I) -> Self
    where
        I: IntoIterator<Item = (P, u64)>,
        P: Into<Principal>,
    {
        let balances = balances
            .into_iter()
            .map(|(who, amount)| (who.into(), amount))
            .collect();
        Self {
            balances: Mutex::new(balances),
        }
    }

    /// Mint `amount` into `account`, returning the new balance.
    pub fn deposit(&self, account: &Principal, amount: u64) -> Result<u64, TransferError> {
        let mut balances = self.lock();
        let current = balances.get(account).copied().unwrap_or(0);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(account.clone()))?;
        balances.insert(account.clone(), updated);
        Ok(updated)
    }

    /// Sum of every balance held by the bank.
    pub fn total_supply(&self) -> u128 {
        self.lock().values().map(|v| u128::from(*v)).sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Principal, u64>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ValueTransfer for InMemoryBank {
    fn balance_of(&self, account: &Principal) -> u64 {
        self.lock().get(account).copied().unwrap_or(0)
    }

    fn transfer(&self, from: &Principal, to: &Principal, amount: u64) -> Result<(), TransferError> {
        if from == to {
            return Err(TransferError::SelfTransfer(from.clone()));
        }
        if amount == 0 {
            return Ok(());
        }

        let mut balances = self.lock();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: from.clone(),
                required: amount,
                available,
            });
        }
        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;

        balances.insert(from.clone(), available - amount);
        balances.insert(to.clone(), credited);
        Ok(())
    }
}

/// Height counter advanced explicitly by the caller.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Height) -> Self {
        Self {
            height: AtomicU64::new(start),
        }
    }

    /// Move forward by `blocks`, returning the new height.
    pub fn advance(&self, blocks: u64) -> Height {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(blocks))
            })
            .unwrap_or_else(|h| h);
        previous.saturating_add(blocks)
    }

    /// Jump to `height`. Never moves the clock backward.
    pub fn set(&self, height: Height) -> Height {
        self.height.fetch_max(height, Ordering::SeqCst).max(height)
    }
}

impl HeightClock for ManualClock {
    fn current_height(&self) -> Height {
        self.height.load(Ordering::SeqCst)
    }
}
