use chrono::{DateTime, Utc};
use microlend_types::{Height, LoanId, Principal};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::LendingError;

/// Loan lifecycle events recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoanEvent {
    LoanCreated {
        loan_id: LoanId,
        borrower: Principal,
        amount: u64,
        interest_rate: u64,
        duration: u64,
        collateral: u64,
    },
    LoanFunded {
        loan_id: LoanId,
        lender: Principal,
        amount: u64,
        funded_at: Height,
    },
    LoanRepaid {
        loan_id: LoanId,
        borrower: Principal,
        lender: Principal,
        repayment: u64,
        collateral: u64,
    },
    LoanDefaulted {
        loan_id: LoanId,
        borrower: Principal,
        lender: Principal,
        collateral: u64,
    },
}

impl LoanEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Self::LoanCreated { loan_id, .. }
            | Self::LoanFunded { loan_id, .. }
            | Self::LoanRepaid { loan_id, .. }
            | Self::LoanDefaulted { loan_id, .. } => *loan_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoanCreated { .. } => "loan_created",
            Self::LoanFunded { .. } => "loan_funded",
            Self::LoanRepaid { .. } => "loan_repaid",
            Self::LoanDefaulted { .. } => "loan_defaulted",
        }
    }
}

/// Hash-chained journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: String,
    pub index: u64,
    pub height: Height,
    pub recorded_at: DateTime<Utc>,
    pub event: LoanEvent,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

/// Append-only record of every committed loan transition.
///
/// There is no way to edit or remove an entry. The registry builds the entry
/// for a transition before touching any state and commits it only after the
/// transition succeeded.
#[derive(Debug, Default, Clone)]
pub struct LendingJournal {
    entries: Vec<JournalEntry>,
}

impl LendingJournal {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rebuild a journal from exported entries, rejecting a broken chain.
    pub fn from_entries(entries: Vec<JournalEntry>) -> Result<Self, LendingError> {
        let mut tail: Option<&str> = None;
        for (position, entry) in entries.iter().enumerate() {
            check_link(entry, position as u64, tail)?;
            tail = Some(entry.entry_hash.as_str());
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn head_hash(&self) -> Option<&str> {
        self.entries.last().map(|entry| entry.entry_hash.as_str())
    }

    /// Entries concerning one loan, oldest first.
    pub fn events_for(&self, loan_id: LoanId) -> Vec<&JournalEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.event.loan_id() == loan_id)
            .collect()
    }

    /// True when every entry links to its predecessor and hashes to its stored digest.
    pub fn verify_chain(&self) -> bool {
        let mut tail = None;
        for (position, entry) in self.entries.iter().enumerate() {
            if check_link(entry, position as u64, tail).is_err() {
                return false;
            }
            tail = Some(entry.entry_hash.as_str());
        }
        true
    }

    /// Build the next entry without mutating the chain.
    pub fn build_entry(&self, height: Height, event: LoanEvent) -> Result<JournalEntry, LendingError> {
        let index = self.entries.len() as u64;
        let recorded_at = Utc::now();
        let previous_hash = self.entries.last().map(|entry| entry.entry_hash.clone());
        let entry_hash =
            compute_entry_hash(index, height, recorded_at, &event, previous_hash.as_deref())
                .map_err(|e| LendingError::Journal(format!("hashing entry {index}: {e}")))?;

        Ok(JournalEntry {
            entry_id: Uuid::new_v4().to_string(),
            index,
            height,
            recorded_at,
            event,
            previous_hash,
            entry_hash,
        })
    }

    /// Append an entry produced by [`build_entry`](Self::build_entry).
    ///
    /// The entry must still extend the current head; one built before another
    /// commit landed is refused.
    pub fn commit_entry(&mut self, entry: JournalEntry) -> Result<(), LendingError> {
        check_link(&entry, self.entries.len() as u64, self.head_hash())?;

        debug!(
            index = entry.index,
            event = entry.event.name(),
            loan_id = %entry.event.loan_id(),
            "Journal entry committed"
        );
        self.entries.push(entry);
        Ok(())
    }
}

/// Check that `entry` belongs at `position` right after the entry hashed `tail`.
fn check_link(entry: &JournalEntry, position: u64, tail: Option<&str>) -> Result<(), LendingError> {
    let loan_id = entry.event.loan_id();
    if entry.index != position {
        return Err(LendingError::Journal(format!(
            "{} entry for {loan_id} carries index {} but belongs at {position}",
            entry.event.name(),
            entry.index
        )));
    }
    if entry.previous_hash.as_deref() != tail {
        return Err(LendingError::Journal(format!(
            "{} entry for {loan_id} at {position} does not extend the journal head",
            entry.event.name()
        )));
    }
    let digest = compute_entry_hash(
        entry.index,
        entry.height,
        entry.recorded_at,
        &entry.event,
        entry.previous_hash.as_deref(),
    )
    .map_err(|e| LendingError::Journal(format!("hashing entry {position}: {e}")))?;
    if digest != entry.entry_hash {
        return Err(LendingError::Journal(format!(
            "{} entry for {loan_id} at {position} was altered after it was recorded",
            entry.event.name()
        )));
    }
    Ok(())
}

#[derive(Serialize)]
struct HashMaterial<'a> {
    index: u64,
    height: Height,
    recorded_at: DateTime<Utc>,
    event: &'a LoanEvent,
    previous_hash: Option<&'a str>,
}

fn compute_entry_hash(
    index: u64,
    height: Height,
    recorded_at: DateTime<Utc>,
    event: &LoanEvent,
    previous_hash: Option<&str>,
) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(&HashMaterial {
        index,
        height,
        recorded_at,
        event,
        previous_hash,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
