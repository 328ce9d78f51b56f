use std::collections::BTreeMap;
use std::sync::Arc;

use microlend_reputation::ReputationLedger;
use microlend_types::{Height, LendingTier, Loan, LoanId, LoanStatus, Principal, ReputationRecord};
use tracing::{error, info, warn};

use crate::config::LendingConfig;
use crate::env::{HeightClock, ValueTransfer};
use crate::error::LendingError;
use crate::journal::{JournalEntry, LendingJournal, LoanEvent};
use crate::settlement::{self, SettledLegs, TransferLeg};

/// Owner of every loan and of the borrowers' reputation records.
///
/// Operations run one at a time (`&mut self`). Each one checks all of its
/// preconditions against current state first, then moves value, then
/// records the new loan state. A rejected call changes nothing: no loan,
/// balance, reputation record or journal entry.
pub struct LoanRegistry {
    config: LendingConfig,
    escrow: Principal,
    bank: Arc<dyn ValueTransfer>,
    clock: Arc<dyn HeightClock>,
    loans: BTreeMap<LoanId, Loan>,
    last_loan_id: u64,
    reputation: ReputationLedger,
    journal: LendingJournal,
}

impl LoanRegistry {
    /// Create an empty registry after validating `config`.
    pub fn new(
        config: LendingConfig,
        bank: Arc<dyn ValueTransfer>,
        clock: Arc<dyn HeightClock>,
    ) -> Result<Self, LendingError> {
        config.validate()?;
        let reputation = ReputationLedger::new(config.reputation.clone())?;
        Ok(Self::from_parts(config, reputation, bank, clock))
    }

    /// Create an empty registry with the default settings.
    pub fn with_defaults(bank: Arc<dyn ValueTransfer>, clock: Arc<dyn HeightClock>) -> Self {
        Self::from_parts(
            LendingConfig::default(),
            ReputationLedger::default(),
            bank,
            clock,
        )
    }

    fn from_parts(
        config: LendingConfig,
        reputation: ReputationLedger,
        bank: Arc<dyn ValueTransfer>,
        clock: Arc<dyn HeightClock>,
    ) -> Self {
        let escrow = config.escrow_principal();
        info!(
            escrow = %escrow,
            min_loan_amount = config.min_loan_amount,
            rate_denominator = config.rate_denominator,
            "Loan registry initialized"
        );
        Self {
            config,
            escrow,
            bank,
            clock,
            loans: BTreeMap::new(),
            last_loan_id: 0,
            reputation,
            journal: LendingJournal::new(),
        }
    }

    // ── Mutating operations ─────────────────────────────────────────

    /// Post a loan request, escrowing `collateral` from `caller`.
    pub fn create_loan(
        &mut self,
        caller: &Principal,
        amount: u64,
        interest_rate: u64,
        duration: u64,
        collateral: u64,
    ) -> Result<LoanId, LendingError> {
        self.try_create(caller, amount, interest_rate, duration, collateral)
            .inspect_err(|err| {
                warn!(
                    caller = %caller,
                    amount,
                    collateral,
                    code = err.code(),
                    error = %err,
                    "Loan creation rejected"
                )
            })
    }

    /// Fund a `Created` loan: `caller` pays the principal to the borrower
    /// and becomes the lender.
    pub fn fund_loan(&mut self, caller: &Principal, loan_id: LoanId) -> Result<(), LendingError> {
        self.try_fund(caller, loan_id).inspect_err(|err| {
            warn!(
                loan_id = %loan_id,
                caller = %caller,
                code = err.code(),
                error = %err,
                "Loan funding rejected"
            )
        })
    }

    /// Repay an `Active` loan in full and release the collateral.
    pub fn repay_loan(&mut self, caller: &Principal, loan_id: LoanId) -> Result<(), LendingError> {
        self.try_repay(caller, loan_id).inspect_err(|err| {
            warn!(
                loan_id = %loan_id,
                caller = %caller,
                code = err.code(),
                error = %err,
                "Loan repayment rejected"
            )
        })
    }

    /// Seize the collateral of a matured, unpaid loan.
    pub fn claim_defaulted_loan(
        &mut self,
        caller: &Principal,
        loan_id: LoanId,
    ) -> Result<(), LendingError> {
        self.try_claim(caller, loan_id).inspect_err(|err| {
            warn!(
                loan_id = %loan_id,
                caller = %caller,
                code = err.code(),
                error = %err,
                "Default claim rejected"
            )
        })
    }

    // ── Read-only queries ───────────────────────────────────────────

    /// Owned snapshot of a loan.
    pub fn get_loan(&self, loan_id: LoanId) -> Option<Loan> {
        self.loans.get(&loan_id).cloned()
    }

    /// Number of loans ever created; also the most recent id.
    pub fn loan_count(&self) -> u64 {
        self.last_loan_id
    }

    /// Principal plus interest owed on a loan.
    pub fn repayment_due(&self, loan_id: LoanId) -> Option<u64> {
        self.loans
            .get(&loan_id)
            .and_then(|loan| self.compute_repayment(loan.amount, loan.interest_rate))
    }

    /// Height from which the lender may claim; `None` until funded.
    pub fn maturity_height(&self, loan_id: LoanId) -> Option<Height> {
        self.loans.get(&loan_id).and_then(Loan::maturity_height)
    }

    pub fn loans_by_borrower(&self, borrower: &Principal) -> Vec<Loan> {
        self.loans
            .values()
            .filter(|loan| loan.is_borrower(borrower))
            .cloned()
            .collect()
    }

    pub fn loans_by_lender(&self, lender: &Principal) -> Vec<Loan> {
        self.loans
            .values()
            .filter(|loan| loan.is_lender(lender))
            .cloned()
            .collect()
    }

    pub fn get_user_reputation(&self, who: &Principal) -> ReputationRecord {
        self.reputation.get_user_reputation(who)
    }

    pub fn lending_tier(&self, who: &Principal) -> LendingTier {
        self.reputation.tier(who)
    }

    pub fn reputation(&self) -> &ReputationLedger {
        &self.reputation
    }

    pub fn journal(&self) -> &LendingJournal {
        &self.journal
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn escrow_account(&self) -> &Principal {
        &self.escrow
    }

    pub fn current_height(&self) -> Height {
        self.clock.current_height()
    }

    // ── Transitions ─────────────────────────────────────────────────

    fn try_create(
        &mut self,
        caller: &Principal,
        amount: u64,
        interest_rate: u64,
        duration: u64,
        collateral: u64,
    ) -> Result<LoanId, LendingError> {
        self.ensure_not_escrow(
            caller,
            LoanId::new(self.last_loan_id.saturating_add(1)),
            "create",
        )?;
        if amount < self.config.min_loan_amount {
            return Err(LendingError::invalid_amount(
                amount,
                format!("below minimum {}", self.config.min_loan_amount),
            ));
        }
        self.compute_repayment(amount, interest_rate)
            .ok_or_else(|| LendingError::invalid_amount(amount, "repayment overflows"))?;

        let loan_id = LoanId::new(self.last_loan_id)
            .next()
            .ok_or_else(|| LendingError::Settlement("loan id space exhausted".to_string()))?;

        let legs = [TransferLeg::new(caller, &self.escrow, collateral)];
        settlement::preflight(self.bank.as_ref(), &legs)?;

        let height = self.clock.current_height();
        let entry = self.journal.build_entry(
            height,
            LoanEvent::LoanCreated {
                loan_id,
                borrower: caller.clone(),
                amount,
                interest_rate,
                duration,
                collateral,
            },
        )?;

        let settled = settlement::settle(self.bank.as_ref(), &legs)?;
        self.commit_journal(entry, settled)?;

        self.loans.insert(
            loan_id,
            Loan {
                id: loan_id,
                borrower: caller.clone(),
                lender: None,
                amount,
                interest_rate,
                duration,
                collateral,
                status: LoanStatus::Created,
                funded_at: None,
            },
        );
        self.last_loan_id = loan_id.value();

        info!(
            loan_id = %loan_id,
            borrower = %caller,
            amount,
            interest_rate,
            duration,
            collateral,
            height,
            "Loan created"
        );
        Ok(loan_id)
    }

    fn try_fund(&mut self, caller: &Principal, loan_id: LoanId) -> Result<(), LendingError> {
        self.ensure_not_escrow(caller, loan_id, "fund")?;
        let loan = self.load(loan_id)?;

        if loan.status != LoanStatus::Created {
            return Err(LendingError::LoanExists {
                loan_id,
                status: loan.status,
            });
        }
        if loan.is_borrower(caller) {
            return Err(LendingError::Unauthorized {
                caller: caller.clone(),
                loan_id,
                action: "fund",
            });
        }

        let legs = [TransferLeg::new(caller, &loan.borrower, loan.amount)];
        settlement::preflight(self.bank.as_ref(), &legs)?;

        let height = self.clock.current_height();
        let entry = self.journal.build_entry(
            height,
            LoanEvent::LoanFunded {
                loan_id,
                lender: caller.clone(),
                amount: loan.amount,
                funded_at: height,
            },
        )?;

        let settled = settlement::settle(self.bank.as_ref(), &legs)?;
        self.commit_journal(entry, settled)?;

        let funded = Loan {
            lender: Some(caller.clone()),
            funded_at: Some(height),
            status: LoanStatus::Active,
            ..loan
        };
        info!(
            loan_id = %loan_id,
            borrower = %funded.borrower,
            lender = %caller,
            amount = funded.amount,
            height,
            "Loan funded"
        );
        self.loans.insert(loan_id, funded);
        Ok(())
    }

    fn try_repay(&mut self, caller: &Principal, loan_id: LoanId) -> Result<(), LendingError> {
        self.ensure_not_escrow(caller, loan_id, "repay")?;
        let loan = self.load(loan_id)?;

        if !loan.is_borrower(caller) {
            return Err(LendingError::Unauthorized {
                caller: caller.clone(),
                loan_id,
                action: "repay",
            });
        }
        let lender = Self::active_lender(&loan)?;
        let repayment = self
            .compute_repayment(loan.amount, loan.interest_rate)
            .ok_or_else(|| LendingError::invalid_amount(loan.amount, "repayment overflows"))?;

        let legs = [
            TransferLeg::new(&loan.borrower, &lender, repayment),
            TransferLeg::new(&self.escrow, &loan.borrower, loan.collateral),
        ];
        settlement::preflight(self.bank.as_ref(), &legs)?;

        let height = self.clock.current_height();
        let entry = self.journal.build_entry(
            height,
            LoanEvent::LoanRepaid {
                loan_id,
                borrower: loan.borrower.clone(),
                lender: lender.clone(),
                repayment,
                collateral: loan.collateral,
            },
        )?;

        let settled = settlement::settle(self.bank.as_ref(), &legs)?;
        self.commit_journal(entry, settled)?;

        let record = self.reputation.record_repayment(&loan.borrower);
        info!(
            loan_id = %loan_id,
            borrower = %loan.borrower,
            lender = %lender,
            repayment,
            collateral = loan.collateral,
            score = record.lending_score,
            height,
            "Loan repaid"
        );
        self.loans.insert(
            loan_id,
            Loan {
                status: LoanStatus::Repaid,
                ..loan
            },
        );
        Ok(())
    }

    fn try_claim(&mut self, caller: &Principal, loan_id: LoanId) -> Result<(), LendingError> {
        self.ensure_not_escrow(caller, loan_id, "claim")?;
        let loan = self.load(loan_id)?;
        let lender = Self::active_lender(&loan)?;

        let height = self.clock.current_height();
        let maturity = loan.maturity_height().ok_or(LendingError::LoanNotActive {
            loan_id,
            status: loan.status,
        })?;
        if height < maturity {
            return Err(LendingError::LoanNotDue {
                loan_id,
                maturity,
                current: height,
            });
        }
        if &lender != caller {
            return Err(LendingError::Unauthorized {
                caller: caller.clone(),
                loan_id,
                action: "claim",
            });
        }

        let legs = [TransferLeg::new(&self.escrow, &lender, loan.collateral)];
        settlement::preflight(self.bank.as_ref(), &legs)?;

        let entry = self.journal.build_entry(
            height,
            LoanEvent::LoanDefaulted {
                loan_id,
                borrower: loan.borrower.clone(),
                lender: lender.clone(),
                collateral: loan.collateral,
            },
        )?;

        let settled = settlement::settle(self.bank.as_ref(), &legs)?;
        self.commit_journal(entry, settled)?;

        let record = self.reputation.record_default(&loan.borrower);
        info!(
            loan_id = %loan_id,
            borrower = %loan.borrower,
            lender = %lender,
            collateral = loan.collateral,
            score = record.lending_score,
            height,
            maturity,
            "Defaulted loan claimed"
        );
        self.loans.insert(
            loan_id,
            Loan {
                status: LoanStatus::Defaulted,
                ..loan
            },
        );
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// The escrow account only moves value as a settlement leg, never as a caller.
    fn ensure_not_escrow(
        &self,
        caller: &Principal,
        loan_id: LoanId,
        action: &'static str,
    ) -> Result<(), LendingError> {
        if caller == &self.escrow {
            return Err(LendingError::Unauthorized {
                caller: caller.clone(),
                loan_id,
                action,
            });
        }
        Ok(())
    }

    fn load(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        self.loans
            .get(&loan_id)
            .cloned()
            .ok_or(LendingError::NotFound(loan_id))
    }

    /// Lender of an `Active` loan.
    fn active_lender(loan: &Loan) -> Result<Principal, LendingError> {
        match (&loan.status, &loan.lender) {
            (LoanStatus::Active, Some(lender)) => Ok(lender.clone()),
            _ => Err(LendingError::LoanNotActive {
                loan_id: loan.id,
                status: loan.status,
            }),
        }
    }

    /// `amount + amount * rate / denominator`, truncated; `None` if it does not fit in u64.
    fn compute_repayment(&self, amount: u64, interest_rate: u64) -> Option<u64> {
        let interest =
            u128::from(amount) * u128::from(interest_rate) / u128::from(self.config.rate_denominator);
        u64::try_from(u128::from(amount) + interest).ok()
    }

    fn commit_journal(
        &mut self,
        entry: JournalEntry,
        settled: SettledLegs,
    ) -> Result<(), LendingError> {
        if let Err(err) = self.journal.commit_entry(entry) {
            if let Err(unwind_err) = settled.unwind(self.bank.as_ref()) {
                error!(error = %unwind_err, "Failed to unwind settlement after journal error");
            }
            return Err(err);
        }
        Ok(())
    }
}
