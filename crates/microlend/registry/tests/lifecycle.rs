//! End-to-end loan lifecycle scenarios against the in-memory collaborators.

use std::sync::Arc;

use microlend_registry::{
    InMemoryBank, LendingError, LoanId, LoanRegistry, LoanStatus, ManualClock, Principal,
    ValueTransfer,
};

const STARTING_BALANCE: u64 = 100_000_000_000_000;

/// Registry plus collaborators; every `mine` call runs in a fresh block.
struct Chain {
    registry: LoanRegistry,
    bank: Arc<InMemoryBank>,
    clock: Arc<ManualClock>,
    wallet_1: Principal,
    wallet_2: Principal,
}

impl Chain {
    fn new() -> Self {
        let wallet_1 = Principal::new("ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5");
        let wallet_2 = Principal::new("ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG");
        let bank = Arc::new(InMemoryBank::with_balances([
            (wallet_1.clone(), STARTING_BALANCE),
            (wallet_2.clone(), STARTING_BALANCE),
        ]));
        let clock = Arc::new(ManualClock::new(0));
        let registry = LoanRegistry::with_defaults(bank.clone(), clock.clone());
        Self {
            registry,
            bank,
            clock,
            wallet_1,
            wallet_2,
        }
    }

    fn mine<T>(&mut self, op: impl FnOnce(&mut LoanRegistry) -> T) -> T {
        self.clock.advance(1);
        op(&mut self.registry)
    }

    fn mine_empty_blocks(&self, count: u64) {
        self.clock.advance(count);
    }

    fn create_default_loan(&mut self) -> Result<LoanId, LendingError> {
        let borrower = self.wallet_1.clone();
        self.mine(|r| r.create_loan(&borrower, 5_000_000, 50, 144, 6_000_000))
    }

    fn fund(&mut self, id: LoanId) -> Result<(), LendingError> {
        let lender = self.wallet_2.clone();
        self.mine(|r| r.fund_loan(&lender, id))
    }

    fn create_and_fund(&mut self) -> LoanId {
        let id = self.create_default_loan().expect("loan created");
        self.fund(id).expect("loan funded");
        id
    }
}

// ── create-loan ─────────────────────────────────────────────────────

#[test]
fn creates_a_loan_with_valid_parameters() {
    let mut chain = Chain::new();
    let id = chain.create_default_loan().expect("loan created");
    assert_eq!(id, LoanId::new(1));

    let loan = chain.registry.get_loan(LoanId::new(1)).expect("loan stored");
    assert_eq!(loan.amount, 5_000_000);
    assert_eq!(loan.borrower, chain.wallet_1);
    assert_eq!(loan.status.as_str(), "CREATED");
}

#[test]
fn rejects_amount_below_minimum() {
    let mut chain = Chain::new();
    let borrower = chain.wallet_1.clone();
    let err = chain
        .mine(|r| r.create_loan(&borrower, 100, 50, 144, 200))
        .unwrap_err();
    assert_eq!(err.code(), 102);
    assert_eq!(chain.registry.loan_count(), 0);
}

#[test]
fn rejects_collateral_beyond_wallet_balance() {
    let mut chain = Chain::new();
    let borrower = chain.wallet_1.clone();
    let err = chain
        .mine(|r| r.create_loan(&borrower, 5_000_000, 50, 144, STARTING_BALANCE + 1))
        .unwrap_err();
    assert!(matches!(err, LendingError::InsufficientBalance { .. }));
    assert_eq!(err.code(), 103);
    assert_eq!(chain.bank.balance_of(&chain.wallet_1), STARTING_BALANCE);
}

#[test]
fn ids_increase_sequentially() {
    let mut chain = Chain::new();
    let ids: Vec<_> = (0..3)
        .map(|_| chain.create_default_loan().expect("loan created"))
        .collect();
    assert_eq!(ids, vec![LoanId::new(1), LoanId::new(2), LoanId::new(3)]);
}

#[test]
fn unknown_loan_reads_as_absent() {
    let chain = Chain::new();
    assert!(chain.registry.get_loan(LoanId::new(42)).is_none());
}

// ── fund-loan ───────────────────────────────────────────────────────

#[test]
fn funds_an_existing_loan() {
    let mut chain = Chain::new();
    let id = chain.create_default_loan().unwrap();
    chain.fund(id).expect("funded");

    let loan = chain.registry.get_loan(id).unwrap();
    assert_eq!(loan.status.as_str(), "ACTIVE");
    assert_eq!(loan.lender.as_ref(), Some(&chain.wallet_2));
    assert_eq!(loan.funded_at, Some(2));
}

#[test]
fn funding_unknown_loan_is_not_found() {
    let mut chain = Chain::new();
    chain.create_default_loan().unwrap();
    let err = chain.fund(LoanId::new(999)).unwrap_err();
    assert_eq!(err, LendingError::NotFound(LoanId::new(999)));
    assert_eq!(err.code(), 101);
}

#[test]
fn funding_twice_is_rejected() {
    let mut chain = Chain::new();
    let id = chain.create_default_loan().unwrap();
    chain.fund(id).unwrap();

    let err = chain.fund(id).unwrap_err();
    assert_eq!(err.code(), 104);
    assert_eq!(
        err,
        LendingError::LoanExists {
            loan_id: id,
            status: LoanStatus::Active
        }
    );
    assert_eq!(
        chain.bank.balance_of(&chain.wallet_2),
        STARTING_BALANCE - 5_000_000
    );
}

// ── repay-loan ──────────────────────────────────────────────────────

#[test]
fn repays_a_loan() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    let borrower = chain.wallet_1.clone();
    chain.mine(|r| r.repay_loan(&borrower, id)).expect("repaid");

    assert_eq!(chain.registry.get_loan(id).unwrap().status.as_str(), "REPAID");
    assert_eq!(
        chain.bank.balance_of(&chain.wallet_2),
        STARTING_BALANCE + 250_000
    );
}

#[test]
fn non_borrower_cannot_repay() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    let lender = chain.wallet_2.clone();
    let err = chain.mine(|r| r.repay_loan(&lender, id)).unwrap_err();
    assert_eq!(err.code(), 105);
    assert_eq!(chain.registry.get_loan(id).unwrap().status, LoanStatus::Active);
}

// ── claim-defaulted-loan ────────────────────────────────────────────

#[test]
fn claims_defaulted_loan_after_duration() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    chain.mine_empty_blocks(145);

    let lender = chain.wallet_2.clone();
    chain
        .mine(|r| r.claim_defaulted_loan(&lender, id))
        .expect("claimed");
    assert_eq!(
        chain.registry.get_loan(id).unwrap().status.as_str(),
        "DEFAULTED"
    );
    assert_eq!(
        chain.bank.balance_of(&chain.wallet_2),
        STARTING_BALANCE - 5_000_000 + 6_000_000
    );
}

#[test]
fn claim_before_duration_is_not_due() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    let lender = chain.wallet_2.clone();
    let err = chain
        .mine(|r| r.claim_defaulted_loan(&lender, id))
        .unwrap_err();
    assert_eq!(err.code(), 106);
    assert_eq!(chain.registry.get_loan(id).unwrap().status, LoanStatus::Active);
}

#[test]
fn non_lender_cannot_claim() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    chain.mine_empty_blocks(145);

    let borrower = chain.wallet_1.clone();
    let err = chain
        .mine(|r| r.claim_defaulted_loan(&borrower, id))
        .unwrap_err();
    assert_eq!(err.code(), 105);
}

#[test]
fn claim_on_unfunded_loan_is_not_active() {
    let mut chain = Chain::new();
    let id = chain.create_default_loan().unwrap();
    chain.mine_empty_blocks(500);
    let lender = chain.wallet_2.clone();
    let err = chain
        .mine(|r| r.claim_defaulted_loan(&lender, id))
        .unwrap_err();
    assert_eq!(err.kind(), "loan-not-active");
}

// ── user-reputation ─────────────────────────────────────────────────

#[test]
fn reputation_rises_after_repayment() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    let borrower = chain.wallet_1.clone();
    chain.mine(|r| r.repay_loan(&borrower, id)).unwrap();

    let record = chain.registry.get_user_reputation(&chain.wallet_1);
    assert_eq!(record.loans_paid, 1);
    assert!(record.lending_score > 50);
}

#[test]
fn reputation_falls_after_default() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    chain.mine_empty_blocks(145);
    let lender = chain.wallet_2.clone();
    chain.mine(|r| r.claim_defaulted_loan(&lender, id)).unwrap();

    let record = chain.registry.get_user_reputation(&chain.wallet_1);
    assert_eq!(record.loans_defaulted, 1);
    assert!(record.lending_score < 50);
}

#[test]
fn reputation_of_unknown_identity_is_default() {
    let chain = Chain::new();
    let record = chain
        .registry
        .get_user_reputation(&Principal::new("nobody"));
    assert_eq!(record.loans_paid, 0);
    assert_eq!(record.loans_defaulted, 0);
    assert_eq!(record.lending_score, 50);
}

#[test]
fn journal_records_full_history() {
    let mut chain = Chain::new();
    let id = chain.create_and_fund();
    chain.mine_empty_blocks(145);
    let lender = chain.wallet_2.clone();
    chain.mine(|r| r.claim_defaulted_loan(&lender, id)).unwrap();

    let journal = chain.registry.journal();
    assert_eq!(journal.len(), 3);
    assert!(journal.verify_chain());
    assert_eq!(journal.entries()[2].height, 148);
}
