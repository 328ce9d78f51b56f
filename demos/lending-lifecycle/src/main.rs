#![deny(unsafe_code)]
//! Loan lifecycle walkthrough.
//!
//! 1. **Repayment path**: create, fund, repay; the borrower's score rises
//! 2. **Default path**: create, fund, let the loan mature, lender claims collateral
//! 3. **Rejections**: every guard returns a typed error with a stable code
//! 4. **Journal**: hash-chained history of the committed transitions
//!
//! Usage: `lending-lifecycle [--json] [config.json]`. Loan sizes scale with
//! the configured minimum principal. `--json` prints the exported journal.
//! Set `RUST_LOG=debug` for settlement and reputation detail.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use microlend_registry::{
    InMemoryBank, LendingConfig, LendingError, LoanId, LoanRegistry, ManualClock, Principal,
    ValueTransfer,
};
use tracing_subscriber::EnvFilter;

fn header(title: &str) {
    println!();
    println!("{}", "═".repeat(72).cyan());
    println!("  {}", title.cyan().bold());
    println!("{}", "═".repeat(72).cyan());
}

fn show_loan(registry: &LoanRegistry, id: LoanId) {
    match registry.get_loan(id) {
        Some(loan) => println!(
            "  {} {} status={} borrower={} lender={} funded_at={}",
            "├".dimmed(),
            id.to_string().yellow(),
            loan.status.as_str().green(),
            loan.borrower,
            loan.lender
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".into()),
            loan.funded_at
                .map(|h| h.to_string())
                .unwrap_or_else(|| "-".into()),
        ),
        None => println!("  {} {} not found", "├".dimmed(), id),
    }
}

fn show_balances(bank: &InMemoryBank, accounts: &[&Principal]) {
    for account in accounts {
        println!(
            "  {}   {:<20} {}",
            "│".dimmed(),
            account.to_string(),
            bank.balance_of(account).to_string().yellow()
        );
    }
}

fn show_rejection(label: &str, result: Result<(), LendingError>) {
    match result {
        Ok(()) => println!("  {} {}: {}", "├".dimmed(), label, "unexpectedly accepted".red()),
        Err(err) => println!(
            "  {} {}: {} ({} / u{})",
            "├".dimmed(),
            label,
            err.to_string().red(),
            err.kind(),
            err.code()
        ),
    }
}

struct Options {
    config_path: Option<String>,
    print_json: bool,
}

fn parse_args() -> Options {
    let mut options = Options {
        config_path: None,
        print_json: false,
    };
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            options.print_json = true;
        } else {
            options.config_path = Some(arg);
        }
    }
    options
}

fn load_config(path: Option<&str>) -> Result<LendingConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            LendingConfig::from_json_str(&raw).with_context(|| format!("parsing {path}"))
        }
        None => Ok(LendingConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let options = parse_args();
    let config = load_config(options.config_path.as_deref())?;
    run(config, options.print_json)
}

fn run(config: LendingConfig, print_json: bool) -> Result<()> {
    // Every loan in the walkthrough is a multiple of the smallest accepted principal.
    let unit = config.min_loan_amount;
    let units = |n: u64| unit.saturating_mul(n);

    let alice = Principal::new("alice");
    let bob = Principal::new("bob");
    let carol = Principal::new("carol");

    let bank = Arc::new(InMemoryBank::with_balances([
        (alice.clone(), units(20)),
        (bob.clone(), units(20)),
        (carol.clone(), units(1)),
    ]));
    let clock = Arc::new(ManualClock::new(1));
    let mut registry = LoanRegistry::new(config, bank.clone(), clock.clone())?;
    let escrow = registry.escrow_account().clone();

    // ── Part 1: repayment ───────────────────────────────────────────
    header("Part 1: Create → Fund → Repay");

    let first = registry.create_loan(&alice, units(5), 50, 144, units(6))?;
    show_loan(&registry, first);
    clock.advance(1);
    registry.fund_loan(&bob, first)?;
    show_loan(&registry, first);
    println!(
        "  {} repayment due: {}",
        "├".dimmed(),
        registry
            .repayment_due(first)
            .unwrap_or_default()
            .to_string()
            .yellow()
    );
    clock.advance(10);
    registry.repay_loan(&alice, first)?;
    show_loan(&registry, first);
    show_balances(&bank, &[&alice, &bob, &escrow]);
    let record = registry.get_user_reputation(&alice);
    println!(
        "  {} alice: paid={} defaulted={} score={} tier={:?}",
        "└".dimmed(),
        record.loans_paid,
        record.loans_defaulted,
        record.lending_score.to_string().green(),
        registry.lending_tier(&alice)
    );

    // ── Part 2: default ─────────────────────────────────────────────
    header("Part 2: Create → Fund → Mature → Claim");

    let second = registry.create_loan(&alice, units(2), 100, 20, units(3))?;
    clock.advance(1);
    registry.fund_loan(&bob, second)?;
    println!(
        "  {} matures at height {}",
        "├".dimmed(),
        registry
            .maturity_height(second)
            .unwrap_or_default()
            .to_string()
            .yellow()
    );
    show_rejection("early claim", registry.claim_defaulted_loan(&bob, second));
    clock.advance(21);
    registry.claim_defaulted_loan(&bob, second)?;
    show_loan(&registry, second);
    show_balances(&bank, &[&alice, &bob, &escrow]);
    let record = registry.get_user_reputation(&alice);
    println!(
        "  {} alice: paid={} defaulted={} score={} tier={:?}",
        "└".dimmed(),
        record.loans_paid,
        record.loans_defaulted,
        record.lending_score.to_string().red(),
        registry.lending_tier(&alice)
    );

    // ── Part 3: guards ──────────────────────────────────────────────
    header("Part 3: Rejected operations");

    show_rejection(
        "principal below minimum",
        registry
            .create_loan(&alice, unit.saturating_sub(1), 50, 144, units(2))
            .map(|_| ()),
    );
    show_rejection(
        "collateral beyond balance",
        registry
            .create_loan(&carol, units(5), 50, 144, units(6))
            .map(|_| ()),
    );
    show_rejection("fund unknown loan", registry.fund_loan(&bob, LoanId::new(999)));
    show_rejection("fund repaid loan", registry.fund_loan(&bob, first));
    let third = registry.create_loan(&bob, unit, 50, 10, unit + unit / 2)?;
    show_rejection("repay unfunded loan", registry.repay_loan(&bob, third));
    clock.advance(1);
    registry.fund_loan(&alice, third)?;
    show_rejection("repay by non-borrower", registry.repay_loan(&carol, third));

    // ── Part 4: journal ─────────────────────────────────────────────
    header("Part 4: Journal");

    for entry in registry.journal().entries() {
        println!(
            "  {} #{:<2} h={:<4} {:<15} {} {}",
            "├".dimmed(),
            entry.index,
            entry.height,
            entry.event.name(),
            entry.event.loan_id(),
            entry.entry_hash[..16].dimmed()
        );
    }
    println!(
        "  {} chain verified: {}",
        "└".dimmed(),
        if registry.journal().verify_chain() {
            "yes".green()
        } else {
            "NO".red()
        }
    );

    if print_json {
        let exported = serde_json::to_string_pretty(registry.journal().entries())
            .context("serializing journal")?;
        println!();
        println!("{exported}");
    }

    println!();
    Ok(())
}
