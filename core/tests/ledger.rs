//! Integration tests for ledger consistency.
//!
//! Tests verify:
//! 1. Success rows move their target's balance; Pending/Failed rows never do
//! 2. The minimum-balance floor is inclusive and checked against the
//!    reversed balance on edits
//! 3. Edits reverse exactly what was applied, legacy rows included
//! 4. Failed operations leave no partial writes
//! 5. Loan and card payments settle only on verification

use banksight_core::{
    clock::BankClock,
    config::{DeskConfig, OverpaymentPolicy},
    crud::{
        account::AccountForm, branch::BranchForm, credit_card::CardForm,
        customer::CustomerForm, loan::LoanForm, Crud,
    },
    error::BankError,
    ledger::{Ledger, LedgerPolicy, Target, TxnRequest},
    rng::CardRng,
    store::{BankStore, TxnRow},
    types::{
        AccountId, CardNetwork, CardType, CustomerAccountType, Gender, LoanType, TxnStatus,
        TxnType,
    },
};

struct Bank {
    store: BankStore,
    clock: BankClock,
    config: DeskConfig,
}

impl Bank {
    fn new(config: DeskConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let store = BankStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        let bank = Self {
            store,
            clock: BankClock::fixed("2025-03-10", "10:00:00"),
            config,
        };
        bank.crud()
            .create_branch(&BranchForm {
                branch_name: "Chennai Main".into(),
                city: Some("Chennai".into()),
                manager_name: None,
                total_employees: 20,
                branch_revenue: 1_000_000.0,
                opening_date: None,
                performance_rating: 4,
            })
            .expect("branch");
        bank
    }

    fn crud(&self) -> Crud<'_> {
        Crud::new(&self.store, &self.clock, &self.config)
    }

    fn ledger(&self) -> Ledger<'_> {
        Ledger::new(&self.store, &self.clock, LedgerPolicy::from(&self.config))
    }

    fn customer(&self, name: &str) -> String {
        let (row, _) = self
            .crud()
            .create_customer(&CustomerForm {
                name: name.into(),
                phone: None,
                gender: Gender::Female,
                age: 30,
                city: Some("Chennai".into()),
                account_type: CustomerAccountType::Savings,
            })
            .expect("customer");
        row.customer_id
    }

    fn account(&self, customer_id: &str, opening_balance: f64) -> AccountId {
        let (row, _) = self
            .crud()
            .create_account(&AccountForm {
                customer_id: customer_id.into(),
                opening_balance,
            })
            .expect("account");
        row.account_id
    }

    fn balance(&self, account_id: AccountId) -> f64 {
        self.store.account(account_id).unwrap().unwrap().balance
    }

    fn txn(&self, txn_id: &str) -> Option<TxnRow> {
        self.store.txn(txn_id).unwrap()
    }

    fn txn_count(&self) -> i64 {
        self.store
            .row_count(banksight_core::entity::Table::Transactions)
            .unwrap()
    }
}

fn default_bank() -> Bank {
    Bank::new(DeskConfig::default_test())
}

fn request(customer_id: &str, account_id: AccountId, txn_type: TxnType, amount: f64, status: TxnStatus) -> TxnRequest {
    TxnRequest {
        customer_id: customer_id.into(),
        account_id,
        txn_type,
        amount,
        status,
        loan_id: None,
        card_id: None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn successful_deposit_credits_the_account() {
    let bank = default_bank();
    let asha = bank.customer("Asha");
    let acct = bank.account(&asha, 2000.0);

    let (settlement, _) = bank
        .ledger()
        .create(&request(&asha, acct, TxnType::Deposit, 1000.0, TxnStatus::Success))
        .unwrap();

    assert_eq!(settlement.balance, 3000.0);
    assert_eq!(settlement.applied, Some(1000.0));
    assert_eq!(settlement.target, Target::Account(acct));
    assert_eq!(bank.balance(acct), 3000.0);

    let rows = bank.store.txns_for_customer(&asha, &[]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TxnStatus::Success);
    assert_eq!(rows[0].settled_delta, Some(1000.0));
    assert_eq!(rows[0].account_id, Some(acct));
}

#[test]
fn pending_and_failed_rows_do_not_move_money() {
    let bank = default_bank();
    let c = bank.customer("Ravi");
    let acct = bank.account(&c, 5000.0);

    bank.ledger()
        .create(&request(&c, acct, TxnType::Deposit, 800.0, TxnStatus::Pending))
        .unwrap();
    bank.ledger()
        .create(&request(&c, acct, TxnType::Withdrawal, 800.0, TxnStatus::Failed))
        .unwrap();

    assert_eq!(bank.balance(acct), 5000.0);
    assert_eq!(bank.txn_count(), 2);
}

#[test]
fn withdrawal_below_floor_is_rejected_without_writes() {
    let bank = default_bank();
    let c = bank.customer("Meena");
    let acct = bank.account(&c, 5000.0);

    bank.ledger()
        .create(&request(&c, acct, TxnType::Withdrawal, 3000.0, TxnStatus::Success))
        .unwrap();
    assert_eq!(bank.balance(acct), 2000.0);

    let err = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Withdrawal, 1500.0, TxnStatus::Success))
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }), "got {err:?}");
    assert_eq!(bank.balance(acct), 2000.0);
    assert_eq!(bank.txn_count(), 1);
}

#[test]
fn floor_is_inclusive() {
    let bank = default_bank();
    let c = bank.customer("Kiran");
    let a = bank.account(&c, 5000.0);
    let b = bank.account(&c, 5000.0);

    bank.ledger()
        .create(&request(&c, a, TxnType::Debit, 4000.0, TxnStatus::Success))
        .unwrap();
    assert_eq!(bank.balance(a), 1000.0);

    let err = bank
        .ledger()
        .create(&request(&c, b, TxnType::Debit, 4001.0, TxnStatus::Success))
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }));
    assert_eq!(bank.balance(b), 5000.0);
}

#[test]
fn debit_is_floor_checked_even_when_logged_pending() {
    let bank = default_bank();
    let c = bank.customer("Lata");
    let acct = bank.account(&c, 1500.0);

    let err = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Transfer, 1000.0, TxnStatus::Pending))
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }));
    assert_eq!(bank.txn_count(), 0);
}

#[test]
fn transfer_moves_only_the_origin_account() {
    let bank = default_bank();
    let c = bank.customer("Dev");
    let origin = bank.account(&c, 6000.0);
    let other = bank.account(&c, 6000.0);

    bank.ledger()
        .create(&request(&c, origin, TxnType::Transfer, 2500.0, TxnStatus::Success))
        .unwrap();
    assert_eq!(bank.balance(origin), 3500.0);
    assert_eq!(bank.balance(other), 6000.0);
}

#[test]
fn non_positive_amount_is_a_validation_error() {
    let bank = default_bank();
    let c = bank.customer("Nila");
    let acct = bank.account(&c, 2000.0);

    for amount in [0.0, -10.0] {
        let err = bank
            .ledger()
            .create(&request(&c, acct, TxnType::Deposit, amount, TxnStatus::Success))
            .unwrap_err();
        assert!(matches!(err, BankError::ValidationError(_)));
    }
    assert_eq!(bank.txn_count(), 0);
}

#[test]
fn account_of_another_customer_is_rejected() {
    let bank = default_bank();
    let a = bank.customer("Asha");
    let b = bank.customer("Bala");
    let b_acct = bank.account(&b, 4000.0);

    let err = bank
        .ledger()
        .create(&request(&a, b_acct, TxnType::Deposit, 100.0, TxnStatus::Success))
        .unwrap_err();
    assert!(matches!(err, BankError::ValidationError(_)));
    assert_eq!(bank.balance(b_acct), 4000.0);
}

#[test]
fn unknown_customer_is_not_found() {
    let bank = default_bank();
    let err = bank
        .ledger()
        .create(&request("CUS999", 1, TxnType::Deposit, 100.0, TxnStatus::Success))
        .unwrap_err();
    assert!(matches!(err, BankError::NotFound { .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn success_to_failed_restores_the_balance() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 2000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Deposit, 500.0, TxnStatus::Success))
        .unwrap();
    assert_eq!(bank.balance(acct), 2500.0);

    let (after, _) = bank.ledger().update(&s.txn_id, TxnStatus::Failed, 500.0).unwrap();
    assert_eq!(after.balance, 2000.0);
    assert_eq!(after.applied, None);
    assert_eq!(bank.balance(acct), 2000.0);

    let row = bank.txn(&s.txn_id).unwrap();
    assert_eq!(row.status, TxnStatus::Failed);
    assert_eq!(row.settled_delta, None);
}

#[test]
fn pending_to_success_applies_once() {
    let bank = default_bank();
    let c = bank.customer("Arun");
    let acct = bank.account(&c, 3000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Withdrawal, 700.0, TxnStatus::Pending))
        .unwrap();
    assert_eq!(bank.balance(acct), 3000.0);

    bank.ledger().update(&s.txn_id, TxnStatus::Success, 700.0).unwrap();
    assert_eq!(bank.balance(acct), 2300.0);

    // Same status and amount again: reverse then re-apply, net zero.
    bank.ledger().update(&s.txn_id, TxnStatus::Success, 700.0).unwrap();
    assert_eq!(bank.balance(acct), 2300.0);
}

#[test]
fn floor_on_edit_uses_the_reversed_balance() {
    let bank = default_bank();
    let c = bank.customer("Sara");
    let acct = bank.account(&c, 3000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Withdrawal, 1000.0, TxnStatus::Success))
        .unwrap();
    assert_eq!(bank.balance(acct), 2000.0);

    // 3000 after reversal, minus 2000, lands exactly on the floor.
    bank.ledger().update(&s.txn_id, TxnStatus::Success, 2000.0).unwrap();
    assert_eq!(bank.balance(acct), 1000.0);

    let err = bank
        .ledger()
        .update(&s.txn_id, TxnStatus::Success, 2000.01)
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }));
    assert_eq!(bank.balance(acct), 1000.0);
    assert_eq!(bank.txn(&s.txn_id).unwrap().amount, 2000.0);
}

#[test]
fn rejected_edit_leaves_row_and_balance_untouched() {
    let bank = default_bank();
    let c = bank.customer("Usha");
    let acct = bank.account(&c, 2000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Withdrawal, 500.0, TxnStatus::Pending))
        .unwrap();

    let err = bank
        .ledger()
        .update(&s.txn_id, TxnStatus::Success, 1500.0)
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }));

    let row = bank.txn(&s.txn_id).unwrap();
    assert_eq!(row.status, TxnStatus::Pending);
    assert_eq!(row.amount, 500.0);
    assert_eq!(bank.balance(acct), 2000.0);
}

#[test]
fn update_of_missing_row_is_not_found() {
    let bank = default_bank();
    let err = bank.ledger().update("T1", TxnStatus::Failed, 10.0).unwrap_err();
    assert!(matches!(err, BankError::NotFound { .. }));
}

#[test]
fn legacy_success_row_reverses_nominal_amount_and_gets_pinned() {
    let bank = default_bank();
    let c = bank.customer("Gita");
    let acct = bank.account(&c, 2700.0);

    // A loaded row: Success, no pinned account, no recorded delta.
    bank.store
        .insert_txn(&TxnRow {
            txn_id: "T100".into(),
            customer_id: c.clone(),
            account_id: None,
            loan_id: None,
            card_id: None,
            txn_type: TxnType::Deposit,
            amount: 700.0,
            txn_time: "2024-01-05 09:00:00".into(),
            status: TxnStatus::Success,
            settled_delta: None,
            pinned: false,
        })
        .unwrap();

    bank.ledger().update("T100", TxnStatus::Failed, 700.0).unwrap();
    assert_eq!(bank.balance(acct), 2000.0);
    assert_eq!(bank.txn("T100").unwrap().account_id, Some(acct));
}

#[test]
fn edit_after_account_deleted_touches_no_other_account() {
    let bank = default_bank();
    let c = bank.customer("Hema");
    let first = bank.account(&c, 5000.0);
    let second = bank.account(&c, 5000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, second, TxnType::Deposit, 1000.0, TxnStatus::Success))
        .unwrap();
    assert!(bank.txn(&s.txn_id).unwrap().pinned);
    bank.crud().delete_account(second).unwrap();

    let err = bank
        .ledger()
        .update(&s.txn_id, TxnStatus::Failed, 1000.0)
        .unwrap_err();
    assert!(matches!(err, BankError::NotFound { entity: "account", .. }));
    assert_eq!(bank.balance(first), 5000.0);

    let row = bank.txn(&s.txn_id).unwrap();
    assert_eq!(row.account_id, None);
    assert_eq!(row.status, TxnStatus::Success);
}

#[test]
fn balance_equals_opening_plus_settled_deltas() {
    let bank = default_bank();
    let c = bank.customer("Farah");
    let acct = bank.account(&c, 10_000.0);
    let ledger = bank.ledger();

    let (d1, _) = ledger
        .create(&request(&c, acct, TxnType::Deposit, 1250.5, TxnStatus::Success))
        .unwrap();
    let (w1, _) = ledger
        .create(&request(&c, acct, TxnType::Withdrawal, 3000.0, TxnStatus::Pending))
        .unwrap();
    ledger
        .create(&request(&c, acct, TxnType::Debit, 420.25, TxnStatus::Success))
        .unwrap();
    ledger.update(&w1.txn_id, TxnStatus::Success, 2800.0).unwrap();
    ledger.update(&d1.txn_id, TxnStatus::Success, 1000.0).unwrap();

    let settled: f64 = bank
        .store
        .txns_for_customer(&c, &[TxnStatus::Success])
        .unwrap()
        .iter()
        .filter_map(|t| t.settled_delta)
        .sum();
    let expected = ((10_000.0 + settled) * 100.0_f64).round() / 100.0;
    assert_eq!(bank.balance(acct), expected);
    assert_eq!(bank.balance(acct), 7779.75);
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete and candidates
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn delete_pending_then_delete_again_is_not_found() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 2000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Deposit, 100.0, TxnStatus::Pending))
        .unwrap();
    bank.ledger().delete(&s.txn_id).unwrap();
    assert!(bank.txn(&s.txn_id).is_none());

    let err = bank.ledger().delete(&s.txn_id).unwrap_err();
    assert!(matches!(err, BankError::NotFound { .. }));
    assert_eq!(bank.balance(acct), 2000.0);
}

#[test]
fn success_rows_cannot_be_deleted() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 2000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Deposit, 100.0, TxnStatus::Success))
        .unwrap();
    let err = bank.ledger().delete(&s.txn_id).unwrap_err();
    assert!(matches!(err, BankError::ValidationError(_)));
    assert!(bank.txn(&s.txn_id).is_some());
    assert_eq!(bank.balance(acct), 2100.0);
}

#[test]
fn editable_transactions_excludes_success() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 5000.0);
    let ledger = bank.ledger();

    ledger
        .create(&request(&c, acct, TxnType::Deposit, 100.0, TxnStatus::Success))
        .unwrap();
    let (p, _) = ledger
        .create(&request(&c, acct, TxnType::Deposit, 200.0, TxnStatus::Pending))
        .unwrap();
    let (f, _) = ledger
        .create(&request(&c, acct, TxnType::Deposit, 300.0, TxnStatus::Failed))
        .unwrap();

    let ids: Vec<String> = ledger
        .editable_transactions(&c)
        .unwrap()
        .into_iter()
        .map(|t| t.txn_id)
        .collect();
    assert_eq!(ids, vec![p.txn_id, f.txn_id]);
}

#[test]
fn txn_ids_are_unique_within_one_second() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 5000.0);

    let (a, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Deposit, 1.0, TxnStatus::Pending))
        .unwrap();
    let (b, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::Deposit, 1.0, TxnStatus::Pending))
        .unwrap();
    assert!(a.txn_id.starts_with('T'));
    assert_ne!(a.txn_id, b.txn_id);
}

// ─────────────────────────────────────────────────────────────────────────────
// Loan and card payments
// ─────────────────────────────────────────────────────────────────────────────

fn with_loan(bank: &Bank, principal: f64) -> (String, AccountId, i64) {
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 2000.0);
    let (loan, _) = bank
        .crud()
        .create_loan(&LoanForm {
            customer_id: c.clone(),
            branch_name: "Chennai Main".into(),
            account_id: Some(acct),
            loan_type: LoanType::Personal,
            loan_amount: principal,
            interest_rate: 9.5,
            term_months: 24,
            status: banksight_core::types::LoanStatus::Active,
            start_date: None,
        })
        .unwrap();
    (c, acct, loan.loan_id)
}

#[test]
fn loan_payment_is_forced_pending_and_settles_on_verification() {
    let bank = default_bank();
    let (c, acct, loan_id) = with_loan(&bank, 10_000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::LoanPayment, 4000.0, TxnStatus::Success))
        .unwrap();
    assert_eq!(s.status, TxnStatus::Pending);
    assert_eq!(s.target, Target::Loan(loan_id));
    assert_eq!(bank.store.loan(loan_id).unwrap().unwrap().principal, 10_000.0);

    bank.ledger().update(&s.txn_id, TxnStatus::Success, 4000.0).unwrap();
    assert_eq!(bank.store.loan(loan_id).unwrap().unwrap().principal, 6000.0);
    // Loan payments never touch the account.
    assert_eq!(bank.balance(acct), 2000.0);
}

#[test]
fn loan_overpayment_allows_credit_by_default() {
    let bank = default_bank();
    let (c, acct, loan_id) = with_loan(&bank, 10_000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::LoanPayment, 12_000.0, TxnStatus::Pending))
        .unwrap();
    bank.ledger().update(&s.txn_id, TxnStatus::Success, 12_000.0).unwrap();
    assert_eq!(bank.store.loan(loan_id).unwrap().unwrap().principal, -2000.0);
}

#[test]
fn loan_overpayment_clamps_at_zero_when_configured() {
    let bank = Bank::new(DeskConfig {
        overpayment: OverpaymentPolicy::ClampAtZero,
        ..DeskConfig::default_test()
    });
    let (c, acct, loan_id) = with_loan(&bank, 10_000.0);

    let (s, _) = bank
        .ledger()
        .create(&request(&c, acct, TxnType::LoanPayment, 12_000.0, TxnStatus::Pending))
        .unwrap();
    let (after, _) = bank.ledger().update(&s.txn_id, TxnStatus::Success, 12_000.0).unwrap();
    assert_eq!(after.applied, Some(-10_000.0));
    assert_eq!(bank.store.loan(loan_id).unwrap().unwrap().principal, 0.0);

    // Reversal gives back exactly what was applied.
    bank.ledger().update(&s.txn_id, TxnStatus::Failed, 12_000.0).unwrap();
    assert_eq!(bank.store.loan(loan_id).unwrap().unwrap().principal, 10_000.0);
}

#[test]
fn edit_after_loan_deleted_touches_no_other_loan() {
    let bank = default_bank();
    let (c, acct, first_loan) = with_loan(&bank, 10_000.0);
    let (second_loan, _) = bank
        .crud()
        .create_loan(&LoanForm {
            customer_id: c.clone(),
            branch_name: "Chennai Main".into(),
            account_id: Some(acct),
            loan_type: LoanType::Personal,
            loan_amount: 8000.0,
            interest_rate: 9.5,
            term_months: 12,
            status: banksight_core::types::LoanStatus::Active,
            start_date: None,
        })
        .unwrap();

    let mut req = request(&c, acct, TxnType::LoanPayment, 3000.0, TxnStatus::Pending);
    req.loan_id = Some(second_loan.loan_id);
    let (s, _) = bank.ledger().create(&req).unwrap();
    bank.ledger().update(&s.txn_id, TxnStatus::Success, 3000.0).unwrap();
    bank.crud().delete_loan(second_loan.loan_id).unwrap();

    let err = bank
        .ledger()
        .update(&s.txn_id, TxnStatus::Failed, 3000.0)
        .unwrap_err();
    assert!(matches!(err, BankError::NotFound { entity: "loan", .. }));
    assert_eq!(bank.store.loan(first_loan).unwrap().unwrap().principal, 10_000.0);
    assert_eq!(bank.balance(acct), 2000.0);
}

#[test]
fn loan_payment_without_a_loan_is_not_found() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 2000.0);

    let err = bank
        .ledger()
        .create(&request(&c, acct, TxnType::LoanPayment, 100.0, TxnStatus::Pending))
        .unwrap_err();
    assert!(matches!(err, BankError::NotFound { .. }));
}

#[test]
fn credit_payment_reduces_the_card_balance() {
    let bank = default_bank();
    let c = bank.customer("Asha");
    let acct = bank.account(&c, 2000.0);
    let number = CardRng::new(7).card_number(CardNetwork::Visa);
    let (card, _) = bank
        .crud()
        .create_card(
            &CardForm {
                customer_id: c.clone(),
                account_id: acct,
                branch_name: None,
                card_type: CardType::Gold,
                card_network: CardNetwork::Visa,
                credit_limit: 50_000.0,
                status: banksight_core::types::CardStatus::Active,
            },
            &number,
        )
        .unwrap();
    bank.store.set_card_balance(card.card_id, 500.0).unwrap();

    let mut req = request(&c, acct, TxnType::CreditPayment, 300.0, TxnStatus::Success);
    req.card_id = Some(card.card_id);
    let (s, _) = bank.ledger().create(&req).unwrap();
    assert_eq!(s.status, TxnStatus::Pending);

    bank.ledger().update(&s.txn_id, TxnStatus::Success, 300.0).unwrap();
    assert_eq!(bank.store.card(card.card_id).unwrap().unwrap().current_balance, 200.0);
    assert_eq!(bank.balance(acct), 2000.0);
}
