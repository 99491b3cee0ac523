//! Integration tests for reference-table maintenance.
//!
//! Tests verify:
//! 1. Sequential customer and ticket ids
//! 2. Duplicate and validation rules on create and update
//! 3. Referential integrity on delete
//! 4. The one-valid-card-per-type rule
//! 5. CRUD never writes balances

use banksight_core::{
    clock::BankClock,
    config::DeskConfig,
    crud::{
        account::AccountForm,
        branch::{BranchForm, BranchPatch},
        credit_card::{CardForm, CardPatch},
        customer::{CustomerForm, CustomerPatch},
        loan::{LoanForm, LoanPatch},
        support_ticket::{TicketForm, TicketUpdate},
        Crud,
    },
    error::BankError,
    rng::CardRng,
    store::BankStore,
    types::{
        AccountId, CardNetwork, CardStatus, CardType, CustomerAccountType, Gender,
        IssueCategory, LoanStatus, LoanType, TicketChannel, TicketPriority, TicketStatus,
    },
};

struct Fixture {
    store: BankStore,
    clock: BankClock,
    config: DeskConfig,
}

fn setup() -> Fixture {
    let store = BankStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    Fixture {
        store,
        clock: BankClock::fixed("2025-03-10", "10:00:00"),
        config: DeskConfig::default_test(),
    }
}

impl Fixture {
    fn crud(&self) -> Crud<'_> {
        Crud::new(&self.store, &self.clock, &self.config)
    }
}

fn customer_form(name: &str, phone: Option<&str>) -> CustomerForm {
    CustomerForm {
        name: name.into(),
        phone: phone.map(str::to_string),
        gender: Gender::Male,
        age: 34,
        city: Some("Pune".into()),
        account_type: CustomerAccountType::Current,
    }
}

fn branch_form(name: &str) -> BranchForm {
    BranchForm {
        branch_name: name.into(),
        city: Some("Pune".into()),
        manager_name: Some("R. Iyer".into()),
        total_employees: 12,
        branch_revenue: 250_000.0,
        opening_date: Some("2019-06-01".into()),
        performance_rating: 3,
    }
}

fn card_form(customer_id: &str, account_id: AccountId, card_type: CardType) -> CardForm {
    CardForm {
        customer_id: customer_id.into(),
        account_id,
        branch_name: None,
        card_type,
        card_network: CardNetwork::MasterCard,
        credit_limit: 100_000.0,
        status: CardStatus::Active,
    }
}

fn loan_form(customer_id: &str, branch: &str) -> LoanForm {
    LoanForm {
        customer_id: customer_id.into(),
        branch_name: branch.into(),
        account_id: None,
        loan_type: LoanType::Home,
        loan_amount: 2_500_000.0,
        interest_rate: 8.25,
        term_months: 240,
        status: LoanStatus::Active,
        start_date: Some("2024-01-31".into()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Customers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn customer_ids_are_sequential_from_cus101() {
    let fx = setup();
    let (a, ev) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (b, _) = fx.crud().create_customer(&customer_form("Bala", None)).unwrap();
    assert_eq!(a.customer_id, "CUS101");
    assert_eq!(b.customer_id, "CUS102");
    assert_eq!(a.join_date.as_deref(), Some("2025-03-10"));
    assert_eq!(ev.event_type(), "customer_created");
}

#[test]
fn duplicate_identity_is_rejected() {
    let fx = setup();
    fx.crud()
        .create_customer(&customer_form("Asha", Some("9876543210")))
        .unwrap();
    let err = fx
        .crud()
        .create_customer(&customer_form("Asha", Some("9876543210")))
        .unwrap_err();
    assert!(matches!(err, BankError::DuplicateEntity { .. }));

    // A different phone is a different identity.
    fx.crud()
        .create_customer(&customer_form("Asha", Some("9876543211")))
        .unwrap();
    assert_eq!(fx.crud().find_customers("Asha").unwrap().len(), 2);
}

#[test]
fn customer_validation() {
    let fx = setup();
    let mut minor = customer_form("Teen", None);
    minor.age = 17;
    assert!(matches!(
        fx.crud().create_customer(&minor).unwrap_err(),
        BankError::ValidationError(_)
    ));
    assert!(matches!(
        fx.crud().create_customer(&customer_form("  ", None)).unwrap_err(),
        BankError::ValidationError(_)
    ));
    assert!(matches!(
        fx.crud()
            .create_customer(&customer_form("Asha", Some("12345")))
            .unwrap_err(),
        BankError::ValidationError(_)
    ));
    assert!(fx.crud().customers().unwrap().is_empty());
}

#[test]
fn customer_patch_keeps_untouched_fields() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let patch = CustomerPatch {
        city: Some("Madurai".into()),
        age: Some(41),
        ..CustomerPatch::default()
    };
    let (updated, _) = fx.crud().update_customer(&c.customer_id, &patch).unwrap();
    assert_eq!(updated.city.as_deref(), Some("Madurai"));
    assert_eq!(updated.age, Some(41));
    assert_eq!(updated.name, "Asha");
    assert_eq!(updated.join_date, c.join_date);
    assert_eq!(fx.crud().customer(&c.customer_id).unwrap(), updated);
}

#[test]
fn deleting_a_customer_with_a_loan_is_an_integrity_error() {
    let fx = setup();
    fx.crud().create_branch(&branch_form("Pune Camp")).unwrap();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    fx.crud().create_loan(&loan_form(&c.customer_id, "Pune Camp")).unwrap();

    let err = fx.crud().delete_customer(&c.customer_id).unwrap_err();
    assert!(matches!(err, BankError::IntegrityError(_)), "got {err:?}");
    assert!(fx.store.customer(&c.customer_id).unwrap().is_some());
}

#[test]
fn deleting_a_customer_takes_their_accounts() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (acct, _) = fx
        .crud()
        .create_account(&AccountForm { customer_id: c.customer_id.clone(), opening_balance: 500.0 })
        .unwrap();

    fx.crud().delete_customer(&c.customer_id).unwrap();
    assert!(fx.store.account(acct.account_id).unwrap().is_none());
    assert!(matches!(
        fx.crud().delete_customer(&c.customer_id).unwrap_err(),
        BankError::NotFound { .. }
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Branches and accounts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn branch_names_are_unique() {
    let fx = setup();
    let (b, _) = fx.crud().create_branch(&branch_form("Pune Camp")).unwrap();
    assert_eq!(b.opening_date.as_deref(), Some("2019-06-01"));
    assert!(matches!(
        fx.crud().create_branch(&branch_form("Pune Camp")).unwrap_err(),
        BankError::DuplicateEntity { .. }
    ));

    let (other, _) = fx.crud().create_branch(&branch_form("Kothrud")).unwrap();
    let rename = BranchPatch { branch_name: Some("Pune Camp".into()), ..BranchPatch::default() };
    assert!(matches!(
        fx.crud().update_branch(other.branch_id, &rename).unwrap_err(),
        BankError::DuplicateEntity { .. }
    ));
}

#[test]
fn branch_rating_must_be_one_to_five() {
    let fx = setup();
    let mut form = branch_form("Pune Camp");
    form.performance_rating = 6;
    assert!(matches!(
        fx.crud().create_branch(&form).unwrap_err(),
        BankError::ValidationError(_)
    ));
}

#[test]
fn accounts_open_with_their_opening_balance() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (acct, _) = fx
        .crud()
        .create_account(&AccountForm { customer_id: c.customer_id.clone(), opening_balance: 2500.456 })
        .unwrap();
    assert_eq!(acct.balance, 2500.46);
    assert_eq!(acct.last_updated.as_deref(), Some("2025-03-10"));

    let err = fx
        .crud()
        .create_account(&AccountForm { customer_id: "CUS999".into(), opening_balance: 0.0 })
        .unwrap_err();
    assert!(matches!(err, BankError::NotFound { .. }));
    assert_eq!(fx.crud().accounts_for(&c.customer_id).unwrap().len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Loans
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn loan_end_date_follows_the_term() {
    let fx = setup();
    fx.crud().create_branch(&branch_form("Pune Camp")).unwrap();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (loan, _) = fx.crud().create_loan(&loan_form(&c.customer_id, "Pune Camp")).unwrap();
    assert_eq!(loan.start_date.as_deref(), Some("2024-01-31"));
    assert_eq!(loan.end_date.as_deref(), Some("2044-01-31"));
    assert_eq!(loan.principal, 2_500_000.0);

    let patch = LoanPatch { term_months: Some(1), ..LoanPatch::default() };
    let (updated, _) = fx.crud().update_loan(loan.loan_id, &patch).unwrap();
    assert_eq!(updated.end_date.as_deref(), Some("2024-02-29"));
    assert_eq!(updated.principal, 2_500_000.0);
}

#[test]
fn loan_needs_an_existing_branch() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let err = fx.crud().create_loan(&loan_form(&c.customer_id, "Nowhere")).unwrap_err();
    assert!(matches!(err, BankError::NotFound { .. }));
    assert!(fx.crud().loans().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Credit cards
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn one_valid_card_per_type() {
    let fx = setup();
    let mut rng = CardRng::new(11);
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (acct, _) = fx
        .crud()
        .create_account(&AccountForm { customer_id: c.customer_id.clone(), opening_balance: 0.0 })
        .unwrap();

    let (gold, _) = fx
        .crud()
        .create_card(
            &card_form(&c.customer_id, acct.account_id, CardType::Gold),
            &rng.card_number(CardNetwork::MasterCard),
        )
        .unwrap();
    assert_eq!(gold.current_balance, 0.0);
    assert_eq!(gold.issued_date.as_deref(), Some("2025-03-10"));
    assert_eq!(gold.expiry_date.as_deref(), Some("2040-03-10"));

    let err = fx
        .crud()
        .create_card(
            &card_form(&c.customer_id, acct.account_id, CardType::Gold),
            &rng.card_number(CardNetwork::MasterCard),
        )
        .unwrap_err();
    assert!(matches!(err, BankError::DuplicateEntity { .. }));

    // A different type is fine.
    fx.crud()
        .create_card(
            &card_form(&c.customer_id, acct.account_id, CardType::Silver),
            &rng.card_number(CardNetwork::MasterCard),
        )
        .unwrap();

    // Blocking the gold card frees the slot.
    let block = CardPatch { status: Some(CardStatus::Blocked), ..CardPatch::default() };
    fx.crud().update_card(gold.card_id, &block).unwrap();
    fx.crud()
        .create_card(
            &card_form(&c.customer_id, acct.account_id, CardType::Gold),
            &rng.card_number(CardNetwork::MasterCard),
        )
        .unwrap();

    // Unblocking would now give two valid gold cards.
    let unblock = CardPatch { status: Some(CardStatus::Active), ..CardPatch::default() };
    assert!(matches!(
        fx.crud().update_card(gold.card_id, &unblock).unwrap_err(),
        BankError::DuplicateEntity { .. }
    ));
    assert_eq!(fx.crud().cards_for(&c.customer_id).unwrap().len(), 3);
}

#[test]
fn card_number_must_pass_luhn() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (acct, _) = fx
        .crud()
        .create_account(&AccountForm { customer_id: c.customer_id.clone(), opening_balance: 0.0 })
        .unwrap();
    let err = fx
        .crud()
        .create_card(
            &card_form(&c.customer_id, acct.account_id, CardType::Gold),
            "4111111111111112",
        )
        .unwrap_err();
    assert!(matches!(err, BankError::ValidationError(_)));
}

#[test]
fn account_with_a_card_cannot_be_deleted() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (acct, _) = fx
        .crud()
        .create_account(&AccountForm { customer_id: c.customer_id.clone(), opening_balance: 0.0 })
        .unwrap();
    let (card, _) = fx
        .crud()
        .create_card(
            &card_form(&c.customer_id, acct.account_id, CardType::Platinum),
            "4111111111111111",
        )
        .unwrap();

    assert!(matches!(
        fx.crud().delete_account(acct.account_id).unwrap_err(),
        BankError::IntegrityError(_)
    ));
    fx.crud().delete_card(card.card_id).unwrap();
    fx.crud().delete_account(acct.account_id).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Support tickets
// ─────────────────────────────────────────────────────────────────────────────

fn ticket_form(customer_id: &str, rating: Option<i64>) -> TicketForm {
    TicketForm {
        customer_id: customer_id.into(),
        account_id: None,
        loan_id: None,
        branch_name: None,
        issue_category: IssueCategory::AccountAccess,
        description: Some("Locked out of net banking".into()),
        priority: TicketPriority::High,
        status: TicketStatus::Open,
        support_agent: Some("Priya".into()),
        channel: TicketChannel::Phone,
        customer_rating: rating,
    }
}

#[test]
fn tickets_are_numbered_and_closed() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    let (t1, _) = fx.crud().create_ticket(&ticket_form(&c.customer_id, Some(4))).unwrap();
    let (t2, _) = fx.crud().create_ticket(&ticket_form(&c.customer_id, None)).unwrap();
    assert_eq!(t1.ticket_id, "TKT1001");
    assert_eq!(t2.ticket_id, "TKT1002");
    assert_eq!(t1.date_opened.as_deref(), Some("2025-03-10"));

    let (closed, _) = fx
        .crud()
        .update_ticket(
            &t1.ticket_id,
            &TicketUpdate {
                status: TicketStatus::Closed,
                resolution_remarks: Some("Password reset".into()),
                close_now: true,
            },
        )
        .unwrap();
    assert_eq!(closed.status.as_deref(), Some("Closed"));
    assert_eq!(closed.date_closed.as_deref(), Some("2025-03-10"));
    assert_eq!(closed.resolution_remarks.as_deref(), Some("Password reset"));

    fx.crud().delete_ticket(&t2.ticket_id).unwrap();
    assert_eq!(fx.crud().tickets_for(&c.customer_id).unwrap().len(), 1);
}

#[test]
fn ticket_rating_must_be_one_to_five() {
    let fx = setup();
    let (c, _) = fx.crud().create_customer(&customer_form("Asha", None)).unwrap();
    assert!(matches!(
        fx.crud().create_ticket(&ticket_form(&c.customer_id, Some(0))).unwrap_err(),
        BankError::ValidationError(_)
    ));
    assert!(matches!(
        fx.crud().create_ticket(&ticket_form(&c.customer_id, Some(6))).unwrap_err(),
        BankError::ValidationError(_)
    ));
}
