//! Entity lookups and identifier generation.

use crate::{
    clock::BankClock,
    entity::Table,
    error::{BankError, BankResult},
    store::{AccountRow, BankStore, CardRow, LoanRow},
    types::{AccountId, CustomerId, TicketId, TxnId},
};
use log::debug;

pub const CUSTOMER_PREFIX: &str = "CUS";
pub const TICKET_PREFIX: &str = "TKT";
pub const TXN_PREFIX: &str = "T";

/// Numbering starts after these when a table holds no prefixed ids yet.
const CUSTOMER_BASE: i64 = 100;
const TICKET_BASE: i64 = 1000;

/// Numeric suffix of `<prefix><digits>`, or None for any other shape.
pub fn parse_prefixed(id: &str, prefix: &str) -> Option<i64> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Highest numeric suffix among `table`'s `<prefix><digits>` keys.
/// Compared as numbers, so `CUS1000` beats `CUS999`.
fn max_suffix(store: &BankStore, table: Table, prefix: &str) -> BankResult<Option<i64>> {
    Ok(store
        .keys_with_prefix(table, prefix)?
        .iter()
        .filter_map(|id| parse_prefixed(id, prefix))
        .max())
}

/// First customer with exactly this name.
pub fn customer_id_by_name(store: &BankStore, name: &str) -> BankResult<CustomerId> {
    store
        .customers_named(name.trim())?
        .into_iter()
        .next()
        .map(|c| c.customer_id)
        .ok_or_else(|| BankError::not_found("customer", name))
}

pub fn require_customer(store: &BankStore, customer_id: &str) -> BankResult<()> {
    match store.customer(customer_id)? {
        Some(_) => Ok(()),
        None => Err(BankError::not_found("customer", customer_id)),
    }
}

pub fn require_account(store: &BankStore, account_id: AccountId) -> BankResult<AccountRow> {
    store
        .account(account_id)?
        .ok_or_else(|| BankError::not_found("account", account_id))
}

/// The account must exist and belong to `customer_id`.
pub fn owned_account(
    store: &BankStore,
    customer_id: &str,
    account_id: AccountId,
) -> BankResult<AccountRow> {
    let account = require_account(store, account_id)?;
    if account.customer_id != customer_id {
        return Err(BankError::invalid(format!(
            "account {account_id} does not belong to customer {customer_id}"
        )));
    }
    Ok(account)
}

pub fn first_account(store: &BankStore, customer_id: &str) -> BankResult<AccountRow> {
    store
        .accounts_for_customer(customer_id)?
        .into_iter()
        .next()
        .ok_or_else(|| BankError::not_found("account for customer", customer_id))
}

pub fn first_loan(store: &BankStore, customer_id: &str) -> BankResult<LoanRow> {
    store
        .loans_for_customer(customer_id)?
        .into_iter()
        .next()
        .ok_or_else(|| BankError::not_found("loan for customer", customer_id))
}

pub fn first_card(store: &BankStore, customer_id: &str) -> BankResult<CardRow> {
    store
        .cards_for_customer(customer_id)?
        .into_iter()
        .next()
        .ok_or_else(|| BankError::not_found("credit card for customer", customer_id))
}

// ── Identifier generation ─────────────────────────────────────────────────

fn successor(prefix: &str, last: i64) -> BankResult<i64> {
    last.checked_add(1).ok_or_else(|| {
        BankError::invalid(format!("{prefix} id sequence exhausted at {prefix}{last}"))
    })
}

pub fn next_customer_id(store: &BankStore) -> BankResult<CustomerId> {
    let last = max_suffix(store, Table::Customers, CUSTOMER_PREFIX)?
        .unwrap_or(CUSTOMER_BASE);
    let id = format!("{CUSTOMER_PREFIX}{}", successor(CUSTOMER_PREFIX, last)?);
    debug!("next customer id {id}");
    Ok(id)
}

pub fn next_ticket_id(store: &BankStore) -> BankResult<TicketId> {
    let last = max_suffix(store, Table::SupportTickets, TICKET_PREFIX)?
        .unwrap_or(TICKET_BASE);
    let id = format!("{TICKET_PREFIX}{}", successor(TICKET_PREFIX, last)?);
    debug!("next ticket id {id}");
    Ok(id)
}

/// `T<unix seconds>`, bumped past the highest existing `T` id so two
/// creates within the same second never collide.
pub fn next_txn_id(store: &BankStore, clock: &BankClock) -> BankResult<TxnId> {
    let now = clock.unix_seconds();
    let n = match max_suffix(store, Table::Transactions, TXN_PREFIX)? {
        Some(last) if last >= now => successor(TXN_PREFIX, last)?,
        _ => now,
    };
    let id = format!("{TXN_PREFIX}{n}");
    debug!("next txn id {id}");
    Ok(id)
}
