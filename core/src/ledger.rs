//! Ledger consistency.
//!
//! RULE: a transaction moves money on its target iff its status is
//! Success. The ledger row and the target's balance row are written in
//! one atomic unit, so either both change or neither does.
//!
//! The signed amount actually applied is recorded on the row
//! (`settled_delta`) and is exactly what a later edit reverses.

use crate::{
    clock::BankClock,
    config::{DeskConfig, OverpaymentPolicy},
    error::{BankError, BankResult},
    event::DeskEvent,
    lookup,
    store::{BankStore, TxnRow},
    types::{
        round_cents, AccountId, CardId, CustomerId, LoanId, Money, TxnClass, TxnId, TxnStatus,
        TxnType,
    },
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// The value a transaction settles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Target {
    Account(AccountId),
    Loan(LoanId),
    Card(CardId),
}

/// A teller's request to record a ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxnRequest {
    pub customer_id: CustomerId,
    /// Originating account.
    pub account_id: AccountId,
    pub txn_type: TxnType,
    pub amount: Money,
    pub status: TxnStatus,
    /// Loan a Loan Payment pays; the customer's first loan when absent.
    #[serde(default)]
    pub loan_id: Option<LoanId>,
    /// Card a Credit Payment pays; the customer's first card when absent.
    #[serde(default)]
    pub card_id: Option<CardId>,
}

/// Outcome of a ledger mutation, echoed back to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub txn_id: TxnId,
    pub status: TxnStatus,
    pub target: Target,
    /// Balance, principal or card balance after the operation.
    pub balance: Money,
    /// Signed amount now applied to the target; None unless Success.
    pub applied: Option<Money>,
}

/// Limits every settlement is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerPolicy {
    pub min_balance_floor: Money,
    pub overpayment: OverpaymentPolicy,
}

impl From<&DeskConfig> for LedgerPolicy {
    fn from(config: &DeskConfig) -> Self {
        Self {
            min_balance_floor: config.min_balance_floor,
            overpayment: config.overpayment,
        }
    }
}

impl LedgerPolicy {
    /// Reject a debit that would leave `balance` below the floor.
    pub fn check_floor(&self, account_id: AccountId, balance: Money, amount: Money) -> BankResult<()> {
        if round_cents(balance - amount) < self.min_balance_floor {
            warn!(
                "debit of {amount:.2} on account {account_id} rejected: balance {balance:.2}, floor {:.2}",
                self.min_balance_floor
            );
            return Err(BankError::InsufficientFunds {
                account_id,
                balance,
                amount,
                floor: self.min_balance_floor,
            });
        }
        Ok(())
    }

    /// Signed change a Success transaction of `class` and `amount` makes to
    /// a target currently holding `current`.
    pub fn delta(
        &self,
        class: TxnClass,
        amount: Money,
        current: Money,
        account_id: Option<AccountId>,
    ) -> BankResult<Money> {
        let delta = match class {
            TxnClass::Credit => amount,
            TxnClass::Debit => {
                self.check_floor(account_id.unwrap_or_default(), current, amount)?;
                -amount
            }
            TxnClass::LoanRepayment | TxnClass::CardRepayment => match self.overpayment {
                OverpaymentPolicy::AllowCredit => -amount,
                OverpaymentPolicy::ClampAtZero => -amount.min(current.max(0.0)),
            },
        };
        Ok(round_cents(delta))
    }
}

/// What a Success row applied when it predates `settled_delta`.
pub fn nominal_delta(txn_type: TxnType, amount: Money) -> Money {
    match txn_type.class() {
        TxnClass::Credit => amount,
        _ => -amount,
    }
}

fn require_positive(amount: Money) -> BankResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(BankError::invalid(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    Ok(())
}

pub struct Ledger<'a> {
    store: &'a BankStore,
    clock: &'a BankClock,
    policy: LedgerPolicy,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a BankStore, clock: &'a BankClock, policy: LedgerPolicy) -> Self {
        Self { store, clock, policy }
    }

    // ── Target access ─────────────────────────────────────────────

    fn target_value(&self, target: Target) -> BankResult<Money> {
        match target {
            Target::Account(id) => Ok(lookup::require_account(self.store, id)?.balance),
            Target::Loan(id) => self
                .store
                .loan(id)?
                .map(|l| l.principal)
                .ok_or_else(|| BankError::not_found("loan", id)),
            Target::Card(id) => self
                .store
                .card(id)?
                .map(|c| c.current_balance)
                .ok_or_else(|| BankError::not_found("credit card", id)),
        }
    }

    fn write_target(&self, target: Target, value: Money) -> BankResult<()> {
        match target {
            Target::Account(id) => {
                self.store
                    .set_account_balance(id, value, &self.clock.date_string())
            }
            Target::Loan(id) => self.store.set_loan_principal(id, value),
            Target::Card(id) => self.store.set_card_balance(id, value),
        }
    }

    /// Where an existing row settles. Rows loaded without a reference fall
    /// back to the customer's first account, loan or card. A pinned row
    /// whose target has since been deleted settles nowhere.
    fn resolve_target(&self, txn: &TxnRow) -> BankResult<(Target, bool)> {
        let customer = txn.customer_id.as_str();
        let class = txn.txn_type.class();
        let (pinned, entity) = match class {
            TxnClass::Credit | TxnClass::Debit => (txn.account_id.map(Target::Account), "account"),
            TxnClass::LoanRepayment => (txn.loan_id.map(Target::Loan), "loan"),
            TxnClass::CardRepayment => (txn.card_id.map(Target::Card), "credit card"),
        };
        if let Some(target) = pinned {
            return Ok((target, false));
        }
        if txn.pinned {
            warn!("txn {}: its {entity} no longer exists", txn.txn_id);
            return Err(BankError::not_found(entity, format!("settled by {}", txn.txn_id)));
        }
        let target = match class {
            TxnClass::Credit | TxnClass::Debit => {
                Target::Account(lookup::first_account(self.store, customer)?.account_id)
            }
            TxnClass::LoanRepayment => Target::Loan(lookup::first_loan(self.store, customer)?.loan_id),
            TxnClass::CardRepayment => Target::Card(lookup::first_card(self.store, customer)?.card_id),
        };
        Ok((target, true))
    }

    // ── Create ────────────────────────────────────────────────────

    pub fn create(&self, req: &TxnRequest) -> BankResult<(Settlement, DeskEvent)> {
        require_positive(req.amount)?;
        let amount = round_cents(req.amount);

        self.store.atomically(|store| {
            lookup::require_customer(store, &req.customer_id)?;
            let account = lookup::owned_account(store, &req.customer_id, req.account_id)?;

            let class = req.txn_type.class();
            let status = if req.txn_type.requires_verification() {
                TxnStatus::Pending
            } else {
                req.status
            };

            let (target, loan_id, card_id) = match class {
                TxnClass::Credit | TxnClass::Debit => (Target::Account(account.account_id), None, None),
                TxnClass::LoanRepayment => {
                    let loan = match req.loan_id {
                        Some(id) => store
                            .loan(id)?
                            .filter(|l| l.customer_id == req.customer_id)
                            .ok_or_else(|| BankError::not_found("loan for customer", id))?,
                        None => lookup::first_loan(store, &req.customer_id)?,
                    };
                    (Target::Loan(loan.loan_id), Some(loan.loan_id), None)
                }
                TxnClass::CardRepayment => {
                    let card = match req.card_id {
                        Some(id) => store
                            .card(id)?
                            .filter(|c| c.customer_id == req.customer_id)
                            .ok_or_else(|| BankError::not_found("credit card for customer", id))?,
                        None => lookup::first_card(store, &req.customer_id)?,
                    };
                    (Target::Card(card.card_id), None, Some(card.card_id))
                }
            };

            // Debits are checked whatever status they are logged with.
            if class == TxnClass::Debit {
                self.policy.check_floor(account.account_id, account.balance, amount)?;
            }

            let mut value = self.target_value(target)?;
            let applied = if status == TxnStatus::Success {
                let delta = self.policy.delta(class, amount, value, Some(account.account_id))?;
                value = round_cents(value + delta);
                self.write_target(target, value)?;
                debug!("applied {delta:+.2} to {target:?}, now {value:.2}");
                Some(delta)
            } else {
                None
            };

            let txn_id = lookup::next_txn_id(store, self.clock)?;
            store.insert_txn(&TxnRow {
                txn_id: txn_id.clone(),
                customer_id: req.customer_id.clone(),
                account_id: Some(account.account_id),
                loan_id,
                card_id,
                txn_type: req.txn_type,
                amount,
                txn_time: self.clock.timestamp(),
                status,
                settled_delta: applied,
                pinned: true,
            })?;

            info!(
                "txn {txn_id}: {} {amount:.2} for {} logged {status}",
                req.txn_type, req.customer_id
            );
            let event = DeskEvent::TransactionCreated {
                txn_id: txn_id.clone(),
                customer_id: req.customer_id.clone(),
                txn_type: req.txn_type,
                amount,
                status,
                balance_after: value,
            };
            Ok((
                Settlement { txn_id, status, target, balance: value, applied },
                event,
            ))
        })
    }

    // ── Update ────────────────────────────────────────────────────

    /// Reverse whatever the row applied, then apply the new status and
    /// amount. Success rows may be edited; the reversal keeps the ledger
    /// consistent.
    pub fn update(
        &self,
        txn_id: &str,
        new_status: TxnStatus,
        new_amount: Money,
    ) -> BankResult<(Settlement, DeskEvent)> {
        require_positive(new_amount)?;
        let new_amount = round_cents(new_amount);

        self.store.atomically(|store| {
            let txn = store
                .txn(txn_id)?
                .ok_or_else(|| BankError::not_found("transaction", txn_id))?;
            let (target, legacy) = self.resolve_target(&txn)?;
            let mut value = self.target_value(target)?;
            let before = value;

            if txn.status == TxnStatus::Success {
                let reversed = txn
                    .settled_delta
                    .unwrap_or_else(|| nominal_delta(txn.txn_type, txn.amount));
                value = round_cents(value - reversed);
                debug!("reversed {reversed:+.2} on {target:?}, now {value:.2}");
            }

            let applied = if new_status == TxnStatus::Success {
                let account_id = match target {
                    Target::Account(id) => Some(id),
                    _ => None,
                };
                let delta = self
                    .policy
                    .delta(txn.txn_type.class(), new_amount, value, account_id)?;
                value = round_cents(value + delta);
                debug!("applied {delta:+.2} to {target:?}, now {value:.2}");
                Some(delta)
            } else {
                None
            };

            if value != before {
                self.write_target(target, value)?;
            }
            if legacy {
                let (a, l, c) = match target {
                    Target::Account(id) => (Some(id), txn.loan_id, txn.card_id),
                    Target::Loan(id) => (txn.account_id, Some(id), txn.card_id),
                    Target::Card(id) => (txn.account_id, txn.loan_id, Some(id)),
                };
                store.pin_txn_target(txn_id, a, l, c)?;
            }
            store.update_txn_settlement(
                txn_id,
                new_status,
                new_amount,
                &self.clock.timestamp(),
                applied,
            )?;

            info!(
                "txn {txn_id}: {} {:.2} -> {new_status} {new_amount:.2}, {target:?} now {value:.2}",
                txn.status, txn.amount
            );
            let event = DeskEvent::TransactionUpdated {
                txn_id: txn_id.to_string(),
                old_status: txn.status,
                new_status,
                old_amount: txn.amount,
                new_amount,
                target_value_after: value,
            };
            Ok((
                Settlement {
                    txn_id: txn_id.to_string(),
                    status: new_status,
                    target,
                    balance: value,
                    applied,
                },
                event,
            ))
        })
    }

    // ── Delete ────────────────────────────────────────────────────

    /// Remove a Pending or Failed row. Settled rows stay; a missing row,
    /// including one already deleted, is NotFound.
    pub fn delete(&self, txn_id: &str) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            let txn = store
                .txn(txn_id)?
                .ok_or_else(|| BankError::not_found("transaction", txn_id))?;
            if txn.status == TxnStatus::Success {
                warn!("refusing to delete settled txn {txn_id}");
                return Err(BankError::invalid(format!(
                    "transaction {txn_id} is Success; only Pending or Failed transactions can be deleted"
                )));
            }
            if store.delete_txn(txn_id)? == 0 {
                return Err(BankError::not_found("transaction", txn_id));
            }
            info!("txn {txn_id} ({}) deleted", txn.status);
            Ok(DeskEvent::TransactionDeleted {
                txn_id: txn_id.to_string(),
                status: txn.status,
            })
        })
    }

    // ── Candidates ────────────────────────────────────────────────

    /// Pending and Failed entries: the rows offered for edit or delete.
    pub fn editable_transactions(&self, customer_id: &str) -> BankResult<Vec<TxnRow>> {
        lookup::require_customer(self.store, customer_id)?;
        self.store
            .txns_for_customer(customer_id, &[TxnStatus::Pending, TxnStatus::Failed])
    }
}
