//! Audit events: one per committed desk mutation.
//!
//! RULE: events are written after the mutation they describe has
//! committed. A rejected operation leaves no event behind.

use crate::types::{
    AccountId, BranchId, CardId, CustomerId, LoanId, Money, TicketId, TxnId, TxnStatus, TxnType,
};
use serde::{Deserialize, Serialize};

/// Every mutation the desk records.
/// Variants are appended as operations are added, never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    // ── Ledger ─────────────────────────────────────
    TransactionCreated {
        txn_id: TxnId,
        customer_id: CustomerId,
        txn_type: TxnType,
        amount: Money,
        status: TxnStatus,
        balance_after: Money,
    },
    TransactionUpdated {
        txn_id: TxnId,
        old_status: TxnStatus,
        new_status: TxnStatus,
        old_amount: Money,
        new_amount: Money,
        target_value_after: Money,
    },
    TransactionDeleted {
        txn_id: TxnId,
        status: TxnStatus,
    },

    // ── Entity maintenance ─────────────────────────
    CustomerCreated { customer_id: CustomerId, name: String },
    CustomerUpdated { customer_id: CustomerId },
    CustomerDeleted { customer_id: CustomerId },
    BranchCreated { branch_id: BranchId, branch_name: String },
    BranchUpdated { branch_id: BranchId },
    BranchDeleted { branch_id: BranchId },
    AccountOpened { account_id: AccountId, customer_id: CustomerId, opening_balance: Money },
    AccountDeleted { account_id: AccountId },
    LoanCreated { loan_id: LoanId, customer_id: CustomerId, principal: Money },
    LoanUpdated { loan_id: LoanId },
    LoanDeleted { loan_id: LoanId },
    CardIssued { card_id: CardId, customer_id: CustomerId, card_type: String },
    CardUpdated { card_id: CardId },
    CardDeleted { card_id: CardId },
    TicketOpened { ticket_id: TicketId, customer_id: CustomerId },
    TicketUpdated { ticket_id: TicketId, status: String },
    TicketDeleted { ticket_id: TicketId },

    // ── Bulk load ──────────────────────────────────
    SeedLoaded { table: String, rows: usize },
}

impl DeskEvent {
    /// Stable name for the event_type column.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TransactionCreated { .. } => "transaction_created",
            Self::TransactionUpdated { .. } => "transaction_updated",
            Self::TransactionDeleted { .. } => "transaction_deleted",
            Self::CustomerCreated { .. } => "customer_created",
            Self::CustomerUpdated { .. } => "customer_updated",
            Self::CustomerDeleted { .. } => "customer_deleted",
            Self::BranchCreated { .. } => "branch_created",
            Self::BranchUpdated { .. } => "branch_updated",
            Self::BranchDeleted { .. } => "branch_deleted",
            Self::AccountOpened { .. } => "account_opened",
            Self::AccountDeleted { .. } => "account_deleted",
            Self::LoanCreated { .. } => "loan_created",
            Self::LoanUpdated { .. } => "loan_updated",
            Self::LoanDeleted { .. } => "loan_deleted",
            Self::CardIssued { .. } => "card_issued",
            Self::CardUpdated { .. } => "card_updated",
            Self::CardDeleted { .. } => "card_deleted",
            Self::TicketOpened { .. } => "ticket_opened",
            Self::TicketUpdated { .. } => "ticket_updated",
            Self::TicketDeleted { .. } => "ticket_deleted",
            Self::SeedLoaded { .. } => "seed_loaded",
        }
    }

    /// Which component produced the event.
    pub fn component(&self) -> &'static str {
        match self {
            Self::TransactionCreated { .. }
            | Self::TransactionUpdated { .. }
            | Self::TransactionDeleted { .. } => "ledger",
            Self::SeedLoaded { .. } => "seed",
            _ => "crud",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub session_id: String,
    pub occurred_at: String,
    pub component: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized DeskEvent
}
