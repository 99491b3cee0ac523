use crate::{
    crud::{
        account::AccountForm,
        branch::{BranchForm, BranchPatch},
        credit_card::{CardForm, CardPatch},
        customer::{CustomerForm, CustomerPatch},
        loan::{LoanForm, LoanPatch},
        support_ticket::{TicketForm, TicketUpdate},
    },
    entity::{ColumnFilter, Table},
    ledger::TxnRequest,
    report::Report,
    types::{AccountId, BranchId, CardId, CustomerId, LoanId, Money, TicketId, TxnId, TxnStatus},
};
use serde::{Deserialize, Serialize};

/// Every operator command the desk accepts.
/// Variants are appended as operations are added, never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DeskCommand {
    // ── Ledger ────────────────────────────────────
    CreateTransaction(TxnRequest),
    UpdateTransaction {
        txn_id: TxnId,
        status: TxnStatus,
        amount: Money,
    },
    DeleteTransaction { txn_id: TxnId },
    EditableTransactions { customer_id: CustomerId },
    ListTransactions { customer_id: CustomerId },

    // ── Customers ─────────────────────────────────
    CreateCustomer(CustomerForm),
    GetCustomer { customer_id: CustomerId },
    FindCustomers { name: String },
    ListCustomers,
    UpdateCustomer {
        customer_id: CustomerId,
        #[serde(default)]
        patch: CustomerPatch,
    },
    DeleteCustomer { customer_id: CustomerId },

    // ── Branches ──────────────────────────────────
    CreateBranch(BranchForm),
    ListBranches,
    UpdateBranch {
        branch_id: BranchId,
        #[serde(default)]
        patch: BranchPatch,
    },
    DeleteBranch { branch_id: BranchId },

    // ── Accounts ──────────────────────────────────
    OpenAccount(AccountForm),
    ListAccounts { customer_id: CustomerId },
    DeleteAccount { account_id: AccountId },

    // ── Loans ─────────────────────────────────────
    CreateLoan(LoanForm),
    ListLoans { customer_id: CustomerId },
    UpdateLoan {
        loan_id: LoanId,
        #[serde(default)]
        patch: LoanPatch,
    },
    DeleteLoan { loan_id: LoanId },

    // ── Credit cards ──────────────────────────────
    IssueCard(CardForm),
    ListCards { customer_id: CustomerId },
    UpdateCard {
        card_id: CardId,
        #[serde(default)]
        patch: CardPatch,
    },
    DeleteCard { card_id: CardId },

    // ── Support tickets ───────────────────────────
    OpenTicket(TicketForm),
    ListTickets { customer_id: CustomerId },
    UpdateTicket {
        ticket_id: TicketId,
        #[serde(flatten)]
        update: TicketUpdate,
    },
    DeleteTicket { ticket_id: TicketId },

    // ── Explorer, reports, audit ──────────────────
    Browse {
        table: Table,
        #[serde(default)]
        limit: Option<usize>,
        #[serde(default)]
        filter: Option<ColumnFilter>,
    },
    FilterChoices { table: Table, column: String },
    RowCounts,
    RunReport { report: Report },
    ListReports,
    RecentEvents {
        #[serde(default = "default_event_limit")]
        limit: usize,
    },
    LoadSeed { dir: String },
}

fn default_event_limit() -> usize {
    20
}

impl DeskCommand {
    /// True for commands that may write to the store.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::EditableTransactions { .. }
                | Self::ListTransactions { .. }
                | Self::GetCustomer { .. }
                | Self::FindCustomers { .. }
                | Self::ListCustomers
                | Self::ListBranches
                | Self::ListAccounts { .. }
                | Self::ListLoans { .. }
                | Self::ListCards { .. }
                | Self::ListTickets { .. }
                | Self::Browse { .. }
                | Self::FilterChoices { .. }
                | Self::RowCounts
                | Self::RunReport { .. }
                | Self::ListReports
                | Self::RecentEvents { .. }
        )
    }
}
