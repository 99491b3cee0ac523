//! The closed set of tables the desk knows about.
//!
//! RULE: any SQL that needs a table or column identifier takes it from
//! this module's `&'static str` tables, never from caller-supplied text.

use crate::error::BankError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Customers,
    Branches,
    Accounts,
    Transactions,
    Loans,
    CreditCards,
    SupportTickets,
}

impl Table {
    /// Explorer order. Also a valid load order: parents before children.
    pub const ALL: [Table; 7] = [
        Table::Branches,
        Table::Customers,
        Table::Accounts,
        Table::Loans,
        Table::CreditCards,
        Table::Transactions,
        Table::SupportTickets,
    ];

    /// Tables shown on the home page.
    pub const HOME: [Table; 4] = [
        Table::Customers,
        Table::Branches,
        Table::Accounts,
        Table::Transactions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Customers => "customers",
            Table::Branches => "branches",
            Table::Accounts => "accounts",
            Table::Transactions => "transactions",
            Table::Loans => "loans",
            Table::CreditCards => "creditcards",
            Table::SupportTickets => "supporttickets",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Table::Customers => "Customers",
            Table::Branches => "Branches",
            Table::Accounts => "Accounts",
            Table::Transactions => "Transactions",
            Table::Loans => "Loans",
            Table::CreditCards => "Credit Cards",
            Table::SupportTickets => "Support Tickets",
        }
    }

    pub fn primary_key(&self) -> &'static str {
        match self {
            Table::Customers => "customer_id",
            Table::Branches => "branch_id",
            Table::Accounts => "account_id",
            Table::Transactions => "txn_id",
            Table::Loans => "loan_id",
            Table::CreditCards => "card_id",
            Table::SupportTickets => "ticket_id",
        }
    }

    /// Every column, in schema order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Customers => &[
                "customer_id", "name", "phone", "gender", "age", "city", "account_type",
                "join_date",
            ],
            Table::Branches => &[
                "branch_id", "branch_name", "city", "manager_name", "total_employees",
                "branch_revenue", "opening_date", "performance_rating",
            ],
            Table::Accounts => &["account_id", "customer_id", "account_balance", "last_updated"],
            Table::Transactions => &[
                "txn_id", "customer_id", "account_id", "loan_id", "card_id", "txn_type",
                "amount", "txn_time", "status", "settled_delta", "pinned",
            ],
            Table::Loans => &[
                "loan_id", "customer_id", "branch_name", "loan_type", "loan_amount",
                "account_id", "interest_rate", "loan_term_months", "start_date", "end_date",
                "loan_status",
            ],
            Table::CreditCards => &[
                "card_id", "branch_name", "customer_id", "account_id", "card_number",
                "card_type", "card_network", "credit_limit", "current_balance", "issued_date",
                "expiry_date", "status",
            ],
            Table::SupportTickets => &[
                "ticket_id", "customer_id", "account_id", "loan_id", "branch_name",
                "issue_category", "description", "date_opened", "date_closed", "priority",
                "status", "resolution_remarks", "support_agent", "channel", "customer_rating",
            ],
        }
    }

    /// Resolve a caller-supplied column name against this table's columns,
    /// returning the static identifier. Seed files spell some columns
    /// differently; those aliases map here too.
    pub fn column(&self, name: &str) -> Option<&'static str> {
        let wanted = name.trim().to_lowercase();
        let aliased = match (self, wanted.as_str()) {
            (Table::Customers, "phnumber" | "phone_number") => "phone",
            (Table::Loans, "branch") => "branch_name",
            (Table::CreditCards, "branch") => "branch_name",
            _ => wanted.as_str(),
        };
        self.columns().iter().copied().find(|c| *c == aliased)
    }
}

/// Columns with fewer distinct values than this are filtered by picking
/// values; wider columns get a text search.
pub const PICK_LIST_LIMIT: usize = 50;

/// An explorer filter on one column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    #[serde(flatten)]
    pub matcher: ColumnMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatch {
    /// Cell equals any of these. An empty list matches every row.
    Values(Vec<serde_json::Value>),
    /// Case-insensitive substring of the cell's text. Empty matches every row.
    Contains(String),
}

/// How the explorer offers to filter a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterChoices {
    Values { values: Vec<serde_json::Value> },
    Contains,
}

impl FromStr for Table {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.name() == key)
            .ok_or_else(|| BankError::invalid(format!("unknown table '{s}'")))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
