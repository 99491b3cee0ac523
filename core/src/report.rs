//! The fifteen canned analytical queries.
//!
//! Every report is a pure read over the current tables. None takes
//! parameters.

use crate::{
    error::{BankError, BankResult},
    store::{BankStore, ResultGrid},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Report {
    Q1,
    Q2,
    Q3,
    Q4,
    Q5,
    Q6,
    Q7,
    Q8,
    Q9,
    Q10,
    Q11,
    Q12,
    Q13,
    Q14,
    Q15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    CustomerAccount,
    TransactionBehaviour,
    LoanInsights,
    BranchPerformance,
    SupportExperience,
}

impl ReportCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CustomerAccount => "Customer & Account Analysis",
            Self::TransactionBehaviour => "Transaction Behaviour",
            Self::LoanInsights => "Loan Insights",
            Self::BranchPerformance => "Branch & Performance",
            Self::SupportExperience => "Support Tickets & Customer Experience",
        }
    }
}

impl Report {
    pub const ALL: [Report; 15] = [
        Report::Q1,
        Report::Q2,
        Report::Q3,
        Report::Q4,
        Report::Q5,
        Report::Q6,
        Report::Q7,
        Report::Q8,
        Report::Q9,
        Report::Q10,
        Report::Q11,
        Report::Q12,
        Report::Q13,
        Report::Q14,
        Report::Q15,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Report::Q1 => "Q1",
            Report::Q2 => "Q2",
            Report::Q3 => "Q3",
            Report::Q4 => "Q4",
            Report::Q5 => "Q5",
            Report::Q6 => "Q6",
            Report::Q7 => "Q7",
            Report::Q8 => "Q8",
            Report::Q9 => "Q9",
            Report::Q10 => "Q10",
            Report::Q11 => "Q11",
            Report::Q12 => "Q12",
            Report::Q13 => "Q13",
            Report::Q14 => "Q14",
            Report::Q15 => "Q15",
        }
    }

    pub fn category(&self) -> ReportCategory {
        use Report::*;
        match self {
            Q1 | Q2 | Q3 | Q4 => ReportCategory::CustomerAccount,
            Q5 | Q6 | Q7 | Q8 => ReportCategory::TransactionBehaviour,
            Q9 | Q10 | Q11 => ReportCategory::LoanInsights,
            Q12 | Q13 => ReportCategory::BranchPerformance,
            Q14 | Q15 => ReportCategory::SupportExperience,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Report::Q1 => "How many customers exist per city, and what is their average account balance?",
            Report::Q2 => "Which account type holds the highest total balance?",
            Report::Q3 => "Who are the top 10 customers by total account balance?",
            Report::Q4 => "Which customers joined in 2023 with an account balance above 1,00,000?",
            Report::Q5 => "What is the total transaction volume by transaction type?",
            Report::Q6 => "How many failed transactions occurred for each transaction type?",
            Report::Q7 => "What is the total number of transactions per transaction type?",
            Report::Q8 => "Which accounts have 5 or more high-value transactions above 20,000?",
            Report::Q9 => "What is the average loan amount and interest rate by loan type?",
            Report::Q10 => "Which customers hold more than one active or approved loan?",
            Report::Q11 => "Who are the top 5 customers by outstanding (non-closed) loan amount?",
            Report::Q12 => "What is the average loan amount per branch?",
            Report::Q13 => "How many customers exist in each age group?",
            Report::Q14 => "Which issue categories have the longest average resolution time?",
            Report::Q15 => "Which support agents closed more than one critical ticket rated 4 or higher?",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Report::Q1 => {
                "SELECT c.city, COUNT(DISTINCT c.customer_id) AS customer_count,
                        ROUND(AVG(a.account_balance), 2) AS avg_balance
                 FROM customers c
                 JOIN accounts a ON a.customer_id = c.customer_id
                 GROUP BY c.city
                 ORDER BY customer_count DESC, c.city"
            }
            Report::Q2 => {
                "SELECT c.account_type, ROUND(SUM(a.account_balance), 2) AS total_balance
                 FROM accounts a
                 JOIN customers c ON c.customer_id = a.customer_id
                 GROUP BY c.account_type
                 ORDER BY total_balance DESC"
            }
            Report::Q3 => {
                "SELECT c.customer_id, c.name, ROUND(SUM(a.account_balance), 2) AS total_balance
                 FROM customers c
                 JOIN accounts a ON a.customer_id = c.customer_id
                 GROUP BY c.customer_id, c.name
                 ORDER BY total_balance DESC
                 LIMIT 10"
            }
            Report::Q4 => {
                "SELECT c.customer_id, c.name, a.account_id, a.account_balance, c.join_date
                 FROM customers c
                 JOIN accounts a ON a.customer_id = c.customer_id
                 WHERE strftime('%Y', c.join_date) = '2023' AND a.account_balance > 100000
                 ORDER BY a.account_balance DESC"
            }
            Report::Q5 => {
                "SELECT txn_type, ROUND(SUM(amount), 2) AS total_volume
                 FROM transactions
                 GROUP BY txn_type
                 ORDER BY total_volume DESC"
            }
            Report::Q6 => {
                "SELECT txn_type, COUNT(*) AS failed_count
                 FROM transactions
                 WHERE status = 'Failed'
                 GROUP BY txn_type
                 ORDER BY failed_count DESC"
            }
            Report::Q7 => {
                "SELECT txn_type, COUNT(*) AS total_count
                 FROM transactions
                 GROUP BY txn_type
                 ORDER BY total_count DESC"
            }
            // Rows without a pinned account count against the customer's
            // first account, the same one the ledger settles them on.
            Report::Q8 => {
                "SELECT a.account_id AS account_number, COUNT(*) AS high_value_txn_count
                 FROM transactions t
                 JOIN accounts a ON a.account_id = COALESCE(
                     t.account_id,
                     (SELECT MIN(account_id) FROM accounts WHERE customer_id = t.customer_id))
                 WHERE t.amount > 20000
                 GROUP BY a.account_id
                 HAVING COUNT(*) >= 5
                 ORDER BY high_value_txn_count DESC, a.account_id"
            }
            Report::Q9 => {
                "SELECT loan_type, ROUND(AVG(loan_amount), 2) AS avg_loan_amount,
                        ROUND(AVG(interest_rate), 2) AS avg_interest_rate
                 FROM loans
                 GROUP BY loan_type
                 ORDER BY avg_loan_amount DESC"
            }
            Report::Q10 => {
                "SELECT c.customer_id, c.name, COUNT(l.loan_id) AS active_loan_count
                 FROM customers c
                 JOIN loans l ON l.customer_id = c.customer_id
                 WHERE l.loan_status IN ('Active', 'Approved')
                 GROUP BY c.customer_id, c.name
                 HAVING COUNT(l.loan_id) > 1
                 ORDER BY active_loan_count DESC, c.customer_id"
            }
            Report::Q11 => {
                "SELECT c.customer_id, c.name, ROUND(SUM(l.loan_amount), 2) AS total_outstanding
                 FROM customers c
                 JOIN loans l ON l.customer_id = c.customer_id
                 WHERE l.loan_status IS NULL OR l.loan_status <> 'Closed'
                 GROUP BY c.customer_id, c.name
                 ORDER BY total_outstanding DESC
                 LIMIT 5"
            }
            Report::Q12 => {
                "SELECT b.branch_name, ROUND(AVG(l.loan_amount), 2) AS avg_loan_amount
                 FROM branches b
                 JOIN loans l ON l.branch_name = b.branch_name
                 GROUP BY b.branch_name
                 ORDER BY avg_loan_amount DESC"
            }
            Report::Q13 => {
                "SELECT CASE
                            WHEN age BETWEEN 18 AND 25 THEN '18-25'
                            WHEN age BETWEEN 26 AND 35 THEN '26-35'
                            WHEN age BETWEEN 36 AND 45 THEN '36-45'
                            WHEN age BETWEEN 46 AND 55 THEN '46-55'
                            WHEN age BETWEEN 56 AND 65 THEN '56-65'
                            ELSE '66+'
                        END AS age_group,
                        COUNT(*) AS customer_count
                 FROM customers
                 GROUP BY age_group
                 ORDER BY age_group"
            }
            Report::Q14 => {
                "SELECT issue_category,
                        ROUND(AVG(julianday(date_closed) - julianday(date_opened)), 2)
                            AS avg_resolution_days
                 FROM supporttickets
                 WHERE date_closed IS NOT NULL
                 GROUP BY issue_category
                 ORDER BY avg_resolution_days DESC"
            }
            Report::Q15 => {
                "SELECT support_agent, COUNT(*) AS high_rating_tickets
                 FROM supporttickets
                 WHERE priority = 'Critical' AND customer_rating >= 4 AND status = 'Closed'
                 GROUP BY support_agent
                 HAVING COUNT(*) > 1
                 ORDER BY high_rating_tickets DESC, support_agent"
            }
        }
    }

    pub fn run(&self, store: &BankStore) -> BankResult<ResultGrid> {
        store.query(self.sql(), [])
    }
}

impl FromStr for Report {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Report::ALL
            .iter()
            .copied()
            .find(|r| r.id() == wanted)
            .ok_or_else(|| BankError::invalid(format!("unknown report '{s}', expected Q1..Q15")))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id(), self.title())
    }
}

/// A report's result grid together with what it answers.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub id: &'static str,
    pub category: &'static str,
    pub title: &'static str,
    pub grid: ResultGrid,
}

impl ReportResult {
    pub fn run(report: Report, store: &BankStore) -> BankResult<Self> {
        Ok(Self {
            id: report.id(),
            category: report.category().label(),
            title: report.title(),
            grid: report.run(store)?,
        })
    }
}
