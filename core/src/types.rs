//! Shared primitive types and the closed vocabularies used across the desk.

use crate::error::BankError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefixed, sequential customer identifier (`CUS101`).
pub type CustomerId = String;

/// Time-derived transaction identifier (`T1718000000`).
pub type TxnId = String;

pub type AccountId = i64;
pub type LoanId = i64;
pub type CardId = i64;
pub type BranchId = i64;

/// Prefixed, sequential support ticket identifier (`TKT1001`).
pub type TicketId = String;

/// Monetary amounts are kept in currency units and rounded to cents
/// whenever a new value is written.
pub type Money = f64;

pub fn round_cents(value: Money) -> Money {
    (value * 100.0).round() / 100.0
}

/// Lowercase and strip spaces, dashes and underscores so that stored
/// spellings like "loan Payment" or "Credit payment" parse.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Declares a closed string vocabulary: a Copy enum with its canonical
/// spelling, lenient parsing, Display and serde via that spelling.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = BankError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = normalize(s);
                $(
                    if key == normalize($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(BankError::invalid(format!("unknown {} '{}'", $label, s)))
            }
        }

        impl TryFrom<String> for $name {
            type Error = BankError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: BankError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

vocabulary! {
    /// The six recognised ledger entry kinds.
    TxnType("transaction type") {
        Deposit => "Deposit",
        Withdrawal => "Withdrawal",
        Transfer => "Transfer",
        Debit => "Debit",
        LoanPayment => "Loan Payment",
        CreditPayment => "Credit Payment",
    }
}

vocabulary! {
    TxnStatus("transaction status") {
        Success => "Success",
        Failed => "Failed",
        Pending => "Pending",
    }
}

vocabulary! {
    LoanStatus("loan status") {
        Active => "Active",
        Inactive => "Inactive",
        Closed => "Closed",
        Defaulted => "Defaulted",
    }
}

vocabulary! {
    LoanType("loan type") {
        Personal => "Personal",
        Auto => "Auto",
        Home => "Home",
        Business => "Business",
        LoanAgainstProperty => "Loan Against Property",
        Education => "Education",
    }
}

vocabulary! {
    CardType("card type") {
        Business => "Business",
        Platinum => "Platinum",
        Gold => "Gold",
        Silver => "Silver",
        Bronze => "Bronze",
    }
}

vocabulary! {
    CardNetwork("card network") {
        Visa => "Visa",
        MasterCard => "MasterCard",
        AmericanExpress => "American Express",
        Discover => "Discover",
    }
}

vocabulary! {
    CardStatus("card status") {
        Active => "Active",
        Inactive => "Inactive",
        Blocked => "Blocked",
        Expired => "Expired",
    }
}

vocabulary! {
    Gender("gender") {
        Male => "M",
        Female => "F",
        Other => "O",
    }
}

vocabulary! {
    CustomerAccountType("account type") {
        Savings => "Savings",
        Current => "Current",
        Premium => "Premium",
    }
}

vocabulary! {
    TicketPriority("ticket priority") {
        Critical => "Critical",
        High => "High",
        Medium => "Medium",
        Low => "Low",
    }
}

vocabulary! {
    TicketStatus("ticket status") {
        Open => "Open",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Closed => "Closed",
    }
}

vocabulary! {
    TicketChannel("ticket channel") {
        Email => "Email",
        Phone => "Phone",
        InPerson => "In-Person",
        Chat => "Chat",
    }
}

vocabulary! {
    IssueCategory("issue category") {
        LoanPaymentDelay => "Loan Payment Delay",
        AccountAccess => "Account Access",
        TransactionDispute => "Transaction Dispute",
        FraudAlert => "Fraud Alert",
        Other => "Other",
    }
}

/// How a transaction type moves money once it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnClass {
    /// Credits the originating account.
    Credit,
    /// Debits the originating account, subject to the minimum-balance floor.
    Debit,
    /// Reduces a loan's outstanding principal.
    LoanRepayment,
    /// Reduces a credit card's outstanding balance.
    CardRepayment,
}

impl TxnType {
    pub fn class(&self) -> TxnClass {
        match self {
            TxnType::Deposit => TxnClass::Credit,
            TxnType::Withdrawal | TxnType::Transfer | TxnType::Debit => TxnClass::Debit,
            TxnType::LoanPayment => TxnClass::LoanRepayment,
            TxnType::CreditPayment => TxnClass::CardRepayment,
        }
    }

    /// Payments are logged Pending and settle only on manual verification.
    pub fn requires_verification(&self) -> bool {
        matches!(self.class(), TxnClass::LoanRepayment | TxnClass::CardRepayment)
    }
}

impl CardStatus {
    /// Blocked and Expired cards never count as currently valid.
    pub fn is_usable(&self) -> bool {
        !matches!(self, CardStatus::Blocked | CardStatus::Expired)
    }
}
