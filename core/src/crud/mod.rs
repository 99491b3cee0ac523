//! Maintenance of the reference tables: customers, branches, accounts,
//! loans, credit cards and support tickets.
//!
//! RULE: CRUD never moves money. Account balances, loan principal and
//! card balances are written only by the ledger.

use crate::{
    clock::{BankClock, DATE_FORMAT},
    config::DeskConfig,
    error::{BankError, BankResult},
    store::BankStore,
};
use chrono::NaiveDate;

pub mod account;
pub mod branch;
pub mod credit_card;
pub mod customer;
pub mod loan;
pub mod support_ticket;

pub struct Crud<'a> {
    store: &'a BankStore,
    clock: &'a BankClock,
    config: &'a DeskConfig,
}

impl<'a> Crud<'a> {
    pub fn new(store: &'a BankStore, clock: &'a BankClock, config: &'a DeskConfig) -> Self {
        Self { store, clock, config }
    }
}

/// Trimmed, non-empty text or a ValidationError naming the field.
fn required(field: &str, value: &str) -> BankResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BankError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text collapses to None.
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_date(field: &str, value: &str) -> BankResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| BankError::invalid(format!("{field} must be YYYY-MM-DD, got '{value}'")))
}

fn non_negative(field: &str, value: f64) -> BankResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(BankError::invalid(format!("{field} must be >= 0, got {value}")));
    }
    Ok(value)
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> BankResult<i64> {
    if value < min || value > max {
        return Err(BankError::invalid(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(value)
}

/// The name must match an existing branch.
fn require_branch(store: &BankStore, branch_name: &str) -> BankResult<()> {
    match store.branch_named(branch_name)? {
        Some(_) => Ok(()),
        None => Err(BankError::not_found("branch", branch_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_range_helpers() {
        assert_eq!(required("name", "  Asha ").unwrap(), "Asha");
        assert!(required("name", "   ").is_err());
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" Pune ")), Some("Pune".to_string()));
        assert!(in_range("rating", 6, 1, 5).is_err());
        assert!(non_negative("revenue", -0.5).is_err());
        assert!(parse_date("start", "2024-02-30").is_err());
    }
}
