use super::{in_range, non_negative, optional, parse_date, require_branch, required, Crud};
use crate::{
    clock::DATE_FORMAT,
    error::{BankError, BankResult},
    event::DeskEvent,
    lookup,
    store::LoanRow,
    types::{round_cents, AccountId, CustomerId, LoanId, LoanStatus, LoanType, Money},
};
use chrono::{Months, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};

/// Longest term accepted, in months.
const MAX_TERM_MONTHS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanForm {
    pub customer_id: CustomerId,
    pub branch_name: String,
    /// Must belong to the customer when given.
    #[serde(default)]
    pub account_id: Option<AccountId>,
    pub loan_type: LoanType,
    pub loan_amount: Money,
    pub interest_rate: f64,
    pub term_months: i64,
    #[serde(default = "default_status")]
    pub status: LoanStatus,
    /// Defaults to today.
    #[serde(default)]
    pub start_date: Option<String>,
}

fn default_status() -> LoanStatus {
    LoanStatus::Active
}

/// Term changes only. Principal is moved by verified loan payments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanPatch {
    pub branch_name: Option<String>,
    pub account_id: Option<AccountId>,
    pub loan_type: Option<LoanType>,
    pub interest_rate: Option<f64>,
    pub term_months: Option<i64>,
    pub status: Option<LoanStatus>,
}

pub fn end_date(start: NaiveDate, term_months: i64) -> BankResult<NaiveDate> {
    let months = u32::try_from(term_months)
        .map_err(|_| BankError::invalid(format!("term of {term_months} months is out of range")))?;
    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| BankError::invalid("loan end date is out of range"))
}

impl Crud<'_> {
    pub fn create_loan(&self, form: &LoanForm) -> BankResult<(LoanRow, DeskEvent)> {
        let branch_name = required("branch name", &form.branch_name)?;
        let amount = round_cents(non_negative("loan amount", form.loan_amount)?);
        let mut clean = form.clone();
        clean.branch_name = branch_name;
        clean.loan_amount = amount;
        clean.interest_rate = non_negative("interest rate", form.interest_rate)?;
        clean.term_months = in_range("loan term", form.term_months, 1, MAX_TERM_MONTHS)?;
        let start = match optional(form.start_date.as_deref()) {
            Some(d) => parse_date("start date", &d)?,
            None => self.clock.today(),
        };
        let end = end_date(start, clean.term_months)?;

        self.store.atomically(|store| {
            lookup::require_customer(store, &clean.customer_id)?;
            require_branch(store, &clean.branch_name)?;
            if let Some(account_id) = clean.account_id {
                lookup::owned_account(store, &clean.customer_id, account_id)?;
            }
            let loan_id = store.insert_loan(
                &clean,
                &start.format(DATE_FORMAT).to_string(),
                &end.format(DATE_FORMAT).to_string(),
            )?;
            let row = self.loan(loan_id)?;
            info!(
                "loan {loan_id} of {amount:.2} created for {} at {}",
                clean.customer_id, clean.branch_name
            );
            let event = DeskEvent::LoanCreated {
                loan_id,
                customer_id: clean.customer_id.clone(),
                principal: amount,
            };
            Ok((row, event))
        })
    }

    pub fn loan(&self, loan_id: LoanId) -> BankResult<LoanRow> {
        self.store
            .loan(loan_id)?
            .ok_or_else(|| BankError::not_found("loan", loan_id))
    }

    pub fn loans_for(&self, customer_id: &str) -> BankResult<Vec<LoanRow>> {
        lookup::require_customer(self.store, customer_id)?;
        self.store.loans_for_customer(customer_id)
    }

    pub fn loans(&self) -> BankResult<Vec<LoanRow>> {
        self.store.loans()
    }

    pub fn update_loan(&self, loan_id: LoanId, patch: &LoanPatch) -> BankResult<(LoanRow, DeskEvent)> {
        self.store.atomically(|store| {
            let mut row = self.loan(loan_id)?;
            if let Some(name) = &patch.branch_name {
                let name = required("branch name", name)?;
                require_branch(store, &name)?;
                row.branch_name = Some(name);
            }
            if let Some(account_id) = patch.account_id {
                lookup::owned_account(store, &row.customer_id, account_id)?;
                row.account_id = Some(account_id);
            }
            if let Some(loan_type) = patch.loan_type {
                row.loan_type = Some(loan_type.to_string());
            }
            if let Some(rate) = patch.interest_rate {
                row.interest_rate = Some(non_negative("interest rate", rate)?);
            }
            if let Some(status) = patch.status {
                row.status = Some(status.to_string());
            }
            if let Some(term) = patch.term_months {
                let term = in_range("loan term", term, 1, MAX_TERM_MONTHS)?;
                row.term_months = Some(term);
                if let Some(start) = row.start_date.as_deref() {
                    let start = parse_date("start date", start)?;
                    row.end_date = Some(end_date(start, term)?.format(DATE_FORMAT).to_string());
                }
            }
            store.update_loan_terms(&row)?;
            info!("loan {loan_id} updated");
            Ok((row, DeskEvent::LoanUpdated { loan_id }))
        })
    }

    pub fn delete_loan(&self, loan_id: LoanId) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            if store.delete_loan(loan_id)? == 0 {
                return Err(BankError::not_found("loan", loan_id));
            }
            info!("loan {loan_id} deleted");
            Ok(DeskEvent::LoanDeleted { loan_id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_date_adds_calendar_months() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(end_date(start, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(end_date(start, 12).unwrap(), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert!(end_date(start, -1).is_err());
    }
}
