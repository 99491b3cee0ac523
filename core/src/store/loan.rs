use super::{BankStore, LoanRow};
use crate::{
    crud::loan::LoanForm,
    error::{BankError, BankResult},
    types::{LoanId, Money},
};
use rusqlite::{params, OptionalExtension, Row};

const LOAN_COLUMNS: &str = "loan_id, customer_id, branch_name, loan_type, loan_amount,
     account_id, interest_rate, loan_term_months, start_date, end_date, loan_status";

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<LoanRow> {
    Ok(LoanRow {
        loan_id: row.get(0)?,
        customer_id: row.get(1)?,
        branch_name: row.get(2)?,
        loan_type: row.get(3)?,
        principal: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        account_id: row.get(5)?,
        interest_rate: row.get(6)?,
        term_months: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        status: row.get(10)?,
    })
}

impl BankStore {
    // ── Loan ──────────────────────────────────────────────────────

    pub fn insert_loan(&self, l: &LoanForm, start_date: &str, end_date: &str) -> BankResult<LoanId> {
        self.conn
            .execute(
                "INSERT INTO loans (customer_id, branch_name, loan_type, loan_amount, account_id,
                                    interest_rate, loan_term_months, start_date, end_date, loan_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &l.customer_id,
                    &l.branch_name,
                    l.loan_type,
                    l.loan_amount,
                    l.account_id,
                    l.interest_rate,
                    l.term_months,
                    start_date,
                    end_date,
                    l.status,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "loan"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn loan(&self, loan_id: LoanId) -> BankResult<Option<LoanRow>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE loan_id = ?1");
        self.conn
            .query_row(&sql, params![loan_id], loan_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// A customer's loans, lowest id first.
    pub fn loans_for_customer(&self, customer_id: &str) -> BankResult<Vec<LoanRow>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE customer_id = ?1 ORDER BY loan_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![customer_id], loan_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn loans(&self) -> BankResult<Vec<LoanRow>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans ORDER BY loan_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], loan_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Terms only. The principal column is left alone.
    pub fn update_loan_terms(&self, l: &LoanRow) -> BankResult<usize> {
        self.conn
            .execute(
                "UPDATE loans
                 SET branch_name = ?2, loan_type = ?3, account_id = ?4, interest_rate = ?5,
                     loan_term_months = ?6, end_date = ?7, loan_status = ?8
                 WHERE loan_id = ?1",
                params![
                    l.loan_id,
                    &l.branch_name,
                    &l.loan_type,
                    l.account_id,
                    l.interest_rate,
                    l.term_months,
                    &l.end_date,
                    &l.status,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "loan"))
    }

    /// Ledger-only: overwrite the outstanding principal.
    pub fn set_loan_principal(&self, loan_id: LoanId, principal: Money) -> BankResult<()> {
        self.conn.execute(
            "UPDATE loans SET loan_amount = ?1 WHERE loan_id = ?2",
            params![principal, loan_id],
        )?;
        Ok(())
    }

    pub fn delete_loan(&self, loan_id: LoanId) -> BankResult<usize> {
        self.conn
            .execute("DELETE FROM loans WHERE loan_id = ?1", params![loan_id])
            .map_err(|e| BankError::from_constraint(e, "loan"))
    }
}
