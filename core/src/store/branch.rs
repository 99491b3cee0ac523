use super::{BankStore, BranchRow};
use crate::{
    crud::branch::BranchForm,
    error::{BankError, BankResult},
    types::BranchId,
};
use rusqlite::{params, OptionalExtension, Row};

const BRANCH_COLUMNS: &str = "branch_id, branch_name, city, manager_name, total_employees,
     branch_revenue, opening_date, performance_rating";

fn branch_from_row(row: &Row<'_>) -> rusqlite::Result<BranchRow> {
    Ok(BranchRow {
        branch_id: row.get(0)?,
        branch_name: row.get(1)?,
        city: row.get(2)?,
        manager_name: row.get(3)?,
        total_employees: row.get(4)?,
        branch_revenue: row.get(5)?,
        opening_date: row.get(6)?,
        performance_rating: row.get(7)?,
    })
}

impl BankStore {
    // ── Branch ────────────────────────────────────────────────────

    pub fn insert_branch(&self, b: &BranchForm, opening_date: &str) -> BankResult<BranchId> {
        self.conn
            .execute(
                "INSERT INTO branches (branch_name, city, manager_name, total_employees,
                                       branch_revenue, opening_date, performance_rating)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &b.branch_name,
                    &b.city,
                    &b.manager_name,
                    b.total_employees,
                    b.branch_revenue,
                    opening_date,
                    b.performance_rating,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "branch"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn branch(&self, branch_id: BranchId) -> BankResult<Option<BranchRow>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE branch_id = ?1");
        self.conn
            .query_row(&sql, params![branch_id], branch_from_row)
            .optional()
            .map_err(Into::into)
    }

    pub fn branch_named(&self, branch_name: &str) -> BankResult<Option<BranchRow>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE branch_name = ?1");
        self.conn
            .query_row(&sql, params![branch_name], branch_from_row)
            .optional()
            .map_err(Into::into)
    }

    pub fn branches(&self) -> BankResult<Vec<BranchRow>> {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches ORDER BY branch_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], branch_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn update_branch(&self, b: &BranchRow) -> BankResult<usize> {
        self.conn
            .execute(
                "UPDATE branches
                 SET branch_name = ?2, city = ?3, manager_name = ?4, total_employees = ?5,
                     branch_revenue = ?6, opening_date = ?7, performance_rating = ?8
                 WHERE branch_id = ?1",
                params![
                    b.branch_id,
                    &b.branch_name,
                    &b.city,
                    &b.manager_name,
                    b.total_employees,
                    b.branch_revenue,
                    &b.opening_date,
                    b.performance_rating,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "branch"))
    }

    pub fn delete_branch(&self, branch_id: BranchId) -> BankResult<usize> {
        self.conn
            .execute("DELETE FROM branches WHERE branch_id = ?1", params![branch_id])
            .map_err(|e| BankError::from_constraint(e, "branch"))
    }
}
