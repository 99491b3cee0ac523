use super::{BankStore, CustomerRow};
use crate::error::{BankError, BankResult};
use rusqlite::{params, OptionalExtension, Row};

const CUSTOMER_COLUMNS: &str =
    "customer_id, name, phone, gender, age, city, account_type, join_date";

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerRow> {
    Ok(CustomerRow {
        customer_id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        gender: row.get(3)?,
        age: row.get(4)?,
        city: row.get(5)?,
        account_type: row.get(6)?,
        join_date: row.get(7)?,
    })
}

impl BankStore {
    // ── Customer ──────────────────────────────────────────────────

    pub fn insert_customer(&self, c: &CustomerRow) -> BankResult<()> {
        self.conn
            .execute(
                "INSERT INTO customers (customer_id, name, phone, gender, age, city, account_type, join_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &c.customer_id,
                    &c.name,
                    &c.phone,
                    &c.gender,
                    c.age,
                    &c.city,
                    &c.account_type,
                    &c.join_date,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "customer"))?;
        Ok(())
    }

    pub fn customer(&self, customer_id: &str) -> BankResult<Option<CustomerRow>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE customer_id = ?1");
        self.conn
            .query_row(&sql, params![customer_id], customer_from_row)
            .optional()
            .map_err(Into::into)
    }

    pub fn customers(&self) -> BankResult<Vec<CustomerRow>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY customer_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], customer_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Customers with exactly this name, oldest id first.
    pub fn customers_named(&self, name: &str) -> BankResult<Vec<CustomerRow>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name = ?1 ORDER BY customer_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![name], customer_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Whether a customer with the same name, phone and account type exists.
    pub fn customer_identity_taken(
        &self,
        name: &str,
        phone: Option<&str>,
        account_type: &str,
        excluding: Option<&str>,
    ) -> BankResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM customers
                 WHERE name = ?1 AND phone IS ?2 AND account_type = ?3
                   AND (?4 IS NULL OR customer_id <> ?4)
                 LIMIT 1",
                params![name, phone, account_type, excluding],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn update_customer(&self, c: &CustomerRow) -> BankResult<usize> {
        self.conn
            .execute(
                "UPDATE customers
                 SET name = ?2, phone = ?3, gender = ?4, age = ?5, city = ?6, account_type = ?7
                 WHERE customer_id = ?1",
                params![
                    &c.customer_id,
                    &c.name,
                    &c.phone,
                    &c.gender,
                    c.age,
                    &c.city,
                    &c.account_type,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "customer"))
    }

    pub fn delete_customer(&self, customer_id: &str) -> BankResult<usize> {
        self.conn
            .execute(
                "DELETE FROM customers WHERE customer_id = ?1",
                params![customer_id],
            )
            .map_err(|e| BankError::from_constraint(e, "customer"))
    }
}
