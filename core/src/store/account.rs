use super::{AccountRow, BankStore};
use crate::{
    error::{BankError, BankResult},
    types::{AccountId, Money},
};
use rusqlite::{params, OptionalExtension, Row};

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        account_id: row.get(0)?,
        customer_id: row.get(1)?,
        balance: row.get(2)?,
        last_updated: row.get(3)?,
    })
}

impl BankStore {
    // ── Account ───────────────────────────────────────────────────

    pub fn insert_account(
        &self,
        customer_id: &str,
        opening_balance: Money,
        opened_on: &str,
    ) -> BankResult<AccountId> {
        self.conn
            .execute(
                "INSERT INTO accounts (customer_id, account_balance, last_updated)
                 VALUES (?1, ?2, ?3)",
                params![customer_id, opening_balance, opened_on],
            )
            .map_err(|e| BankError::from_constraint(e, "account"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn account(&self, account_id: AccountId) -> BankResult<Option<AccountRow>> {
        self.conn
            .query_row(
                "SELECT account_id, customer_id, account_balance, last_updated
                 FROM accounts WHERE account_id = ?1",
                params![account_id],
                account_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// A customer's accounts, lowest id first.
    pub fn accounts_for_customer(&self, customer_id: &str) -> BankResult<Vec<AccountRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, customer_id, account_balance, last_updated
             FROM accounts WHERE customer_id = ?1 ORDER BY account_id",
        )?;
        let rows = stmt.query_map(params![customer_id], account_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn accounts(&self) -> BankResult<Vec<AccountRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, customer_id, account_balance, last_updated
             FROM accounts ORDER BY account_id",
        )?;
        let rows = stmt.query_map([], account_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Ledger-only: overwrite the running balance.
    pub fn set_account_balance(
        &self,
        account_id: AccountId,
        balance: Money,
        as_of: &str,
    ) -> BankResult<()> {
        self.conn.execute(
            "UPDATE accounts SET account_balance = ?1, last_updated = ?2 WHERE account_id = ?3",
            params![balance, as_of, account_id],
        )?;
        Ok(())
    }

    pub fn delete_account(&self, account_id: AccountId) -> BankResult<usize> {
        self.conn
            .execute("DELETE FROM accounts WHERE account_id = ?1", params![account_id])
            .map_err(|e| BankError::from_constraint(e, "account"))
    }
}
