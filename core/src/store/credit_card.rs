use super::{BankStore, CardRow};
use crate::{
    crud::credit_card::CardForm,
    error::{BankError, BankResult},
    types::{CardId, Money},
};
use rusqlite::{params, OptionalExtension, Row};

const CARD_COLUMNS: &str = "card_id, branch_name, customer_id, account_id, card_number, card_type,
     card_network, credit_limit, current_balance, issued_date, expiry_date, status";

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardRow> {
    Ok(CardRow {
        card_id: row.get(0)?,
        branch_name: row.get(1)?,
        customer_id: row.get(2)?,
        account_id: row.get(3)?,
        card_number: row.get(4)?,
        card_type: row.get(5)?,
        card_network: row.get(6)?,
        credit_limit: row.get(7)?,
        current_balance: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
        issued_date: row.get(9)?,
        expiry_date: row.get(10)?,
        status: row.get(11)?,
    })
}

impl BankStore {
    // ── Credit card ───────────────────────────────────────────────

    /// New cards start with a zero balance.
    pub fn insert_card(
        &self,
        c: &CardForm,
        card_number: &str,
        issued_date: &str,
        expiry_date: &str,
    ) -> BankResult<CardId> {
        self.conn
            .execute(
                "INSERT INTO creditcards (branch_name, customer_id, account_id, card_number,
                                          card_type, card_network, credit_limit, current_balance,
                                          issued_date, expiry_date, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0.0, ?8, ?9, ?10)",
                params![
                    &c.branch_name,
                    &c.customer_id,
                    c.account_id,
                    card_number,
                    c.card_type,
                    c.card_network,
                    c.credit_limit,
                    issued_date,
                    expiry_date,
                    c.status,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "credit card"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn card(&self, card_id: CardId) -> BankResult<Option<CardRow>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM creditcards WHERE card_id = ?1");
        self.conn
            .query_row(&sql, params![card_id], card_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// A customer's cards, lowest id first.
    pub fn cards_for_customer(&self, customer_id: &str) -> BankResult<Vec<CardRow>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM creditcards WHERE customer_id = ?1 ORDER BY card_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![customer_id], card_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn cards(&self) -> BankResult<Vec<CardRow>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM creditcards ORDER BY card_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], card_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Everything but the number, dates and balance.
    pub fn update_card(&self, c: &CardRow) -> BankResult<usize> {
        self.conn
            .execute(
                "UPDATE creditcards
                 SET branch_name = ?2, account_id = ?3, card_type = ?4, card_network = ?5,
                     credit_limit = ?6, status = ?7
                 WHERE card_id = ?1",
                params![
                    c.card_id,
                    &c.branch_name,
                    c.account_id,
                    &c.card_type,
                    &c.card_network,
                    c.credit_limit,
                    &c.status,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "credit card"))
    }

    /// Ledger-only: overwrite the outstanding card balance.
    pub fn set_card_balance(&self, card_id: CardId, balance: Money) -> BankResult<()> {
        self.conn.execute(
            "UPDATE creditcards SET current_balance = ?1 WHERE card_id = ?2",
            params![balance, card_id],
        )?;
        Ok(())
    }

    pub fn delete_card(&self, card_id: CardId) -> BankResult<usize> {
        self.conn
            .execute("DELETE FROM creditcards WHERE card_id = ?1", params![card_id])
            .map_err(|e| BankError::from_constraint(e, "credit card"))
    }
}
