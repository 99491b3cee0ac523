use super::{BankStore, TxnRow};
use crate::{
    error::{BankError, BankResult},
    types::{Money, TxnStatus},
};
use rusqlite::{params, OptionalExtension, Row};

const TXN_COLUMNS: &str = "txn_id, customer_id, account_id, loan_id, card_id, txn_type, amount,
     txn_time, status, settled_delta, pinned";

fn txn_from_row(row: &Row<'_>) -> rusqlite::Result<TxnRow> {
    Ok(TxnRow {
        txn_id: row.get(0)?,
        customer_id: row.get(1)?,
        account_id: row.get(2)?,
        loan_id: row.get(3)?,
        card_id: row.get(4)?,
        txn_type: row.get(5)?,
        amount: row.get(6)?,
        txn_time: row.get(7)?,
        status: row.get(8)?,
        settled_delta: row.get(9)?,
        pinned: row.get(10)?,
    })
}

impl BankStore {
    // ── Transaction ledger ────────────────────────────────────────

    pub fn insert_txn(&self, t: &TxnRow) -> BankResult<()> {
        self.conn
            .execute(
                "INSERT INTO transactions (txn_id, customer_id, account_id, loan_id, card_id,
                                           txn_type, amount, txn_time, status, settled_delta,
                                           pinned)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    &t.txn_id,
                    &t.customer_id,
                    t.account_id,
                    t.loan_id,
                    t.card_id,
                    t.txn_type,
                    t.amount,
                    &t.txn_time,
                    t.status,
                    t.settled_delta,
                    t.pinned,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "transaction"))?;
        Ok(())
    }

    pub fn txn(&self, txn_id: &str) -> BankResult<Option<TxnRow>> {
        let sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE txn_id = ?1");
        self.conn
            .query_row(&sql, params![txn_id], txn_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// A customer's ledger entries, oldest id first, optionally restricted
    /// to the given statuses.
    pub fn txns_for_customer(
        &self,
        customer_id: &str,
        statuses: &[TxnStatus],
    ) -> BankResult<Vec<TxnRow>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions WHERE customer_id = ?1 ORDER BY txn_time, txn_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![customer_id], txn_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter(|t| statuses.is_empty() || statuses.contains(&t.status))
            .collect())
    }

    /// Rewrite the mutable half of a ledger row after reconciliation.
    pub fn update_txn_settlement(
        &self,
        txn_id: &str,
        status: TxnStatus,
        amount: Money,
        txn_time: &str,
        settled_delta: Option<Money>,
    ) -> BankResult<()> {
        self.conn
            .execute(
                "UPDATE transactions
                 SET status = ?2, amount = ?3, txn_time = ?4, settled_delta = ?5
                 WHERE txn_id = ?1",
                params![txn_id, status, amount, txn_time, settled_delta],
            )
            .map_err(|e| BankError::from_constraint(e, "transaction"))?;
        Ok(())
    }

    /// Pin the target a legacy row settles against, once resolved.
    pub fn pin_txn_target(
        &self,
        txn_id: &str,
        account_id: Option<i64>,
        loan_id: Option<i64>,
        card_id: Option<i64>,
    ) -> BankResult<()> {
        self.conn.execute(
            "UPDATE transactions
             SET account_id = ?2, loan_id = ?3, card_id = ?4, pinned = 1
             WHERE txn_id = ?1",
            params![txn_id, account_id, loan_id, card_id],
        )?;
        Ok(())
    }

    pub fn delete_txn(&self, txn_id: &str) -> BankResult<usize> {
        self.conn
            .execute("DELETE FROM transactions WHERE txn_id = ?1", params![txn_id])
            .map_err(|e| BankError::from_constraint(e, "transaction"))
    }
}
