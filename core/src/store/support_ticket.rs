use super::{BankStore, TicketRow};
use crate::error::{BankError, BankResult};
use rusqlite::{params, OptionalExtension, Row};

const TICKET_COLUMNS: &str = "ticket_id, customer_id, account_id, loan_id, branch_name,
     issue_category, description, date_opened, date_closed, priority, status,
     resolution_remarks, support_agent, channel, customer_rating";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<TicketRow> {
    Ok(TicketRow {
        ticket_id: row.get(0)?,
        customer_id: row.get(1)?,
        account_id: row.get(2)?,
        loan_id: row.get(3)?,
        branch_name: row.get(4)?,
        issue_category: row.get(5)?,
        description: row.get(6)?,
        date_opened: row.get(7)?,
        date_closed: row.get(8)?,
        priority: row.get(9)?,
        status: row.get(10)?,
        resolution_remarks: row.get(11)?,
        support_agent: row.get(12)?,
        channel: row.get(13)?,
        customer_rating: row.get(14)?,
    })
}

impl BankStore {
    // ── Support ticket ────────────────────────────────────────────

    pub fn insert_ticket(&self, t: &TicketRow) -> BankResult<()> {
        self.conn
            .execute(
                "INSERT INTO supporttickets (ticket_id, customer_id, account_id, loan_id, branch_name,
                                             issue_category, description, date_opened, date_closed,
                                             priority, status, resolution_remarks, support_agent,
                                             channel, customer_rating)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    &t.ticket_id,
                    &t.customer_id,
                    t.account_id,
                    t.loan_id,
                    &t.branch_name,
                    &t.issue_category,
                    &t.description,
                    &t.date_opened,
                    &t.date_closed,
                    &t.priority,
                    &t.status,
                    &t.resolution_remarks,
                    &t.support_agent,
                    &t.channel,
                    t.customer_rating,
                ],
            )
            .map_err(|e| BankError::from_constraint(e, "support ticket"))?;
        Ok(())
    }

    pub fn ticket(&self, ticket_id: &str) -> BankResult<Option<TicketRow>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM supporttickets WHERE ticket_id = ?1");
        self.conn
            .query_row(&sql, params![ticket_id], ticket_from_row)
            .optional()
            .map_err(Into::into)
    }

    pub fn tickets_for_customer(&self, customer_id: &str) -> BankResult<Vec<TicketRow>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM supporttickets WHERE customer_id = ?1 ORDER BY ticket_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![customer_id], ticket_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Status, remarks and close date are the only mutable ticket fields.
    pub fn update_ticket_resolution(
        &self,
        ticket_id: &str,
        status: &str,
        resolution_remarks: Option<&str>,
        date_closed: Option<&str>,
    ) -> BankResult<usize> {
        self.conn
            .execute(
                "UPDATE supporttickets
                 SET status = ?2, resolution_remarks = ?3, date_closed = ?4
                 WHERE ticket_id = ?1",
                params![ticket_id, status, resolution_remarks, date_closed],
            )
            .map_err(|e| BankError::from_constraint(e, "support ticket"))
    }

    pub fn delete_ticket(&self, ticket_id: &str) -> BankResult<usize> {
        self.conn
            .execute(
                "DELETE FROM supporttickets WHERE ticket_id = ?1",
                params![ticket_id],
            )
            .map_err(|e| BankError::from_constraint(e, "support ticket"))
    }
}
