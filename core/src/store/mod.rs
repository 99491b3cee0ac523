//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Components call store methods and never execute SQL directly.

use crate::{
    entity::{ColumnFilter, ColumnMatch, Table},
    error::{BankError, BankResult},
    event::EventLogEntry,
    types::{AccountId, CardId, CustomerId, LoanId, Money, TxnId, TxnStatus, TxnType},
};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Params};
use serde::Serialize;

mod account;
mod branch;
mod credit_card;
mod customer;
mod loan;
mod support_ticket;
mod transaction;

pub struct BankStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl BankStore {
    pub fn open(path: &str) -> BankResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> BankResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> BankResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_banksight.sql"))?;
        Ok(())
    }

    /// Run `f` as one all-or-nothing unit: commit if it returns `Ok`,
    /// roll back every write it made if it returns `Err`.
    ///
    /// Store methods called from inside `f` run on the same connection and
    /// therefore inside the same SQLite transaction. A unit started while
    /// another is open joins it, and the outer unit decides the outcome.
    pub fn atomically<T>(&self, f: impl FnOnce(&Self) -> BankResult<T>) -> BankResult<T> {
        if self.in_unit() {
            return f(self);
        }
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn in_unit(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Open a unit whose scope is not a single closure. Pair with
    /// `commit_unit` or `rollback_unit`.
    pub fn begin_unit(&self) -> BankResult<()> {
        self.conn.execute_batch("BEGIN DEFERRED")?;
        Ok(())
    }

    pub fn commit_unit(&self) -> BankResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback_unit(&self) -> BankResult<()> {
        if self.in_unit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// Foreign-key enforcement. Must be toggled outside any open unit;
    /// SQLite ignores the pragma inside a transaction.
    pub fn set_foreign_keys(&self, enabled: bool) -> BankResult<()> {
        let pragma = if enabled {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA foreign_keys=OFF;"
        };
        self.conn.execute_batch(pragma)?;
        Ok(())
    }

    // ── Generic data access ────────────────────────────────────

    /// Run a read query and collect every row as JSON cells.
    pub fn query<P: Params>(&self, sql: &str, params: P) -> BankResult<ResultGrid> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();
        let rows = stmt
            .query_map(params, |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(cell_to_json))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResultGrid { columns, rows })
    }

    /// Run a write statement and return the number of rows changed.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> BankResult<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Rows of a table in primary-key order, optionally narrowed by one
    /// column filter. Counts are taken before the limit applies.
    pub fn browse(
        &self,
        table: Table,
        filter: Option<&ColumnFilter>,
        limit: usize,
    ) -> BankResult<BrowsePage> {
        let total_records = self.row_count(table)?;
        let (clause, mut binds) = match filter {
            Some(f) => filter_clause(table, f)?,
            None => (String::new(), Vec::new()),
        };
        let matched: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{clause}", table.name()),
            params_from_iter(binds.iter()),
            |r| r.get(0),
        )?;
        binds.push(Value::Integer(limit as i64));
        let sql = format!(
            "SELECT * FROM {}{clause} ORDER BY {} LIMIT ?{}",
            table.name(),
            table.primary_key(),
            binds.len()
        );
        let grid = self.query(&sql, params_from_iter(binds))?;
        Ok(BrowsePage { table, total_records, matched, grid })
    }

    /// Distinct values of `column`, or None when there are `cap` or more.
    pub fn distinct_values(
        &self,
        table: Table,
        column: &'static str,
        cap: usize,
    ) -> BankResult<Option<Vec<serde_json::Value>>> {
        let sql = format!("SELECT DISTINCT {column} FROM {} ORDER BY 1 LIMIT ?1", table.name());
        let grid = self.query(&sql, params![cap as i64])?;
        if grid.rows.len() >= cap {
            return Ok(None);
        }
        Ok(Some(grid.column_values(column)))
    }

    pub fn row_count(&self, table: Table) -> BankResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |r| r.get(0))?)
    }

    /// Insert one row given static column identifiers from `Table::column`.
    pub fn insert_values(
        &self,
        table: Table,
        columns: &[&'static str],
        values: Vec<Value>,
    ) -> BankResult<()> {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(|e| BankError::from_constraint(e, table.name()))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> BankResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (session_id, occurred_at, component, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.session_id,
                entry.occurred_at,
                entry.component,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    /// Most recent events first.
    pub fn recent_events(&self, limit: usize) -> BankResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, occurred_at, component, event_type, payload
             FROM event_log ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    session_id: row.get(1)?,
                    occurred_at: row.get(2)?,
                    component: row.get(3)?,
                    event_type: row.get(4)?,
                    payload: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, event_type: &str) -> BankResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE event_type = ?1",
            params![event_type],
            |r| r.get(0),
        )?)
    }

    // ── Identifier sequences ───────────────────────────────────

    /// Every primary key of `table` that starts with `prefix`, as text.
    pub fn keys_with_prefix(&self, table: Table, prefix: &str) -> BankResult<Vec<String>> {
        let key = table.primary_key();
        let sql = format!(
            "SELECT CAST({key} AS TEXT) FROM {} WHERE CAST({key} AS TEXT) LIKE ?1 || '%'",
            table.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![prefix], |r| r.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// WHERE clause and bind values for an explorer filter. The column is
/// resolved against the table's static column list.
fn filter_clause(table: Table, filter: &ColumnFilter) -> BankResult<(String, Vec<Value>)> {
    let column = table.column(&filter.column).ok_or_else(|| {
        BankError::invalid(format!("unknown column '{}' on {table}", filter.column))
    })?;
    match &filter.matcher {
        ColumnMatch::Values(values) if values.is_empty() => Ok((String::new(), Vec::new())),
        ColumnMatch::Values(values) => {
            let mut binds = Vec::new();
            let mut with_null = false;
            for v in values {
                match json_to_cell(v) {
                    Value::Null => with_null = true,
                    cell => binds.push(cell),
                }
            }
            let mut terms = Vec::new();
            if !binds.is_empty() {
                let slots: Vec<String> = (1..=binds.len()).map(|i| format!("?{i}")).collect();
                terms.push(format!("{column} IN ({})", slots.join(", ")));
            }
            if with_null {
                terms.push(format!("{column} IS NULL"));
            }
            Ok((format!(" WHERE {}", terms.join(" OR ")), binds))
        }
        ColumnMatch::Contains(needle) if needle.is_empty() => Ok((String::new(), Vec::new())),
        ColumnMatch::Contains(needle) => {
            let escaped = needle
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            Ok((
                format!(
                    " WHERE LOWER(CAST({column} AS TEXT)) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'"
                ),
                vec![Value::Text(escaped)],
            ))
        }
    }
}

/// SQLite value for a JSON scalar. Text is trimmed; blank text is NULL.
pub(crate) fn json_to_cell(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        serde_json::Value::String(s) if s.trim().is_empty() => Value::Null,
        serde_json::Value::String(s) => Value::Text(s.trim().to_string()),
        other => Value::Text(other.to_string()),
    }
}

fn cell_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
    }
}

/// One explorer view of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowsePage {
    pub table: Table,
    /// Rows in the table.
    pub total_records: i64,
    /// Rows passing the filter; equals `total_records` when unfiltered.
    pub matched: i64,
    #[serde(flatten)]
    pub grid: ResultGrid,
}

/// A result grid: column names plus rows of JSON cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultGrid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultGrid {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Every value of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Vec<serde_json::Value> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().map(|r| r[i].clone()).collect(),
            None => Vec::new(),
        }
    }
}

// ── Row types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRow {
    pub customer_id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub age: Option<i64>,
    pub city: Option<String>,
    pub account_type: Option<String>,
    pub join_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchRow {
    pub branch_id: i64,
    pub branch_name: String,
    pub city: Option<String>,
    pub manager_name: Option<String>,
    pub total_employees: Option<i64>,
    pub branch_revenue: Option<f64>,
    pub opening_date: Option<String>,
    pub performance_rating: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub account_id: AccountId,
    pub customer_id: CustomerId,
    pub balance: Money,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanRow {
    pub loan_id: LoanId,
    pub customer_id: CustomerId,
    pub branch_name: Option<String>,
    pub loan_type: Option<String>,
    /// Outstanding principal (`loan_amount`).
    pub principal: Money,
    pub account_id: Option<AccountId>,
    pub interest_rate: Option<f64>,
    pub term_months: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardRow {
    pub card_id: CardId,
    pub branch_name: Option<String>,
    pub customer_id: CustomerId,
    pub account_id: AccountId,
    pub card_number: String,
    pub card_type: Option<String>,
    pub card_network: Option<String>,
    pub credit_limit: Option<f64>,
    pub current_balance: Money,
    pub issued_date: Option<String>,
    pub expiry_date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxnRow {
    pub txn_id: TxnId,
    pub customer_id: CustomerId,
    pub account_id: Option<AccountId>,
    pub loan_id: Option<LoanId>,
    pub card_id: Option<CardId>,
    pub txn_type: TxnType,
    pub amount: Money,
    pub txn_time: String,
    pub status: TxnStatus,
    /// Signed amount applied to the target while Success.
    pub settled_delta: Option<Money>,
    /// A target has been bound; unset only on rows loaded from seed files.
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketRow {
    pub ticket_id: String,
    pub customer_id: CustomerId,
    pub account_id: Option<AccountId>,
    pub loan_id: Option<LoanId>,
    pub branch_name: Option<String>,
    pub issue_category: Option<String>,
    pub description: Option<String>,
    pub date_opened: Option<String>,
    pub date_closed: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub resolution_remarks: Option<String>,
    pub support_agent: Option<String>,
    pub channel: Option<String>,
    pub customer_rating: Option<i64>,
}
