//! The desk: one operator session over one store.
//!
//! RULE: every mutation runs through `Desk::execute`, and every committed
//! mutation leaves exactly one row in the event log.

use crate::{
    clock::BankClock,
    command::DeskCommand,
    config::DeskConfig,
    crud::Crud,
    entity::{FilterChoices, Table, PICK_LIST_LIMIT},
    error::{BankError, BankResult},
    event::{DeskEvent, EventLogEntry},
    ledger::{Ledger, LedgerPolicy},
    report::{Report, ReportResult},
    rng::CardRng,
    seed::{self, SeedOutcome, SeedReport},
    store::BankStore,
    types::CardNetwork,
};
use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use uuid::Uuid;

/// Row count of one table, for the home page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCount {
    pub table: Table,
    pub label: &'static str,
    pub rows: i64,
}

pub struct Desk {
    pub store: BankStore,
    pub config: DeskConfig,
    pub clock: BankClock,
    rng: CardRng,
    session_id: String,
}

impl Desk {
    /// Open (and migrate) the store named by the config.
    pub fn open(config: DeskConfig) -> BankResult<Self> {
        let store = BankStore::open(&config.db_path)?;
        store.migrate()?;
        Ok(Self::new(store, config, BankClock::System))
    }

    /// Wrap an already migrated store.
    pub fn new(store: BankStore, config: DeskConfig, clock: BankClock) -> Self {
        let seed = config.card_seed.unwrap_or_else(rand::random);
        let session_id = Uuid::new_v4().to_string();
        info!("desk session {session_id} on {}", store.path().unwrap_or(":memory:"));
        Self {
            store,
            config,
            clock,
            rng: CardRng::new(seed),
            session_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(&self.store, &self.clock, LedgerPolicy::from(&self.config))
    }

    pub fn crud(&self) -> Crud<'_> {
        Crud::new(&self.store, &self.clock, &self.config)
    }

    /// Draw a fresh card number for one create-card request.
    pub fn draw_card_number(&mut self, network: CardNetwork) -> String {
        self.rng.card_number(network)
    }

    pub fn row_counts(&self, tables: &[Table]) -> BankResult<Vec<TableCount>> {
        tables
            .iter()
            .map(|&table| {
                Ok(TableCount {
                    table,
                    label: table.label(),
                    rows: self.store.row_count(table)?,
                })
            })
            .collect()
    }

    /// Pick list for a narrow column, text search for a wide one.
    pub fn filter_choices(&self, table: Table, column: &str) -> BankResult<FilterChoices> {
        let column = table
            .column(column)
            .ok_or_else(|| BankError::invalid(format!("unknown column '{column}' on {table}")))?;
        Ok(match self.store.distinct_values(table, column, PICK_LIST_LIMIT)? {
            Some(values) => FilterChoices::Values { values },
            None => FilterChoices::Contains,
        })
    }

    /// Tables load in their own units, so the load is not undone when an
    /// audit row cannot be written afterwards.
    pub fn load_seed(&self, dir: &Path) -> BankResult<SeedReport> {
        let report = seed::load_dir(&self.store, dir)?;
        for t in &report.tables {
            if let SeedOutcome::Loaded { rows, .. } = t.outcome {
                let event = DeskEvent::SeedLoaded {
                    table: t.table.name().to_string(),
                    rows,
                };
                if let Err(e) = self.record(&event) {
                    warn!("{} loaded but not audited: {e}", t.table);
                }
            }
        }
        Ok(report)
    }

    /// Append one event to the audit log.
    fn record(&self, event: &DeskEvent) -> BankResult<()> {
        let entry = EventLogEntry {
            id: None,
            session_id: self.session_id.clone(),
            occurred_at: self.clock.timestamp(),
            component: event.component().to_string(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    /// Record the event and hand back the mutated value as JSON.
    fn committed<T: Serialize>(&self, (value, event): (T, DeskEvent)) -> BankResult<Value> {
        self.record(&event)?;
        Ok(serde_json::to_value(value)?)
    }

    fn deleted(&self, event: DeskEvent) -> BankResult<Value> {
        self.record(&event)?;
        Ok(json!({ "deleted": serde_json::to_value(&event)? }))
    }

    /// Run one operator command. Errors leave the store as it was and are
    /// returned for display; none of them ends the session.
    ///
    /// A mutation and its audit row commit together. Seed loads manage
    /// their own units per table.
    pub fn execute(&mut self, cmd: DeskCommand) -> BankResult<Value> {
        let mutation = cmd.is_mutation();
        let result = if mutation && !matches!(cmd, DeskCommand::LoadSeed { .. }) {
            self.dispatch_in_unit(cmd)
        } else {
            self.dispatch(cmd)
        };
        if let Err(e) = &result {
            if mutation {
                warn!("command rejected ({}): {e}", e.kind());
            }
        }
        result
    }

    fn dispatch_in_unit(&mut self, cmd: DeskCommand) -> BankResult<Value> {
        self.store.begin_unit()?;
        let result = self.dispatch(cmd).and_then(|v| {
            self.store.commit_unit()?;
            Ok(v)
        });
        if result.is_err() {
            if let Err(e) = self.store.rollback_unit() {
                warn!("rollback failed: {e}");
            }
        }
        result
    }

    fn dispatch(&mut self, cmd: DeskCommand) -> BankResult<Value> {
        use DeskCommand as C;
        match cmd {
            // ── Ledger ────────────────────────────────────────────
            C::CreateTransaction(req) => {
                let out = self.ledger().create(&req)?;
                self.committed(out)
            }
            C::UpdateTransaction { txn_id, status, amount } => {
                let out = self.ledger().update(&txn_id, status, amount)?;
                self.committed(out)
            }
            C::DeleteTransaction { txn_id } => {
                let event = self.ledger().delete(&txn_id)?;
                self.deleted(event)
            }
            C::EditableTransactions { customer_id } => {
                Ok(serde_json::to_value(self.ledger().editable_transactions(&customer_id)?)?)
            }
            C::ListTransactions { customer_id } => {
                crate::lookup::require_customer(&self.store, &customer_id)?;
                Ok(serde_json::to_value(self.store.txns_for_customer(&customer_id, &[])?)?)
            }

            // ── Customers ─────────────────────────────────────────
            C::CreateCustomer(form) => {
                let out = self.crud().create_customer(&form)?;
                self.committed(out)
            }
            C::GetCustomer { customer_id } => {
                Ok(serde_json::to_value(self.crud().customer(&customer_id)?)?)
            }
            C::FindCustomers { name } => {
                Ok(serde_json::to_value(self.crud().find_customers(&name)?)?)
            }
            C::ListCustomers => Ok(serde_json::to_value(self.crud().customers()?)?),
            C::UpdateCustomer { customer_id, patch } => {
                let out = self.crud().update_customer(&customer_id, &patch)?;
                self.committed(out)
            }
            C::DeleteCustomer { customer_id } => {
                let event = self.crud().delete_customer(&customer_id)?;
                self.deleted(event)
            }

            // ── Branches ──────────────────────────────────────────
            C::CreateBranch(form) => {
                let out = self.crud().create_branch(&form)?;
                self.committed(out)
            }
            C::ListBranches => Ok(serde_json::to_value(self.crud().branches()?)?),
            C::UpdateBranch { branch_id, patch } => {
                let out = self.crud().update_branch(branch_id, &patch)?;
                self.committed(out)
            }
            C::DeleteBranch { branch_id } => {
                let event = self.crud().delete_branch(branch_id)?;
                self.deleted(event)
            }

            // ── Accounts ──────────────────────────────────────────
            C::OpenAccount(form) => {
                let out = self.crud().create_account(&form)?;
                self.committed(out)
            }
            C::ListAccounts { customer_id } => {
                Ok(serde_json::to_value(self.crud().accounts_for(&customer_id)?)?)
            }
            C::DeleteAccount { account_id } => {
                let event = self.crud().delete_account(account_id)?;
                self.deleted(event)
            }

            // ── Loans ─────────────────────────────────────────────
            C::CreateLoan(form) => {
                let out = self.crud().create_loan(&form)?;
                self.committed(out)
            }
            C::ListLoans { customer_id } => {
                Ok(serde_json::to_value(self.crud().loans_for(&customer_id)?)?)
            }
            C::UpdateLoan { loan_id, patch } => {
                let out = self.crud().update_loan(loan_id, &patch)?;
                self.committed(out)
            }
            C::DeleteLoan { loan_id } => {
                let event = self.crud().delete_loan(loan_id)?;
                self.deleted(event)
            }

            // ── Credit cards ──────────────────────────────────────
            C::IssueCard(form) => {
                let card_number = self.draw_card_number(form.card_network);
                let out = self.crud().create_card(&form, &card_number)?;
                self.committed(out)
            }
            C::ListCards { customer_id } => {
                Ok(serde_json::to_value(self.crud().cards_for(&customer_id)?)?)
            }
            C::UpdateCard { card_id, patch } => {
                let out = self.crud().update_card(card_id, &patch)?;
                self.committed(out)
            }
            C::DeleteCard { card_id } => {
                let event = self.crud().delete_card(card_id)?;
                self.deleted(event)
            }

            // ── Support tickets ───────────────────────────────────
            C::OpenTicket(form) => {
                let out = self.crud().create_ticket(&form)?;
                self.committed(out)
            }
            C::ListTickets { customer_id } => {
                Ok(serde_json::to_value(self.crud().tickets_for(&customer_id)?)?)
            }
            C::UpdateTicket { ticket_id, update } => {
                let out = self.crud().update_ticket(&ticket_id, &update)?;
                self.committed(out)
            }
            C::DeleteTicket { ticket_id } => {
                let event = self.crud().delete_ticket(&ticket_id)?;
                self.deleted(event)
            }

            // ── Explorer, reports, audit ──────────────────────────
            C::Browse { table, limit, filter } => {
                let limit = limit.unwrap_or(self.config.explorer_row_limit);
                Ok(serde_json::to_value(self.store.browse(table, filter.as_ref(), limit)?)?)
            }
            C::FilterChoices { table, column } => {
                Ok(serde_json::to_value(self.filter_choices(table, &column)?)?)
            }
            C::RowCounts => Ok(serde_json::to_value(self.row_counts(&Table::ALL)?)?),
            C::RunReport { report } => {
                Ok(serde_json::to_value(ReportResult::run(report, &self.store)?)?)
            }
            C::ListReports => {
                let listing: Vec<Value> = Report::ALL
                    .iter()
                    .map(|r| {
                        json!({
                            "id": r.id(),
                            "category": r.category().label(),
                            "title": r.title(),
                        })
                    })
                    .collect();
                Ok(Value::Array(listing))
            }
            C::RecentEvents { limit } => {
                Ok(serde_json::to_value(self.store.recent_events(limit)?)?)
            }
            C::LoadSeed { dir } => {
                let path = Path::new(&dir);
                if !path.is_dir() {
                    return Err(BankError::not_found("seed directory", dir));
                }
                Ok(serde_json::to_value(self.load_seed(path)?)?)
            }
        }
    }
}
