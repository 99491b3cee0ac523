use super::{in_range, optional, require_branch, Crud};
use crate::{
    error::{BankError, BankResult},
    event::DeskEvent,
    lookup,
    store::TicketRow,
    types::{
        AccountId, CustomerId, IssueCategory, LoanId, TicketChannel, TicketPriority, TicketStatus,
    },
};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketForm {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub loan_id: Option<LoanId>,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub issue_category: IssueCategory,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: TicketPriority,
    #[serde(default = "default_status")]
    pub status: TicketStatus,
    #[serde(default)]
    pub support_agent: Option<String>,
    pub channel: TicketChannel,
    #[serde(default)]
    pub customer_rating: Option<i64>,
}

fn default_status() -> TicketStatus {
    TicketStatus::Open
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    pub status: TicketStatus,
    #[serde(default)]
    pub resolution_remarks: Option<String>,
    /// Stamp today's date as the close date.
    #[serde(default)]
    pub close_now: bool,
}

impl Crud<'_> {
    pub fn create_ticket(&self, form: &TicketForm) -> BankResult<(TicketRow, DeskEvent)> {
        let rating = form
            .customer_rating
            .map(|r| in_range("customer rating", r, 1, 5))
            .transpose()?;

        self.store.atomically(|store| {
            lookup::require_customer(store, &form.customer_id)?;
            if let Some(account_id) = form.account_id {
                lookup::owned_account(store, &form.customer_id, account_id)?;
            }
            if let Some(loan_id) = form.loan_id {
                store
                    .loan(loan_id)?
                    .filter(|l| l.customer_id == form.customer_id)
                    .ok_or_else(|| BankError::not_found("loan for customer", loan_id))?;
            }
            let branch_name = optional(form.branch_name.as_deref());
            if let Some(branch) = branch_name.as_deref() {
                require_branch(store, branch)?;
            }
            let row = TicketRow {
                ticket_id: lookup::next_ticket_id(store)?,
                customer_id: form.customer_id.clone(),
                account_id: form.account_id,
                loan_id: form.loan_id,
                branch_name,
                issue_category: Some(form.issue_category.to_string()),
                description: optional(form.description.as_deref()),
                date_opened: Some(self.clock.date_string()),
                date_closed: None,
                priority: Some(form.priority.to_string()),
                status: Some(form.status.to_string()),
                resolution_remarks: None,
                support_agent: optional(form.support_agent.as_deref()),
                channel: Some(form.channel.to_string()),
                customer_rating: rating,
            };
            store.insert_ticket(&row)?;
            info!("ticket {} opened for {}", row.ticket_id, row.customer_id);
            let event = DeskEvent::TicketOpened {
                ticket_id: row.ticket_id.clone(),
                customer_id: row.customer_id.clone(),
            };
            Ok((row, event))
        })
    }

    pub fn ticket(&self, ticket_id: &str) -> BankResult<TicketRow> {
        self.store
            .ticket(ticket_id)?
            .ok_or_else(|| BankError::not_found("support ticket", ticket_id))
    }

    pub fn tickets_for(&self, customer_id: &str) -> BankResult<Vec<TicketRow>> {
        lookup::require_customer(self.store, customer_id)?;
        self.store.tickets_for_customer(customer_id)
    }

    pub fn update_ticket(
        &self,
        ticket_id: &str,
        update: &TicketUpdate,
    ) -> BankResult<(TicketRow, DeskEvent)> {
        self.store.atomically(|store| {
            let current = self.ticket(ticket_id)?;
            let remarks = optional(update.resolution_remarks.as_deref())
                .or(current.resolution_remarks);
            let closed = if update.close_now {
                Some(self.clock.date_string())
            } else {
                current.date_closed
            };
            store.update_ticket_resolution(
                ticket_id,
                update.status.as_str(),
                remarks.as_deref(),
                closed.as_deref(),
            )?;
            let row = self.ticket(ticket_id)?;
            info!("ticket {ticket_id} now {}", update.status);
            let event = DeskEvent::TicketUpdated {
                ticket_id: ticket_id.to_string(),
                status: update.status.to_string(),
            };
            Ok((row, event))
        })
    }

    pub fn delete_ticket(&self, ticket_id: &str) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            if store.delete_ticket(ticket_id)? == 0 {
                return Err(BankError::not_found("support ticket", ticket_id));
            }
            info!("ticket {ticket_id} deleted");
            Ok(DeskEvent::TicketDeleted { ticket_id: ticket_id.to_string() })
        })
    }
}
