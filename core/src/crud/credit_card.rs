use super::{non_negative, optional, require_branch, Crud};
use crate::{
    clock::DATE_FORMAT,
    error::{BankError, BankResult},
    event::DeskEvent,
    lookup,
    rng::luhn_valid,
    store::CardRow,
    types::{AccountId, CardId, CardNetwork, CardStatus, CardType, CustomerId, Money},
};
use chrono::{Months, NaiveDate};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardForm {
    pub customer_id: CustomerId,
    /// Linked account; must belong to the customer.
    pub account_id: AccountId,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub card_type: CardType,
    pub card_network: CardNetwork,
    #[serde(default)]
    pub credit_limit: Money,
    #[serde(default = "default_status")]
    pub status: CardStatus,
}

fn default_status() -> CardStatus {
    CardStatus::Active
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardPatch {
    pub branch_name: Option<String>,
    pub account_id: Option<AccountId>,
    pub card_type: Option<CardType>,
    pub card_network: Option<CardNetwork>,
    pub credit_limit: Option<Money>,
    pub status: Option<CardStatus>,
}

/// Not past its expiry date and not Blocked or Expired. Unparseable
/// stored values do not disqualify a card.
pub fn is_currently_valid(card: &CardRow, today: NaiveDate) -> bool {
    let usable = card
        .status
        .as_deref()
        .and_then(|s| s.parse::<CardStatus>().ok())
        .map_or(true, |s| s.is_usable());
    let unexpired = card
        .expiry_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
        .map_or(true, |expiry| expiry >= today);
    usable && unexpired
}

fn same_type(card: &CardRow, card_type: CardType) -> bool {
    card.card_type
        .as_deref()
        .and_then(|t| t.parse::<CardType>().ok())
        == Some(card_type)
}

impl Crud<'_> {
    /// One currently valid card per type per customer.
    fn check_one_valid_per_type(
        &self,
        customer_id: &str,
        card_type: CardType,
        excluding: Option<CardId>,
    ) -> BankResult<()> {
        let today = self.clock.today();
        let clash = self
            .store
            .cards_for_customer(customer_id)?
            .into_iter()
            .filter(|c| Some(c.card_id) != excluding)
            .find(|c| same_type(c, card_type) && is_currently_valid(c, today));
        match clash {
            Some(existing) => Err(BankError::DuplicateEntity {
                entity: "credit card",
                detail: format!(
                    "customer {customer_id} already holds a valid {card_type} card ({})",
                    existing.card_id
                ),
            }),
            None => Ok(()),
        }
    }

    /// `card_number` is drawn for this request only and is not reused.
    pub fn create_card(&self, form: &CardForm, card_number: &str) -> BankResult<(CardRow, DeskEvent)> {
        if !luhn_valid(card_number) {
            return Err(BankError::invalid(format!(
                "card number {card_number} fails the Luhn check"
            )));
        }
        let mut clean = form.clone();
        clean.branch_name = optional(form.branch_name.as_deref());
        clean.credit_limit = non_negative("credit limit", form.credit_limit)?;

        let issued = self.clock.today();
        let expiry = issued
            .checked_add_months(Months::new(12 * self.config.card_validity_years))
            .ok_or_else(|| BankError::invalid("card expiry date is out of range"))?;

        self.store.atomically(|store| {
            lookup::require_customer(store, &clean.customer_id)?;
            lookup::owned_account(store, &clean.customer_id, clean.account_id)?;
            if let Some(branch) = clean.branch_name.as_deref() {
                require_branch(store, branch)?;
            }
            if clean.status.is_usable() {
                self.check_one_valid_per_type(&clean.customer_id, clean.card_type, None)?;
            }
            let card_id = store.insert_card(
                &clean,
                card_number,
                &issued.format(DATE_FORMAT).to_string(),
                &expiry.format(DATE_FORMAT).to_string(),
            )?;
            let row = self.card(card_id)?;
            info!(
                "card {card_id} ({} {}) issued to {}",
                clean.card_network, clean.card_type, clean.customer_id
            );
            let event = DeskEvent::CardIssued {
                card_id,
                customer_id: clean.customer_id.clone(),
                card_type: clean.card_type.to_string(),
            };
            Ok((row, event))
        })
    }

    pub fn card(&self, card_id: CardId) -> BankResult<CardRow> {
        self.store
            .card(card_id)?
            .ok_or_else(|| BankError::not_found("credit card", card_id))
    }

    pub fn cards_for(&self, customer_id: &str) -> BankResult<Vec<CardRow>> {
        lookup::require_customer(self.store, customer_id)?;
        self.store.cards_for_customer(customer_id)
    }

    pub fn cards(&self) -> BankResult<Vec<CardRow>> {
        self.store.cards()
    }

    pub fn update_card(&self, card_id: CardId, patch: &CardPatch) -> BankResult<(CardRow, DeskEvent)> {
        self.store.atomically(|store| {
            let mut row = self.card(card_id)?;
            if patch.branch_name.is_some() {
                row.branch_name = optional(patch.branch_name.as_deref());
                if let Some(branch) = row.branch_name.as_deref() {
                    require_branch(store, branch)?;
                }
            }
            if let Some(account_id) = patch.account_id {
                lookup::owned_account(store, &row.customer_id, account_id)?;
                row.account_id = account_id;
            }
            if let Some(card_type) = patch.card_type {
                row.card_type = Some(card_type.to_string());
            }
            if let Some(network) = patch.card_network {
                row.card_network = Some(network.to_string());
            }
            if let Some(limit) = patch.credit_limit {
                row.credit_limit = Some(non_negative("credit limit", limit)?);
            }
            if let Some(status) = patch.status {
                row.status = Some(status.to_string());
            }
            if is_currently_valid(&row, self.clock.today()) {
                if let Some(card_type) = row.card_type.as_deref().and_then(|t| t.parse::<CardType>().ok()) {
                    self.check_one_valid_per_type(&row.customer_id, card_type, Some(card_id))?;
                }
            }
            store.update_card(&row)?;
            info!("card {card_id} updated");
            Ok((row, DeskEvent::CardUpdated { card_id }))
        })
    }

    pub fn delete_card(&self, card_id: CardId) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            if store.delete_card(card_id)? == 0 {
                return Err(BankError::not_found("credit card", card_id));
            }
            info!("card {card_id} deleted");
            Ok(DeskEvent::CardDeleted { card_id })
        })
    }
}
