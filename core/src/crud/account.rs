use super::{non_negative, Crud};
use crate::{
    error::{BankError, BankResult},
    event::DeskEvent,
    lookup,
    store::AccountRow,
    types::{round_cents, AccountId, CustomerId, Money},
};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountForm {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub opening_balance: Money,
}

impl Crud<'_> {
    /// Opening balance is the only balance CRUD ever writes.
    pub fn create_account(&self, form: &AccountForm) -> BankResult<(AccountRow, DeskEvent)> {
        let opening = round_cents(non_negative("opening balance", form.opening_balance)?);
        self.store.atomically(|store| {
            lookup::require_customer(store, &form.customer_id)?;
            let account_id =
                store.insert_account(&form.customer_id, opening, &self.clock.date_string())?;
            let row = lookup::require_account(store, account_id)?;
            info!(
                "account {account_id} opened for {} with {opening:.2}",
                form.customer_id
            );
            let event = DeskEvent::AccountOpened {
                account_id,
                customer_id: form.customer_id.clone(),
                opening_balance: opening,
            };
            Ok((row, event))
        })
    }

    pub fn account(&self, account_id: AccountId) -> BankResult<AccountRow> {
        lookup::require_account(self.store, account_id)
    }

    pub fn accounts_for(&self, customer_id: &str) -> BankResult<Vec<AccountRow>> {
        lookup::require_customer(self.store, customer_id)?;
        self.store.accounts_for_customer(customer_id)
    }

    pub fn accounts(&self) -> BankResult<Vec<AccountRow>> {
        self.store.accounts()
    }

    /// Fails with IntegrityError while a credit card is linked to the
    /// account.
    pub fn delete_account(&self, account_id: AccountId) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            if store.delete_account(account_id)? == 0 {
                return Err(BankError::not_found("account", account_id));
            }
            info!("account {account_id} deleted");
            Ok(DeskEvent::AccountDeleted { account_id })
        })
    }
}
