use super::{in_range, optional, required, Crud};
use crate::{
    error::{BankError, BankResult},
    event::DeskEvent,
    lookup,
    store::CustomerRow,
    types::{CustomerAccountType, Gender},
};
use log::info;
use serde::{Deserialize, Serialize};

pub const MIN_AGE: i64 = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerForm {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub gender: Gender,
    pub age: i64,
    #[serde(default)]
    pub city: Option<String>,
    pub account_type: CustomerAccountType,
}

/// Fields left as None keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    pub city: Option<String>,
    pub account_type: Option<CustomerAccountType>,
}

/// Ten digits, no separators.
fn check_phone(phone: Option<String>) -> BankResult<Option<String>> {
    match phone {
        Some(p) if p.len() != 10 || !p.bytes().all(|b| b.is_ascii_digit()) => Err(
            BankError::invalid(format!("phone must be 10 digits, got '{p}'")),
        ),
        other => Ok(other),
    }
}

impl Crud<'_> {
    pub fn create_customer(&self, form: &CustomerForm) -> BankResult<(CustomerRow, DeskEvent)> {
        let name = required("name", &form.name)?;
        let age = in_range("age", form.age, MIN_AGE, 150)?;
        let phone = check_phone(optional(form.phone.as_deref()))?;

        self.store.atomically(|store| {
            if store.customer_identity_taken(
                &name,
                phone.as_deref(),
                form.account_type.as_str(),
                None,
            )? {
                return Err(BankError::DuplicateEntity {
                    entity: "customer",
                    detail: format!(
                        "{name} / {} / {} already exists",
                        phone.as_deref().unwrap_or("-"),
                        form.account_type
                    ),
                });
            }
            let row = CustomerRow {
                customer_id: lookup::next_customer_id(store)?,
                name: name.clone(),
                phone: phone.clone(),
                gender: Some(form.gender.to_string()),
                age: Some(age),
                city: optional(form.city.as_deref()),
                account_type: Some(form.account_type.to_string()),
                join_date: Some(self.clock.date_string()),
            };
            store.insert_customer(&row)?;
            info!("customer {} ({}) created", row.customer_id, row.name);
            let event = DeskEvent::CustomerCreated {
                customer_id: row.customer_id.clone(),
                name: row.name.clone(),
            };
            Ok((row, event))
        })
    }

    pub fn customer(&self, customer_id: &str) -> BankResult<CustomerRow> {
        self.store
            .customer(customer_id)?
            .ok_or_else(|| BankError::not_found("customer", customer_id))
    }

    pub fn customers(&self) -> BankResult<Vec<CustomerRow>> {
        self.store.customers()
    }

    pub fn find_customers(&self, name: &str) -> BankResult<Vec<CustomerRow>> {
        self.store.customers_named(name.trim())
    }

    pub fn update_customer(
        &self,
        customer_id: &str,
        patch: &CustomerPatch,
    ) -> BankResult<(CustomerRow, DeskEvent)> {
        self.store.atomically(|store| {
            let mut row = self.customer(customer_id)?;
            if let Some(name) = &patch.name {
                row.name = required("name", name)?;
            }
            if patch.phone.is_some() {
                row.phone = check_phone(optional(patch.phone.as_deref()))?;
            }
            if let Some(gender) = patch.gender {
                row.gender = Some(gender.to_string());
            }
            if let Some(age) = patch.age {
                row.age = Some(in_range("age", age, MIN_AGE, 150)?);
            }
            if patch.city.is_some() {
                row.city = optional(patch.city.as_deref());
            }
            if let Some(account_type) = patch.account_type {
                row.account_type = Some(account_type.to_string());
            }
            if let Some(account_type) = row.account_type.as_deref() {
                if store.customer_identity_taken(
                    &row.name,
                    row.phone.as_deref(),
                    account_type,
                    Some(customer_id),
                )? {
                    return Err(BankError::DuplicateEntity {
                        entity: "customer",
                        detail: format!("another {} with the same phone and account type", row.name),
                    });
                }
            }
            store.update_customer(&row)?;
            info!("customer {customer_id} updated");
            let event = DeskEvent::CustomerUpdated { customer_id: customer_id.to_string() };
            Ok((row, event))
        })
    }

    /// Fails with IntegrityError while loans or cards still reference the
    /// customer. Accounts, ledger entries and tickets go with it.
    pub fn delete_customer(&self, customer_id: &str) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            if store.delete_customer(customer_id)? == 0 {
                return Err(BankError::not_found("customer", customer_id));
            }
            info!("customer {customer_id} deleted");
            Ok(DeskEvent::CustomerDeleted { customer_id: customer_id.to_string() })
        })
    }
}
