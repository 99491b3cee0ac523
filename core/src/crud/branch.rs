use super::{in_range, non_negative, optional, parse_date, required, Crud};
use crate::{
    clock::DATE_FORMAT,
    error::{BankError, BankResult},
    event::DeskEvent,
    store::BranchRow,
    types::BranchId,
};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchForm {
    pub branch_name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub manager_name: Option<String>,
    pub total_employees: i64,
    pub branch_revenue: f64,
    /// Defaults to today.
    #[serde(default)]
    pub opening_date: Option<String>,
    pub performance_rating: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchPatch {
    pub branch_name: Option<String>,
    pub city: Option<String>,
    pub manager_name: Option<String>,
    pub total_employees: Option<i64>,
    pub branch_revenue: Option<f64>,
    pub opening_date: Option<String>,
    pub performance_rating: Option<i64>,
}

impl Crud<'_> {
    pub fn create_branch(&self, form: &BranchForm) -> BankResult<(BranchRow, DeskEvent)> {
        let clean = BranchForm {
            branch_name: required("branch name", &form.branch_name)?,
            city: optional(form.city.as_deref()),
            manager_name: optional(form.manager_name.as_deref()),
            total_employees: in_range("total employees", form.total_employees, 1, i64::MAX)?,
            branch_revenue: non_negative("branch revenue", form.branch_revenue)?,
            opening_date: form.opening_date.clone(),
            performance_rating: in_range("performance rating", form.performance_rating, 1, 5)?,
        };
        let opening_date = match optional(form.opening_date.as_deref()) {
            Some(d) => parse_date("opening date", &d)?.format(DATE_FORMAT).to_string(),
            None => self.clock.date_string(),
        };

        self.store.atomically(|store| {
            if store.branch_named(&clean.branch_name)?.is_some() {
                return Err(BankError::DuplicateEntity {
                    entity: "branch",
                    detail: format!("'{}' already exists", clean.branch_name),
                });
            }
            let branch_id = store.insert_branch(&clean, &opening_date)?;
            let row = store
                .branch(branch_id)?
                .ok_or_else(|| BankError::not_found("branch", branch_id))?;
            info!("branch {branch_id} ({}) created", row.branch_name);
            let event = DeskEvent::BranchCreated {
                branch_id,
                branch_name: row.branch_name.clone(),
            };
            Ok((row, event))
        })
    }

    pub fn branch(&self, branch_id: BranchId) -> BankResult<BranchRow> {
        self.store
            .branch(branch_id)?
            .ok_or_else(|| BankError::not_found("branch", branch_id))
    }

    pub fn branches(&self) -> BankResult<Vec<BranchRow>> {
        self.store.branches()
    }

    /// Renaming a branch that loans still point at is an IntegrityError.
    pub fn update_branch(
        &self,
        branch_id: BranchId,
        patch: &BranchPatch,
    ) -> BankResult<(BranchRow, DeskEvent)> {
        self.store.atomically(|store| {
            let mut row = self.branch(branch_id)?;
            if let Some(name) = &patch.branch_name {
                let name = required("branch name", name)?;
                if name != row.branch_name && store.branch_named(&name)?.is_some() {
                    return Err(BankError::DuplicateEntity {
                        entity: "branch",
                        detail: format!("'{name}' already exists"),
                    });
                }
                row.branch_name = name;
            }
            if patch.city.is_some() {
                row.city = optional(patch.city.as_deref());
            }
            if patch.manager_name.is_some() {
                row.manager_name = optional(patch.manager_name.as_deref());
            }
            if let Some(n) = patch.total_employees {
                row.total_employees = Some(in_range("total employees", n, 1, i64::MAX)?);
            }
            if let Some(r) = patch.branch_revenue {
                row.branch_revenue = Some(non_negative("branch revenue", r)?);
            }
            if let Some(d) = &patch.opening_date {
                row.opening_date =
                    Some(parse_date("opening date", d)?.format(DATE_FORMAT).to_string());
            }
            if let Some(r) = patch.performance_rating {
                row.performance_rating = Some(in_range("performance rating", r, 1, 5)?);
            }
            store.update_branch(&row)?;
            info!("branch {branch_id} updated");
            Ok((row, DeskEvent::BranchUpdated { branch_id }))
        })
    }

    pub fn delete_branch(&self, branch_id: BranchId) -> BankResult<DeskEvent> {
        self.store.atomically(|store| {
            if store.delete_branch(branch_id)? == 0 {
                return Err(BankError::not_found("branch", branch_id));
            }
            info!("branch {branch_id} deleted");
            Ok(DeskEvent::BranchDeleted { branch_id })
        })
    }
}
