use crate::types::Money;
use serde::{Deserialize, Serialize};

/// What to do when a verified payment exceeds what is still owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// Write the negative principal / card balance as a credit owed to
    /// the customer.
    AllowCredit,
    /// Stop at zero; the excess is not applied.
    ClampAtZero,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// SQLite file backing the desk.
    pub db_path: String,
    /// Lowest balance a debit may leave an account at.
    pub min_balance_floor: Money,
    pub overpayment: OverpaymentPolicy,
    /// Years from issue to expiry for newly issued credit cards.
    pub card_validity_years: u32,
    /// Rows shown per table in the explorer.
    pub explorer_row_limit: usize,
    /// Fixed seed for card number generation. `None` seeds from the clock.
    pub card_seed: Option<u64>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            db_path: "Database/BankSight.db".into(),
            min_balance_floor: 1000.0,
            overpayment: OverpaymentPolicy::AllowCredit,
            card_validity_years: 15,
            explorer_row_limit: 100,
            card_seed: None,
        }
    }
}

impl DeskConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// In tests, use DeskConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// In-memory database, default policy, deterministic card numbers.
    pub fn default_test() -> Self {
        Self {
            db_path: ":memory:".into(),
            card_seed: Some(42),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.min_balance_floor.is_finite() || self.min_balance_floor < 0.0 {
            anyhow::bail!("min_balance_floor must be a non-negative number");
        }
        if self.card_validity_years == 0 {
            anyhow::bail!("card_validity_years must be at least 1");
        }
        if self.explorer_row_limit == 0 {
            anyhow::bail!("explorer_row_limit must be at least 1");
        }
        Ok(())
    }
}
