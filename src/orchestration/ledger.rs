use crate::db::Repository;
use crate::domain::{Decimal, TimeMs, Vault, VaultEntry};
use crate::engine::fold_entries;
use crate::rates::resolver::value_now;
use crate::rates::RateResolver;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Vault bookkeeping on top of the append-only entry store.
#[derive(Debug, Clone)]
pub struct VaultLedger {
    repo: Arc<Repository>,
    resolver: Arc<RateResolver>,
}

/// Derived state of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
    pub total_deposited_usd: Decimal,
    pub total_withdrawn_usd: Decimal,
    pub aum_usd: Decimal,
    /// Net units per asset key, zero balances omitted.
    pub balances: BTreeMap<String, Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_valuation_at: Option<TimeMs>,
}

impl VaultLedger {
    pub fn new(repo: Arc<Repository>, resolver: Arc<RateResolver>) -> Self {
        Self { repo, resolver }
    }

    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    /// Create the vault if it does not exist. Returns true if it was created.
    pub async fn ensure_vault(&self, name: &str) -> Result<bool, LedgerError> {
        let name = validate_name(name)?;
        let created = self.repo.insert_vault_if_absent(name, TimeMs::now()).await?;
        if created {
            info!("Created vault {}", name);
        }
        Ok(created)
    }

    /// Append an entry as given. No status or balance checks are made.
    pub async fn add_vault_entry(&self, entry: VaultEntry) -> Result<VaultEntry, LedgerError> {
        validate_name(&entry.vault)?;
        let stored = self.repo.append_entry(&entry).await?;
        debug!(
            "Vault {} {} {} {} (${})",
            stored.vault, stored.entry_type, stored.amount, stored.asset, stored.usd_value
        );
        Ok(stored)
    }

    pub async fn vault_stats(&self, name: &str) -> Result<VaultStats, LedgerError> {
        let entries = self.repo.find_entries(name).await?;
        let fold = fold_entries(&entries);

        let aum_usd = match fold.rolling_aum() {
            Some(aum) => aum,
            None => join_all(
                fold.open_balances()
                    .map(|(asset, units)| value_now(&self.resolver, asset, *units)),
            )
            .await
            .into_iter()
            .sum(),
        };

        Ok(VaultStats {
            total_deposited_usd: fold.total_deposited_usd,
            total_withdrawn_usd: fold.total_withdrawn_usd,
            aum_usd,
            balances: fold
                .open_balances()
                .map(|(asset, units)| (asset.key(), *units))
                .collect(),
            last_valuation_at: fold.last_valuation_at,
        })
    }

    /// Close an active vault. Entries are kept.
    pub async fn end_vault(&self, name: &str) -> Result<Vault, LedgerError> {
        let vault = self
            .repo
            .get_vault(name)
            .await?
            .ok_or_else(|| LedgerError::VaultNotFound(name.to_string()))?;
        if !vault.is_active() {
            return Err(LedgerError::VaultClosed(name.to_string()));
        }

        if !self.repo.close_vault(name, TimeMs::now()).await? {
            return Err(LedgerError::VaultClosed(name.to_string()));
        }
        info!("Closed vault {}", name);

        self.repo
            .get_vault(name)
            .await?
            .ok_or_else(|| LedgerError::VaultNotFound(name.to_string()))
    }

    pub async fn get_vault(&self, name: &str) -> Result<Vault, LedgerError> {
        self.repo
            .get_vault(name)
            .await?
            .ok_or_else(|| LedgerError::VaultNotFound(name.to_string()))
    }

    pub async fn list_vaults(&self) -> Result<Vec<Vault>, LedgerError> {
        Ok(self.repo.list_vaults().await?)
    }

    pub async fn entries(&self, name: &str) -> Result<Vec<VaultEntry>, LedgerError> {
        Ok(self.repo.find_entries(name).await?)
    }
}

fn validate_name(name: &str) -> Result<&str, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidName);
    }
    Ok(trimmed)
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("vault name must not be empty")]
    InvalidName,
    #[error("vault not found: {0}")]
    VaultNotFound(String),
    #[error("vault already closed: {0}")]
    VaultClosed(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
