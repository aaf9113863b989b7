use crate::db::Repository;
use crate::domain::{
    Asset, Decimal, EntryType, Position, PositionExit, RealizedPnl, TimeMs, UnstakeRequest,
    VaultEntry,
};
use crate::engine::{apply_unstake, validate_stake, AccountingViolation};
use crate::orchestration::ledger::{LedgerError, VaultLedger};
use crate::rates::RateResolver;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Input to `stake`. A missing `cost_usd` is priced at the rate on `at`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeCommand {
    pub asset: Asset,
    pub account: String,
    pub qty: Decimal,
    #[serde(default)]
    pub cost_usd: Option<Decimal>,
    pub at: TimeMs,
    #[serde(default)]
    pub vault: Option<String>,
}

/// Input to `unstake`. A missing `exit_value_usd` is priced at the rate on `at`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeCommand {
    #[serde(default)]
    pub qty: Option<Decimal>,
    #[serde(default)]
    pub exit_value_usd: Option<Decimal>,
    pub at: TimeMs,
    #[serde(default)]
    pub close_all: bool,
}

/// Stake/unstake lifecycle over persisted positions.
#[derive(Debug, Clone)]
pub struct PositionAccountant {
    repo: Arc<Repository>,
    resolver: Arc<RateResolver>,
    ledger: VaultLedger,
}

impl PositionAccountant {
    pub fn new(repo: Arc<Repository>, resolver: Arc<RateResolver>) -> Self {
        let ledger = VaultLedger::new(repo.clone(), resolver.clone());
        Self {
            repo,
            resolver,
            ledger,
        }
    }

    pub fn ledger(&self) -> &VaultLedger {
        &self.ledger
    }

    /// Open a new position. When a vault is named it is created if needed and
    /// receives a DEPOSIT entry for the stake, written with the position.
    pub async fn stake(&self, cmd: StakeCommand) -> Result<Position, AccountingError> {
        let asset = Asset::new(cmd.asset.asset_type, &cmd.asset.symbol);
        let cost_usd = match cmd.cost_usd {
            Some(cost) => cost,
            None => {
                self.resolver
                    .get_rate_usd(&asset, Some(cmd.at))
                    .await
                    .value_of(cmd.qty)
            }
        };
        validate_stake(cmd.qty, cost_usd)?;

        let mut position = Position::open(
            Uuid::new_v4().to_string(),
            asset,
            cmd.account,
            cmd.qty,
            cost_usd,
            cmd.at,
        );
        let vault = cmd
            .vault
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        position.vault = vault.clone();

        let deposit = match &vault {
            Some(vault) => {
                self.ledger.ensure_vault(vault).await?;
                Some(
                    VaultEntry::new(
                        vault,
                        EntryType::Deposit,
                        position.asset.clone(),
                        position.deposit_qty,
                        position.deposit_cost,
                        position.deposit_date,
                    )
                    .with_account(position.account.clone())
                    .with_reference(format!("stake:{}", position.id)),
                )
            }
            None => None,
        };
        self.repo.open_position(&position, deposit.as_ref()).await?;
        info!(
            "Staked {} {} for {} at cost ${} (position {})",
            position.deposit_qty, position.asset, position.account, position.deposit_cost, position.id
        );

        Ok(position)
    }

    /// Exit part or all of a position and realize PnL against its original
    /// cost basis.
    ///
    /// The position update, its exit line and any vault WITHDRAW entry are
    /// written together. Fails with `Conflict` if another exit of the same
    /// position was recorded between the read and the write; nothing is
    /// persisted then.
    pub async fn unstake(
        &self,
        position_id: &str,
        cmd: UnstakeCommand,
    ) -> Result<(Position, RealizedPnl), AccountingError> {
        let position = self
            .repo
            .find_position(position_id)
            .await?
            .ok_or_else(|| AccountingError::NotFound(position_id.to_string()))?;
        if !position.is_open() {
            return Err(AccountingViolation::PositionClosed(position.id).into());
        }

        let exit_value_usd = match cmd.exit_value_usd {
            Some(value) => value,
            None => {
                let qty = if cmd.close_all {
                    position.remaining_qty
                } else {
                    cmd.qty.ok_or(AccountingViolation::MissingQuantity)?
                };
                self.resolver
                    .get_rate_usd(&position.asset, Some(cmd.at))
                    .await
                    .value_of(qty)
            }
        };

        let request = UnstakeRequest {
            qty: cmd.qty,
            exit_value_usd,
            at: cmd.at,
            close_all: cmd.close_all,
        };
        let (next, pnl) = apply_unstake(&position, &request)?;
        let exit = PositionExit::from_realized(&position.id, next.exit_count, &request, &pnl);

        let withdraw = next.vault.as_deref().map(|vault| {
            VaultEntry::new(
                vault,
                EntryType::Withdraw,
                next.asset.clone(),
                pnl.qty,
                pnl.exit_value_usd,
                cmd.at,
            )
            .with_account(next.account.clone())
            .with_reference(format!("unstake:{}:{}", next.id, exit.seq))
        });

        if !self
            .repo
            .record_unstake(&next, &exit, withdraw.as_ref(), position.exit_count)
            .await?
        {
            return Err(AccountingError::Conflict(position.id));
        }
        info!(
            "Unstaked {} {} from position {} for ${} (pnl ${}, roi {}%{})",
            pnl.qty,
            next.asset,
            next.id,
            pnl.exit_value_usd,
            pnl.pnl,
            pnl.roi_pct.inner().round_dp(4),
            if pnl.closed { ", closed" } else { "" }
        );

        Ok((next, pnl))
    }

    pub async fn get_position(&self, position_id: &str) -> Result<Position, AccountingError> {
        self.repo
            .find_position(position_id)
            .await?
            .ok_or_else(|| AccountingError::NotFound(position_id.to_string()))
    }

    pub async fn list_positions(
        &self,
        account: Option<&str>,
        open_only: bool,
    ) -> Result<Vec<Position>, AccountingError> {
        Ok(self.repo.list_positions(account, open_only).await?)
    }

    pub async fn list_exits(&self, position_id: &str) -> Result<Vec<PositionExit>, AccountingError> {
        Ok(self.repo.list_exits(position_id).await?)
    }
}

#[derive(Debug, Error)]
pub enum AccountingError {
    #[error("position not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Violation(#[from] AccountingViolation),
    #[error("position {0} was modified concurrently, retry")]
    Conflict(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
