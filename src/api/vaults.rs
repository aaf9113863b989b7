use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::rates::parse_time;
use crate::api::AppState;
use crate::domain::{Asset, Decimal, EntryType, TimeMs, Vault, VaultEntry};
use crate::error::AppError;
use crate::orchestration::{VaultPerformance, VaultStats};

#[derive(Debug, Deserialize)]
pub struct CreateVaultRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVaultResponse {
    pub name: String,
    pub created: bool,
}

/// Body of a manual ledger entry. `usdValue` defaults to `amount` priced at
/// `at`, and `at` defaults to now.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEntryRequest {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub asset: Asset,
    pub amount: Decimal,
    pub usd_value: Option<Decimal>,
    pub at: Option<String>,
    pub account: Option<String>,
    pub note: Option<String>,
    pub reference: Option<String>,
}

pub async fn create_vault(
    State(state): State<AppState>,
    Json(body): Json<CreateVaultRequest>,
) -> Result<Json<CreateVaultResponse>, AppError> {
    let created = state.ledger.ensure_vault(&body.name).await?;
    Ok(Json(CreateVaultResponse {
        name: body.name.trim().to_string(),
        created,
    }))
}

pub async fn list_vaults(State(state): State<AppState>) -> Result<Json<Vec<Vault>>, AppError> {
    Ok(Json(state.ledger.list_vaults().await?))
}

pub async fn get_vault_stats(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VaultStats>, AppError> {
    state.ledger.get_vault(&name).await?;
    Ok(Json(state.ledger.vault_stats(&name).await?))
}

pub async fn list_entries(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<VaultEntry>>, AppError> {
    state.ledger.get_vault(&name).await?;
    Ok(Json(state.ledger.entries(&name).await?))
}

pub async fn add_entry(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<AddEntryRequest>,
) -> Result<Json<VaultEntry>, AppError> {
    if body.amount.is_negative() {
        return Err(AppError::BadRequest("amount must not be negative".into()));
    }
    state.ledger.get_vault(&name).await?;
    let asset = Asset::new(body.asset.asset_type, &body.asset.symbol);
    let at = match body.at.as_deref() {
        Some(raw) => parse_time(raw)?,
        None => TimeMs::now(),
    };
    let usd_value = match body.usd_value {
        Some(value) => value,
        None => state
            .resolver
            .get_rate_usd(&asset, Some(at))
            .await
            .value_of(body.amount),
    };

    let mut entry = VaultEntry::new(&name, body.entry_type, asset, body.amount, usd_value, at);
    entry.account = body.account;
    entry.note = body.note;
    entry.reference = body.reference;

    Ok(Json(state.ledger.add_vault_entry(entry).await?))
}

pub async fn end_vault(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vault>, AppError> {
    Ok(Json(state.ledger.end_vault(&name).await?))
}

pub async fn get_vault_performance(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VaultPerformance>, AppError> {
    Ok(Json(state.performance.vault_performance(&name).await?))
}
