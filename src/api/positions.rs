use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Position, PositionExit, RealizedPnl};
use crate::error::AppError;
use crate::orchestration::{PositionPerformance, StakeCommand, UnstakeCommand};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    pub account: Option<String>,
    #[serde(default)]
    pub open_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeResponse {
    pub position: Position,
    pub realized: RealizedPnl,
}

pub async fn list_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Position>>, AppError> {
    let positions = state
        .accountant
        .list_positions(params.account.as_deref(), params.open_only)
        .await?;
    Ok(Json(positions))
}

pub async fn stake(
    State(state): State<AppState>,
    Json(cmd): Json<StakeCommand>,
) -> Result<(StatusCode, Json<Position>), AppError> {
    if cmd.account.trim().is_empty() {
        return Err(AppError::BadRequest("account must not be empty".into()));
    }
    let position = state.accountant.stake(cmd).await?;
    Ok((StatusCode::CREATED, Json(position)))
}

pub async fn get_position(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Position>, AppError> {
    Ok(Json(state.accountant.get_position(&id).await?))
}

pub async fn unstake(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(cmd): Json<UnstakeCommand>,
) -> Result<Json<UnstakeResponse>, AppError> {
    let (position, realized) = state.accountant.unstake(&id, cmd).await?;
    Ok(Json(UnstakeResponse { position, realized }))
}

pub async fn list_exits(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PositionExit>>, AppError> {
    state.accountant.get_position(&id).await?;
    Ok(Json(state.accountant.list_exits(&id).await?))
}

pub async fn get_position_performance(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PositionPerformance>, AppError> {
    Ok(Json(state.performance.position_performance(&id).await?))
}
