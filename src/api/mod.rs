pub mod health;
pub mod positions;
pub mod rates;
pub mod returns;
pub mod vaults;

use crate::db::Repository;
use crate::orchestration::{PerformanceReporter, PositionAccountant, VaultLedger};
use crate::rates::RateResolver;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub resolver: Arc<RateResolver>,
    pub ledger: VaultLedger,
    pub accountant: PositionAccountant,
    pub performance: PerformanceReporter,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, resolver: Arc<RateResolver>) -> Self {
        Self {
            ledger: VaultLedger::new(repo.clone(), resolver.clone()),
            accountant: PositionAccountant::new(repo.clone(), resolver.clone()),
            performance: PerformanceReporter::new(repo.clone(), resolver.clone()),
            repo,
            resolver,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/rates", get(rates::get_rate))
        .route(
            "/v1/vaults",
            get(vaults::list_vaults).post(vaults::create_vault),
        )
        .route("/v1/vaults/:name/stats", get(vaults::get_vault_stats))
        .route(
            "/v1/vaults/:name/entries",
            get(vaults::list_entries).post(vaults::add_entry),
        )
        .route("/v1/vaults/:name/end", post(vaults::end_vault))
        .route(
            "/v1/vaults/:name/performance",
            get(vaults::get_vault_performance),
        )
        .route(
            "/v1/positions",
            get(positions::list_positions).post(positions::stake),
        )
        .route("/v1/positions/:id", get(positions::get_position))
        .route("/v1/positions/:id/unstake", post(positions::unstake))
        .route("/v1/positions/:id/exits", get(positions::list_exits))
        .route(
            "/v1/positions/:id/performance",
            get(positions::get_position_performance),
        )
        .route("/v1/returns/irr", post(returns::compute_irr))
        .layer(cors)
        .with_state(state)
}
