use anyhow::Context;
use finledger::{api, config::Config, db::init_db, RateCache, RateResolver, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("Failed to initialize database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    // One cache per process, shared by every resolver
    let cache = Arc::new(RateCache::persistent(repo.clone()));
    let resolver = Arc::new(RateResolver::from_config(&config, cache));
    if config.disable_external_rates {
        tracing::warn!("External rate providers disabled; rates resolve to FALLBACK or FIXED");
    }

    let app = api::create_router(api::AppState::new(repo, resolver));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
