use std::sync::Arc;

use gallery_api::config::AppConfig;
use gallery_api::{build_router, AppState};
use gallery_shared::middleware::{init_metrics, init_tracing};
use gallery_store::open_storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("gallery-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let storage = open_storage(&config.store_config()).await?;
    tracing::info!(backend = %storage.backend(), "storage ready");

    let mut state = AppState::new(config, storage)?;
    state.metrics_handle = Some(init_metrics()?);

    let app = build_router(Arc::new(state));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "gallery-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
