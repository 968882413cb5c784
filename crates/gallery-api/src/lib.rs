use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use gallery_shared::middleware::metrics_middleware;
use gallery_store::Storage;

pub mod config;
pub mod routes;

use config::AppConfig;

pub struct AppState {
    pub config: AppConfig,
    pub storage: Arc<dyn Storage>,
    pub http_client: reqwest::Client,
    pub metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn Storage>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.proxy_timeout_secs))
            .user_agent(config.proxy_user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            storage,
            http_client,
            metrics_handle: None,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/profiles",
            get(routes::profiles::list_profiles).post(routes::profiles::create_profile),
        )
        .route(
            "/profiles/:id",
            get(routes::profiles::get_profile)
                .put(routes::profiles::update_profile)
                .delete(routes::profiles::delete_profile),
        )
        .route(
            "/profiles/:id/images",
            get(routes::images::list_images)
                .post(routes::images::add_image)
                .delete(routes::images::clear_images),
        )
        .route(
            "/profiles/:id/images/:image_id",
            put(routes::images::update_image).delete(routes::images::delete_image),
        )
        .route("/categories", get(routes::profiles::list_categories))
        .route("/favorites", get(routes::favorites::list_favorites))
        .route(
            "/favorites/:profile_id",
            get(routes::favorites::check_favorite).post(routes::favorites::toggle_favorite),
        )
        .route("/proxy/image", get(routes::media::proxy_image))
        .route("/proxy/video", get(routes::media::proxy_video))
        .route("/auth/user", get(routes::auth::current_user))
        .route("/login", get(routes::auth::login_unavailable))
        .route("/logout", get(routes::auth::login_unavailable).post(routes::auth::login_unavailable))
        .route("/callback", get(routes::auth::login_unavailable))
        .fallback(routes::api_not_found);

    let mut app = Router::new()
        .nest("/api", api)
        .route("/metrics", get(routes::health::metrics));

    if let Some(dir) = &state.config.static_dir {
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
