mod api;
mod models;
mod query;
mod settings;
mod store;
mod timefmt;
mod validate;

use api::AppState;
use settings::Settings;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use store::Store;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Settings + database ────────────────────────────────────
    let settings = Settings::load().expect("Failed to load settings");

    let store = Store::open(&settings.database_path).expect("Failed to open database");
    tracing::info!(path = %settings.database_path, "database open");

    let state = Arc::new(AppState { store });

    // ── Router ─────────────────────────────────────────────────
    let app = api::router(state)
        .fallback_service(
            ServeDir::new(&settings.static_dir).append_index_html_on_directories(true),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // ── Start ──────────────────────────────────────────────────
    let ip: IpAddr = settings
        .bind_address
        .parse()
        .expect("Invalid bind_address in settings");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
