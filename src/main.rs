#![allow(dead_code)]
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::middleware::from_fn;
use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod app_state;
mod config;
mod db;
mod middleware;
mod thread;
mod utils;

use crate::api::review::ReviewDoc;
use crate::app_state::AppState;
use crate::config::Config;
use crate::db::queries::review::PgReviewStore;
use crate::middleware::auth::auth_context_middleware;
use crate::thread::service::ThreadService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    Config::init();

    std::fs::create_dir_all("logs").context("Failed to create logs directory")?;
    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .with_writer(non_blocking)
        .init();

    let pool = db::pool::get_db_pool()
        .await
        .context("Failed to connect to the database")?;

    let service = ThreadService::new(Arc::new(PgReviewStore::new(pool.clone())));
    let state = AppState { service, pool: pool.clone() };

    let doc = ReviewDoc::openapi();

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(api::review::review_routes())
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", doc).path("/rapidoc"))
        .layer(from_fn(auth_context_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = Config::get()
        .bind_addr
        .parse()
        .context("BIND_ADDR is not a valid socket address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server encountered an error")?;

    info!("Closing database pool");
    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Received Ctrl+C, shutting down");
}
