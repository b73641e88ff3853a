use axum::extract::FromRef;
use sqlx::PgPool;

use crate::thread::service::ThreadService;

/// Shared state behind every route: the thread service for the review
/// endpoints, the raw pool for the health probes.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub service: ThreadService,
    pub pool: PgPool,
}
