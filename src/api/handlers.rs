use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    api::models::{HealthResponse, ReadinessResponse},
    config::Settings,
    db::DbPool,
    indexer::search::SearchIndex,
    realtime::Realtime,
    search::SearchService,
    Result,
};

/// Process-wide context handed to every route group
#[derive(Clone)]
pub struct AppContext {
    pub pool: DbPool,
    pub settings: Arc<Settings>,
    pub search: Arc<dyn SearchService>,
    pub search_index: Arc<SearchIndex>,
    pub realtime: Realtime,
}

pub const HELLO_MESSAGE: &str = "Hello, World from App Factory!";

/// GET /hello - Liveness check kept for existing clients
pub async fn hello() -> &'static str {
    HELLO_MESSAGE
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(ctx): State<AppContext>) -> Result<Json<ReadinessResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&ctx.pool).await.is_ok();
    let realtime_healthy = !ctx.realtime.is_shut_down();

    Ok(Json(ReadinessResponse {
        ready: db_healthy && realtime_healthy,
        database: if db_healthy { "ok" } else { "error" }.to_string(),
        search_index: "ok".to_string(),
        indexed_recipes: ctx.search_index.num_docs(),
        realtime_connections: ctx.realtime.connections(),
    }))
}
