use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::{
    api::{
        models::{ApiResponse, SearchData, SearchParams},
        AppContext,
    },
    search::SearchService,
    Error,
};

/// State for the search group: the collaborator and how long to wait for it
#[derive(Clone)]
pub struct SearchState {
    pub service: Arc<dyn SearchService>,
    pub timeout: Duration,
}

/// Search routes bound to the application's search collaborator
pub fn router(ctx: &AppContext) -> Router {
    routes(
        ctx.search.clone(),
        Duration::from_secs(ctx.settings.search.timeout_seconds),
    )
}

/// `GET /search` and `GET /search/` over an arbitrary collaborator
pub fn routes(service: Arc<dyn SearchService>, timeout: Duration) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/search/", get(search))
        .with_state(SearchState { service, timeout })
}

/// GET /search/?q=... - Run a smart search
pub async fn search(
    State(state): State<SearchState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.as_deref().unwrap_or_default();
    if query.is_empty() {
        return Error::Validation("Search parameter \"q\" is required".to_string())
            .into_response();
    }

    info!("Search query: '{}'", query);
    let started = Instant::now();

    let outcome = tokio::time::timeout(state.timeout, state.service.perform_smart_search(query)).await;

    match outcome {
        Ok(Ok((results, _metadata))) => {
            info!(
                "Search for '{}' completed in {:.3} s with {} results",
                query,
                started.elapsed().as_secs_f64(),
                results.len()
            );

            let total_results = results.len();
            let results = paginate(
                results,
                parse_count(params.page.as_deref()),
                parse_count(params.per_page.as_deref()),
            );

            Json(ApiResponse::success(SearchData {
                results,
                total_results,
            }))
            .into_response()
        }
        Ok(Err(e)) => {
            error!("Search failed for query '{}': {:?}", query, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Search failed: {e}"))),
            )
                .into_response()
        }
        Err(_) => {
            // The future is dropped here; work already handed to a blocking
            // thread runs to completion and its result is discarded
            warn!(
                "Search for '{}' abandoned after {:.3} s",
                query,
                started.elapsed().as_secs_f64()
            );
            Error::Timeout(format!(
                "Search did not finish within {} s",
                state.timeout.as_secs_f64()
            ))
            .into_response()
        }
    }
}

fn parse_count(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse().ok())
}

/// Slice the result list when the client asks for a page
fn paginate(results: Vec<Value>, page: Option<usize>, per_page: Option<usize>) -> Vec<Value> {
    let Some(per_page) = per_page.filter(|&n| n > 0) else {
        return results;
    };
    let page = page.unwrap_or(1).max(1);

    results
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect()
}
