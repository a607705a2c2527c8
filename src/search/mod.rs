//! The search collaborator behind `GET /search/`.
//!
//! The route only depends on [`SearchService`]: given a query it yields a list
//! of result records plus a metadata map. [`IndexSearchService`] is the
//! binding used by the server; tests plug in their own implementations.

use crate::error::Result;
use crate::indexer::search::{SearchIndex, SearchQuery};
use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Free-form metadata describing how a search was answered
pub type SearchMetadata = Map<String, Value>;

pub trait SearchService: Send + Sync {
    /// Run a query. The route awaits this future under the configured timeout
    /// and drops it when the timeout fires, so implementations only stop at
    /// their next await point. Blocking work already started keeps running.
    fn perform_smart_search<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<(Vec<Value>, SearchMetadata)>>;
}

/// Search backed by the local Tantivy index
pub struct IndexSearchService {
    index: Arc<SearchIndex>,
    max_results: usize,
}

impl IndexSearchService {
    pub fn new(index: Arc<SearchIndex>, max_results: usize) -> Self {
        Self { index, max_results }
    }
}

impl SearchService for IndexSearchService {
    fn perform_smart_search<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<(Vec<Value>, SearchMetadata)>> {
        Box::pin(async move {
            let index = self.index.clone();
            let search_query = SearchQuery {
                q: query.to_string(),
                page: 1,
                limit: self.max_results,
            };

            // Tantivy searches are blocking
            let results = tokio::task::spawn_blocking(move || index.search(&search_query))
                .await
                .map_err(|e| crate::Error::Internal(format!("Search task failed: {e}")))??;

            let records = results
                .results
                .into_iter()
                .map(|hit| {
                    json!({
                        "id": hit.recipe_id,
                        "title": hit.title,
                        "ingredients": hit.ingredients,
                        "photo_url": hit.photo_url,
                        "score": hit.score,
                    })
                })
                .collect();

            let mut metadata = SearchMetadata::new();
            metadata.insert("query".to_string(), json!(query));
            metadata.insert("total".to_string(), json!(results.total));
            metadata.insert("engine".to_string(), json!("tantivy"));

            Ok((records, metadata))
        })
    }
}
