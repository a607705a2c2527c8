use crate::config::Settings;
use crate::indexer::search::SearchIndex;
use crate::utils::sanitize::truncate;
use crate::{db, Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// Base URL of the configured server
pub fn server_url(settings: &Settings) -> String {
    settings
        .server
        .external_url
        .clone()
        .unwrap_or_else(|| format!("http://{}:{}", settings.server.host, settings.server.port))
}

/// Search recipes on a running server and print the results
pub async fn search(server_url: &str, query: &str, page: usize, per_page: usize) -> Result<()> {
    let client = Client::new();

    let url = format!(
        "{}/search/?q={}&page={}&per_page={}",
        server_url.trim_end_matches('/'),
        urlencoding::encode(query),
        page,
        per_page
    );

    let response = client.get(&url).send().await?;
    let status = response.status();
    let envelope: Envelope = response.json().await?;

    if !status.is_success() {
        let message = envelope
            .message
            .unwrap_or_else(|| format!("Server answered {status}"));
        return Err(Error::Search(message));
    }

    let data = envelope
        .data
        .ok_or_else(|| Error::Search("Response carried no data".to_string()))?;
    print_search_results(&data, page, per_page);

    Ok(())
}

/// Rebuild the search index from every recipe in the database
pub async fn reindex(settings: &Settings) -> Result<usize> {
    let pool = db::init_pool_with_config(&settings.database).await?;
    db::run_migrations(&pool).await?;

    let index = SearchIndex::new(&settings.search.index_path)?;
    let indexed = index.rebuild(&pool).await?;

    info!("Reindexed {} recipes", indexed);
    pool.close().await;
    Ok(indexed)
}

fn print_search_results(data: &SearchData, page: usize, per_page: usize) {
    if data.results.is_empty() {
        println!("No recipes found");
        return;
    }

    println!("\nFound {} recipes:\n", data.total_results);
    println!("{:<6} {:<50} {:>8}", "ID", "Title", "Score");
    println!("{}", "-".repeat(66));

    for result in &data.results {
        let id = result.get("id").map(Value::to_string).unwrap_or_default();
        let title = result.get("title").and_then(Value::as_str).unwrap_or("");
        let score = result
            .get("score")
            .and_then(Value::as_f64)
            .map(|s| format!("{s:.2}"))
            .unwrap_or_default();

        println!("{:<6} {:<50} {:>8}", id, truncate(title, 48), score);
    }

    let total_pages = data.total_results.div_ceil(per_page.max(1));
    println!("\nPage {} of {}", page, total_pages.max(1));
}

// Response types (matching the search route)

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<SearchData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    results: Vec<Value>,
    total_results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url() {
        let mut settings = Settings::defaults("/tmp/recipe-hub");
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = 8080;
        assert_eq!(server_url(&settings), "http://127.0.0.1:8080");

        settings.server.external_url = Some("https://recipes.example.com".to_string());
        assert_eq!(server_url(&settings), "https://recipes.example.com");
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"status":"success","data":{"results":[{"id":1,"title":"Carbonara"}],"total_results":1}}"#,
        )
        .unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.total_results, 1);
        assert_eq!(data.results[0]["title"], "Carbonara");

        let envelope: Envelope =
            serde_json::from_str(r#"{"status":"error","message":"boom"}"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_reindex_empty_database() {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::defaults(temp.path());
        settings.database.url = "sqlite::memory:".to_string();

        assert_eq!(reindex(&settings).await.unwrap(), 0);
    }
}
