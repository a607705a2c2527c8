//! Application factory.
//!
//! [`create_app`] resolves configuration (environment first, then an optional
//! override mapping) and hands it to [`build_app`], which wires the storage,
//! search, real-time and HTTP layers into an [`App`].

use axum::Router;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    api::{routes, uploads::ensure_upload_dir, AppContext},
    config::{ConfigOverrides, Settings},
    db,
    indexer::search::SearchIndex,
    realtime::Realtime,
    search::{IndexSearchService, SearchService},
    Result,
};

/// A fully wired application: the router to serve and the context behind it
pub struct App {
    pub router: Router,
    pub context: AppContext,
}

impl App {
    pub fn settings(&self) -> &Settings {
        &self.context.settings
    }

    /// Close real-time sessions and the database pool
    pub async fn shutdown(self) {
        self.context.realtime.shutdown();
        self.context.pool.close().await;
        info!("Application shut down");
    }
}

/// Build the application. Options in `test_config` replace the environment-derived
/// values verbatim; unknown option names are an error.
pub async fn create_app(test_config: Option<ConfigOverrides>) -> Result<App> {
    let mut settings = Settings::from_env()?;

    if let Some(overrides) = test_config.as_ref() {
        debug!("Applying {} configuration overrides", overrides.len());
        settings.apply_overrides(overrides)?;
    }

    settings.validate()?;
    build_app(settings, None).await
}

/// Wire an application from resolved settings. `search` replaces the default
/// index-backed search collaborator when given.
pub async fn build_app(settings: Settings, search: Option<Arc<dyn SearchService>>) -> Result<App> {
    ensure_upload_dir(&settings.uploads.folder)?;

    info!("Connecting to database (host: {})", settings.database.host);
    let pool = db::init_pool_with_config(&settings.database).await?;
    db::run_migrations(&pool).await?;

    let search_index = Arc::new(SearchIndex::new(&settings.search.index_path)?);
    if search_index.num_docs() == 0 && db::recipes::count_all_recipes(&pool).await? > 0 {
        let indexed = search_index.rebuild(&pool).await?;
        info!("Search index was empty; indexed {} recipes", indexed);
    }

    let search = search.unwrap_or_else(|| {
        Arc::new(IndexSearchService::new(
            search_index.clone(),
            settings.search.max_results,
        ))
    });

    let realtime = Realtime::new(settings.realtime.channel_capacity);

    let context = AppContext {
        pool,
        settings: Arc::new(settings),
        search,
        search_index,
        realtime,
    };

    let router = routes::create_router(&context)?;
    info!("Application ready");

    Ok(App { router, context })
}
