use clap::Parser;
use recipe_hub::{
    build_app,
    cli::{commands, Cli, Commands},
    config::Settings,
    db, Error, Result,
};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_hub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Serve { port, host } => serve(settings, port, host).await?,
        Commands::Migrate => migrate(settings).await?,
        Commands::Reindex => {
            let indexed = commands::reindex(&settings).await?;
            println!("\u{2713} Search index rebuilt with {indexed} recipes");
        }
        Commands::Search {
            query,
            page,
            per_page,
        } => {
            let server_url = commands::server_url(&settings);
            commands::search(&server_url, &query, page, per_page).await?;
        }
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app = build_app(settings, None).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Recipe Hub");
    println!("========================================");
    println!("Address: http://{addr}");
    println!("Search Index: {} recipes", app.context.search_index.num_docs());
    println!("\nRoute groups:");
    println!("  /auth  /recipes  /search  /users");
    println!("  /interactions  /recommendations  /uploads");
    println!("  GET  /ws  (real-time events)");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    // Open WebSocket sessions must end before graceful shutdown can finish
    let realtime = app.context.realtime.clone();
    let shutdown = async move {
        wait_for_signal(tokio::signal::ctrl_c()).await;
        info!("Shutdown signal received");
        realtime.shutdown();
    };

    axum::serve(
        listener,
        app.router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    app.shutdown().await;
    Ok(())
}

/// Resolve once `signal` fires. If the handler cannot be installed this never
/// resolves, so the server keeps running until the process is killed.
async fn wait_for_signal<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn migrate(settings: Settings) -> Result<()> {
    info!("Running database migrations");

    let pool = db::init_pool_with_config(&settings.database).await?;
    db::run_migrations(&pool).await?;

    println!("\u{2713} Database migrations completed successfully");
    Ok(())
}
