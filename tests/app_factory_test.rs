mod common;

use axum::http::StatusCode;
use common::{get, send, send_raw, test_overrides};
use recipe_hub::{config::Settings, create_app, Error};
use std::path::PathBuf;

#[tokio::test]
async fn test_hello_route() {
    let instance = tempfile::tempdir().unwrap();
    let app = create_app(Some(test_overrides(&instance))).await.unwrap();

    let (status, body) = send_raw(&app.router, get("/hello", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Hello, World from App Factory!");

    app.shutdown().await;
}

#[tokio::test]
async fn test_overrides_are_applied_verbatim() {
    let instance = tempfile::tempdir().unwrap();
    let mut overrides = test_overrides(&instance);
    overrides.insert("SECRET_KEY".to_string(), "test-secret".to_string());
    overrides.insert("DB_HOST".to_string(), "db.internal".to_string());
    overrides.insert("ALLOWED_EXTENSIONS".to_string(), "png,webp".to_string());
    overrides.insert("SEARCH_TIMEOUT".to_string(), "3".to_string());

    let app = create_app(Some(overrides.clone())).await.unwrap();
    let settings = app.settings();

    assert_eq!(settings.app.secret_key, "test-secret");
    assert_eq!(settings.database.host, "db.internal");
    assert_eq!(settings.database.url, "sqlite::memory:");
    assert_eq!(
        settings.uploads.folder,
        PathBuf::from(&overrides["UPLOAD_FOLDER"])
    );
    assert_eq!(
        settings.uploads.allowed_extensions.iter().collect::<Vec<_>>(),
        vec!["png", "webp"]
    );
    assert_eq!(settings.search.timeout_seconds, 3);

    app.shutdown().await;
}

#[test]
fn test_applying_overrides_twice_is_idempotent() {
    let instance = tempfile::tempdir().unwrap();
    let mut overrides = test_overrides(&instance);
    overrides.insert("PORT".to_string(), "8080".to_string());

    let mut once = Settings::defaults(instance.path());
    once.apply_overrides(&overrides).unwrap();

    let mut twice = once.clone();
    twice.apply_overrides(&overrides).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.server.port, 8080);
}

#[tokio::test]
async fn test_arbitrary_override_is_kept_verbatim() {
    let instance = tempfile::tempdir().unwrap();
    let mut overrides = test_overrides(&instance);
    overrides.insert("TESTING".to_string(), "true".to_string());
    overrides.insert("FEATURE_FLAG".to_string(), " Mixed Case ".to_string());

    let app = create_app(Some(overrides)).await.unwrap();
    let extra = &app.settings().extra;

    assert_eq!(extra.get("TESTING").map(String::as_str), Some("true"));
    assert_eq!(extra.get("FEATURE_FLAG").map(String::as_str), Some(" Mixed Case "));
    assert!(!extra.contains_key("DATABASE_URL"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_upload_folder_creation_is_idempotent() {
    let instance = tempfile::tempdir().unwrap();
    let upload_folder = instance.path().join("shared-uploads");

    let mut overrides = test_overrides(&instance);
    overrides.insert(
        "UPLOAD_FOLDER".to_string(),
        upload_folder.display().to_string(),
    );
    overrides.insert("TESTING".to_string(), "true".to_string());

    let first = create_app(Some(overrides.clone())).await.unwrap();
    assert!(upload_folder.is_dir());

    // Same configuration while the first application is still running
    let second = create_app(Some(overrides)).await.unwrap();
    assert!(upload_folder.is_dir());
    assert_eq!(first.settings(), second.settings());

    let (status, _) = send_raw(&second.router, get("/hello", None)).await;
    assert_eq!(status, StatusCode::OK);

    second.shutdown().await;
    first.shutdown().await;
}

#[tokio::test]
async fn test_unusable_upload_folder_aborts_startup() {
    let instance = tempfile::tempdir().unwrap();
    let blocker = instance.path().join("uploads-file");
    std::fs::write(&blocker, b"in the way").unwrap();

    let mut overrides = test_overrides(&instance);
    overrides.insert("UPLOAD_FOLDER".to_string(), blocker.display().to_string());

    let result = create_app(Some(overrides)).await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_health_and_readiness() {
    let instance = tempfile::tempdir().unwrap();
    let app = create_app(Some(test_overrides(&instance))).await.unwrap();

    let (status, body) = send(&app.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, get("/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["database"], "ok");
    assert_eq!(body["indexed_recipes"], 0);

    app.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let instance = tempfile::tempdir().unwrap();
    let app = create_app(Some(test_overrides(&instance))).await.unwrap();

    let (status, _) = send_raw(&app.router, get("/nowhere", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.shutdown().await;
}
