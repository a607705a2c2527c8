use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use sha2::{Digest, Sha256};
use std::path::Path;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::{debug, info};

use crate::{
    api::{
        extract::CurrentUser,
        models::{ApiResponse, UploadedFile},
        AppContext,
    },
    utils::validation::validate_extension,
    Error, Result,
};

const FILE_FIELD: &str = "file";
const FILES_PREFIX: &str = "/uploads/files";

pub fn routes(ctx: &AppContext) -> Router {
    let uploads = &ctx.settings.uploads;

    Router::new()
        .route("/uploads", post(upload_file))
        .with_state(ctx.clone())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(uploads.max_upload_size))
        .nest_service(FILES_PREFIX, ServeDir::new(&uploads.folder))
}

/// Create the upload folder. Returns whether it had to be created.
pub fn ensure_upload_dir(path: &Path) -> Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }

    std::fs::create_dir_all(path)?;
    info!("Created upload folder {}", path.display());
    Ok(true)
}

/// Name stored files by content so re-uploading the same file is a no-op
fn stored_name(content: &[u8], extension: &str) -> String {
    format!("{:x}.{}", Sha256::digest(content), extension)
}

/// POST /uploads - Store an image sent as multipart field `file`
pub async fn upload_file(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedFile>>)> {
    user.registered(&ctx.pool).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::Validation("Upload is missing a file name".to_string()))?;
        let extension = validate_extension(&original, &ctx.settings.uploads.allowed_extensions)?;

        let content = field.bytes().await?;
        if content.is_empty() {
            return Err(Error::Validation("Uploaded file is empty".to_string()));
        }

        let filename = stored_name(&content, &extension);
        let target = ctx.settings.uploads.folder.join(&filename);

        if tokio::fs::try_exists(&target).await? {
            debug!("Upload {} already stored", filename);
        } else {
            tokio::fs::write(&target, &content).await?;
            info!("Stored upload {} ({} bytes)", filename, content.len());
        }

        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse::success(UploadedFile {
                url: format!("{FILES_PREFIX}/{filename}"),
                filename,
                size: content.len(),
            })),
        ));
    }

    Err(Error::Validation(format!(
        "Multipart field \"{FILE_FIELD}\" is required"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_upload_dir_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let folder = temp.path().join("uploads").join("images");

        assert!(ensure_upload_dir(&folder).unwrap());
        assert!(!ensure_upload_dir(&folder).unwrap());
        assert!(folder.is_dir());
    }

    #[test]
    fn test_ensure_upload_dir_fails_on_file() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("taken");
        std::fs::write(&blocker, b"not a directory").unwrap();

        assert!(matches!(ensure_upload_dir(&blocker), Err(Error::Io(_))));
    }

    #[test]
    fn test_stored_name_is_content_addressed() {
        let a = stored_name(b"pixels", "png");
        assert_eq!(a, stored_name(b"pixels", "png"));
        assert_ne!(a, stored_name(b"other pixels", "png"));
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), 64 + 4);
    }
}
