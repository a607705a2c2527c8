use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::info;

use crate::{
    api::{
        extract::CurrentUser,
        models::{ApiResponse, RegisterRequest, UserProfile},
        AppContext,
    },
    db::{self, models::NewUser},
    utils::{sanitize::clean_optional, validation::validate_email},
    Result,
};

pub fn routes(ctx: &AppContext) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .with_state(ctx.clone())
}

/// POST /auth/register - Create or update the caller's account
pub async fn register(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    let email = body.email.trim().to_lowercase();
    validate_email(&email)?;

    let (account, created) = db::users::upsert_user(
        &ctx.pool,
        &NewUser {
            id: user.0,
            email,
            display_name: clean_optional(body.display_name),
        },
    )
    .await?;

    if created {
        info!("Registered user {}", account.id);
    }

    let recipe_count = db::users::count_user_recipes(&ctx.pool, &account.id).await?;
    let liked_count = db::users::count_user_likes(&ctx.pool, &account.id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ApiResponse::success(UserProfile::private(
            account,
            recipe_count,
            liked_count,
        ))),
    ))
}

/// POST /auth/login - Return the caller's profile if registered
pub async fn login(
    State(ctx): State<AppContext>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let account = user.registered(&ctx.pool).await?;
    let recipe_count = db::users::count_user_recipes(&ctx.pool, &account.id).await?;
    let liked_count = db::users::count_user_likes(&ctx.pool, &account.id).await?;

    Ok(Json(ApiResponse::success(UserProfile::private(
        account,
        recipe_count,
        liked_count,
    ))))
}
