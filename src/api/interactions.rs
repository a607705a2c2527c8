use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::debug;

use crate::{
    api::{
        extract::CurrentUser,
        models::{ApiResponse, LikeStatus, LikedRecipes, RatingRequest, RatingSummary},
        AppContext,
    },
    db,
    realtime::RealtimeEvent,
    Result,
};

pub fn routes(ctx: &AppContext) -> Router {
    Router::new()
        .route("/interactions/recipes/:id/like", post(toggle_like))
        .route("/interactions/recipes/:id/rating", put(rate_recipe))
        .route("/interactions/liked", get(liked_recipes))
        .with_state(ctx.clone())
}

/// POST /interactions/recipes/:id/like - Like or unlike a recipe
pub async fn toggle_like(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<LikeStatus>>> {
    let account = user.registered(&ctx.pool).await?;
    // 404 before touching the likes table
    db::recipes::get_recipe(&ctx.pool, id).await?;

    let liked = db::interactions::toggle_like(&ctx.pool, &account.id, id).await?;
    let likes_count = db::interactions::count_likes(&ctx.pool, id).await?;
    debug!(
        "User {} {} recipe {}",
        account.id,
        if liked { "liked" } else { "unliked" },
        id
    );

    ctx.realtime.publish(RealtimeEvent::RecipeLiked {
        recipe_id: id,
        user_id: account.id,
        liked,
        likes_count,
    });

    Ok(Json(ApiResponse::success(LikeStatus {
        recipe_id: id,
        liked,
        likes_count,
    })))
}

/// PUT /interactions/recipes/:id/rating - Set the caller's 1-5 rating
pub async fn rate_recipe(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    user: CurrentUser,
    Json(body): Json<RatingRequest>,
) -> Result<Json<ApiResponse<RatingSummary>>> {
    let account = user.registered(&ctx.pool).await?;
    db::recipes::get_recipe(&ctx.pool, id).await?;

    db::interactions::upsert_rating(&ctx.pool, &account.id, id, body.score).await?;
    let stats = db::interactions::recipe_stats(&ctx.pool, id).await?;

    Ok(Json(ApiResponse::success(RatingSummary {
        recipe_id: id,
        your_score: body.score,
        average: stats.rating_average,
        count: stats.rating_count,
    })))
}

/// GET /interactions/liked - Ids of every recipe the caller liked
pub async fn liked_recipes(
    State(ctx): State<AppContext>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<LikedRecipes>>> {
    let recipe_ids = db::interactions::liked_recipe_ids(&ctx.pool, &user.0).await?;
    Ok(Json(ApiResponse::success(LikedRecipes { recipe_ids })))
}
