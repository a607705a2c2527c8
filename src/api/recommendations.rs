use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::{
    api::{
        extract::MaybeUser,
        models::{ApiResponse, Recommendation, RecommendationParams},
        AppContext,
    },
    db, Result,
};

const MAX_RECOMMENDATIONS: usize = 50;

pub fn routes(ctx: &AppContext) -> Router {
    Router::new()
        .route("/recommendations", get(recommendations))
        .with_state(ctx.clone())
}

/// GET /recommendations - Popular recipes the caller has not written or liked yet
pub async fn recommendations(
    State(ctx): State<AppContext>,
    user: MaybeUser,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<ApiResponse<Vec<Recommendation>>>> {
    let limit = params.limit.clamp(1, MAX_RECOMMENDATIONS);

    let ranked =
        db::interactions::popular_recipes(&ctx.pool, user.0.as_deref(), limit as i64).await?;

    let recommendations = ranked
        .into_iter()
        .map(|ranked| Recommendation {
            id: ranked.recipe.id,
            user_id: ranked.recipe.user_id,
            title: ranked.recipe.title,
            photo_url: ranked.recipe.photo_url,
            likes_count: ranked.likes_count,
            rating_average: ranked.rating_average,
        })
        .collect();

    Ok(Json(ApiResponse::success(recommendations)))
}
