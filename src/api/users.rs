use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::{
    api::{
        extract::CurrentUser,
        models::{ApiResponse, PageParams, Pagination, RecipeCard, RecipeList, UserProfile},
        AppContext,
    },
    db, Result,
};

pub fn routes(ctx: &AppContext) -> Router {
    Router::new()
        .route("/users/me", get(current_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/recipes", get(user_recipes))
        .with_state(ctx.clone())
}

/// GET /users/me - The caller's own profile
pub async fn current_user(
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

/// GET /users/:id - Public profile
pub async fn get_user(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let account = db::users::get_user(&ctx.pool, &id).await?;
    let recipe_count = db::users::count_user_recipes(&ctx.pool, &id).await?;

    Ok(Json(ApiResponse::success(UserProfile::public(
        account,
        recipe_count,
    ))))
}

/// GET /users/:id/recipes - Recipes authored by a user, newest first
pub async fn user_recipes(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<ApiResponse<RecipeList>>> {
    // 404 for unknown users rather than an empty list
    db::users::get_user(&ctx.pool, &id).await?;

    let (limit, offset) = params.limit_offset(ctx.settings.search.max_results);
    let recipes =
        db::recipes::list_recipes_by_user(&ctx.pool, &id, limit as i64, offset as i64).await?;
    let total = db::users::count_user_recipes(&ctx.pool, &id).await?;

    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let likes = db::interactions::like_counts_for_recipes(&ctx.pool, &ids).await?;

    let recipes = recipes
        .into_iter()
        .map(|recipe| {
            let count = likes.get(&recipe.id).copied().unwrap_or(0);
            RecipeCard::new(recipe, count)
        })
        .collect();

    Ok(Json(ApiResponse::success(RecipeList {
        recipes,
        pagination: Pagination::new(params.page, limit, total as usize),
    })))
}
