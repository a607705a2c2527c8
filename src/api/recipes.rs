use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    api::{
        extract::{CurrentUser, MaybeUser},
        models::{
            ApiResponse, PageParams, Pagination, RecipeCard, RecipeDetail, RecipeList,
            RecipeRequest,
        },
        AppContext,
    },
    db::{
        self,
        models::{Ingredient, NewRecipe, Recipe, Step, UpdateRecipe},
    },
    indexer::search::SearchIndex,
    realtime::RealtimeEvent,
    utils::{
        sanitize::{clean_optional, clean_text},
        validation::{validate_ingredients, validate_steps, validate_title},
    },
    Error, Result,
};

pub fn routes(ctx: &AppContext) -> Router {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .with_state(ctx.clone())
}

/// Validated, cleaned form of a create/update body
struct RecipeInput {
    title: String,
    ingredients: Vec<Ingredient>,
    instructions: Vec<Step>,
    photo_url: Option<String>,
}

impl TryFrom<RecipeRequest> for RecipeInput {
    type Error = Error;

    fn try_from(body: RecipeRequest) -> Result<Self> {
        validate_title(&body.title)?;
        validate_ingredients(&body.ingredients)?;
        validate_steps(&body.instructions)?;

        let ingredients = body
            .ingredients
            .into_iter()
            .map(|i| Ingredient {
                name: clean_text(&i.name),
                count: i.count,
                unit: clean_text(&i.unit),
            })
            .collect();

        // Steps are renumbered in the order they were sent
        let instructions = body
            .instructions
            .into_iter()
            .enumerate()
            .map(|(i, step)| Step {
                number: i as i64 + 1,
                instruction: clean_text(&step.instruction),
                url: clean_optional(step.url),
            })
            .collect();

        Ok(Self {
            title: clean_text(&body.title),
            ingredients,
            instructions,
            photo_url: clean_optional(body.photo_url),
        })
    }
}

/// GET /recipes - List recipes, newest first
pub async fn list_recipes(
    State(ctx): State<AppContext>,
    Query(params): Query<PageParams>,
) -> Result<Json<ApiResponse<RecipeList>>> {
    let (limit, offset) = params.limit_offset(ctx.settings.search.max_results);

    let recipes = db::recipes::list_recipes(&ctx.pool, limit as i64, offset as i64).await?;
    let total = db::recipes::count_all_recipes(&ctx.pool).await?;

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

/// GET /recipes/:id - Recipe details with like and rating aggregates
pub async fn get_recipe(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    user: MaybeUser,
) -> Result<Json<ApiResponse<RecipeDetail>>> {
    let recipe = db::recipes::get_recipe(&ctx.pool, id).await?;
    let stats = db::interactions::recipe_stats(&ctx.pool, id).await?;

    let is_liked = match user.0.as_deref() {
        Some(user_id) => db::interactions::is_liked(&ctx.pool, user_id, id).await?,
        None => false,
    };

    Ok(Json(ApiResponse::success(RecipeDetail::new(
        recipe, stats, is_liked,
    ))))
}

/// POST /recipes - Create a recipe owned by the caller
pub async fn create_recipe(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Json(body): Json<RecipeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeDetail>>)> {
    let account = user.registered(&ctx.pool).await?;
    let input = RecipeInput::try_from(body)?;

    let recipe = db::recipes::create_recipe(
        &ctx.pool,
        &NewRecipe {
            user_id: account.id,
            title: input.title,
            ingredients: input.ingredients,
            instructions: input.instructions,
            photo_url: input.photo_url,
        },
    )
    .await?;

    info!("Created recipe {} '{}'", recipe.id, recipe.title);
    sync_index(ctx.search_index.clone(), IndexChange::Upsert(recipe.clone())).await;

    ctx.realtime.publish(RealtimeEvent::RecipeCreated {
        recipe_id: recipe.id,
        title: recipe.title.clone(),
        user_id: recipe.user_id.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RecipeDetail::new(
            recipe,
            Default::default(),
            false,
        ))),
    ))
}

/// PUT /recipes/:id - Replace a recipe's content (author only)
pub async fn update_recipe(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    user: CurrentUser,
    Json(body): Json<RecipeRequest>,
) -> Result<Json<ApiResponse<RecipeDetail>>> {
    let account = user.registered(&ctx.pool).await?;
    let existing = db::recipes::get_recipe(&ctx.pool, id).await?;
    ensure_author(&existing, &account.id)?;

    let input = RecipeInput::try_from(body)?;
    let recipe = db::recipes::update_recipe(
        &ctx.pool,
        id,
        &UpdateRecipe {
            title: input.title,
            ingredients: input.ingredients,
            instructions: input.instructions,
            photo_url: input.photo_url,
        },
    )
    .await?;

    debug!("Updated recipe {}", id);
    sync_index(ctx.search_index.clone(), IndexChange::Upsert(recipe.clone())).await;
    ctx.realtime.publish(RealtimeEvent::RecipeUpdated { recipe_id: id });

    let stats = db::interactions::recipe_stats(&ctx.pool, id).await?;
    let is_liked = db::interactions::is_liked(&ctx.pool, &account.id, id).await?;

    Ok(Json(ApiResponse::success(RecipeDetail::new(
        recipe, stats, is_liked,
    ))))
}

/// DELETE /recipes/:id - Remove a recipe (author only)
pub async fn delete_recipe(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<()>>> {
    let account = user.registered(&ctx.pool).await?;
    let existing = db::recipes::get_recipe(&ctx.pool, id).await?;
    ensure_author(&existing, &account.id)?;

    db::recipes::delete_recipe(&ctx.pool, id).await?;

    info!("Deleted recipe {}", id);
    sync_index(ctx.search_index.clone(), IndexChange::Delete(id)).await;
    ctx.realtime.publish(RealtimeEvent::RecipeDeleted { recipe_id: id });

    Ok(Json(ApiResponse::message(format!("Recipe {id} deleted"))))
}

fn ensure_author(recipe: &Recipe, user_id: &str) -> Result<()> {
    if recipe.user_id != user_id {
        return Err(Error::Forbidden(
            "Only the author can modify this recipe".to_string(),
        ));
    }
    Ok(())
}

enum IndexChange {
    Upsert(Recipe),
    Delete(i64),
}

/// Apply a change to the search index. The database is the source of truth,
/// so a failed index write is logged and left for the next reindex.
async fn sync_index(index: Arc<SearchIndex>, change: IndexChange) {
    let outcome = tokio::task::spawn_blocking(move || match change {
        IndexChange::Upsert(recipe) => index.index_recipe(&recipe),
        IndexChange::Delete(id) => index.delete_recipe(id),
    })
    .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Search index update failed: {}", e.log_safe()),
        Err(e) => warn!("Search index task failed: {}", e),
    }
}
