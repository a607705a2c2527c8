use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{Ingredient, Recipe, RecipeStats, Step, User};

/// Envelope shared by every JSON endpoint: `{"status": "success", "data": ...}`.
/// Errors use the same envelope with a `message` (see `Error::into_response`).
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data: Some(data),
            message: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Search request parameters. Paging values are kept raw so that a malformed
/// one is ignored instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub per_page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchData {
    pub results: Vec<Value>,
    pub total_results: usize,
}

/// Page/per_page query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageParams {
    /// Clamp to sane bounds and return (limit, offset)
    pub fn limit_offset(&self, max_limit: usize) -> (usize, usize) {
        let limit = self.per_page.clamp(1, max_limit.max(1));
        let offset = self.page.max(1).saturating_sub(1).saturating_mul(limit);
        (limit, offset)
    }
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    20
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize, total: usize) -> Self {
        Self {
            page: page.max(1),
            per_page,
            total,
            total_pages: total.div_ceil(per_page.max(1)),
        }
    }
}

/// Recipe create/update body
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeRequest {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, alias = "steps")]
    pub instructions: Vec<Step>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Recipe summary for lists
#[derive(Debug, Clone, Serialize)]
pub struct RecipeCard {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub photo_url: Option<String>,
    pub likes_count: i64,
    pub created_at: String,
}

impl RecipeCard {
    pub fn new(recipe: Recipe, likes_count: i64) -> Self {
        Self {
            id: recipe.id,
            user_id: recipe.user_id,
            title: recipe.title,
            photo_url: recipe.photo_url,
            likes_count,
            created_at: recipe.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeList {
    pub recipes: Vec<RecipeCard>,
    pub pagination: Pagination,
}

/// Full recipe details
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Step>,
    pub photo_url: Option<String>,
    pub likes_count: i64,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
    pub is_liked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl RecipeDetail {
    pub fn new(recipe: Recipe, stats: RecipeStats, is_liked: bool) -> Self {
        Self {
            id: recipe.id,
            user_id: recipe.user_id,
            title: recipe.title,
            ingredients: recipe.ingredients.0,
            instructions: recipe.instructions.0,
            photo_url: recipe.photo_url,
            likes_count: stats.likes_count,
            rating_average: stats.rating_average,
            rating_count: stats.rating_count,
            is_liked,
            created_at: recipe.created_at.to_rfc3339(),
            updated_at: recipe.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// User profile
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub recipe_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_count: Option<i64>,
    pub created_at: String,
}

impl UserProfile {
    /// Profile as seen by anyone
    pub fn public(user: User, recipe_count: i64) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            email: None,
            recipe_count,
            liked_count: None,
            created_at: user.created_at.to_rfc3339(),
        }
    }

    /// Profile as seen by its owner
    pub fn private(user: User, recipe_count: i64, liked_count: i64) -> Self {
        Self {
            email: Some(user.email.clone()),
            liked_count: Some(liked_count),
            ..Self::public(user, recipe_count)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LikeStatus {
    pub recipe_id: i64,
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingSummary {
    pub recipe_id: i64,
    pub your_score: i64,
    pub average: Option<f64>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikedRecipes {
    pub recipe_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationParams {
    #[serde(default = "default_recommendations")]
    pub limit: usize,
}

fn default_recommendations() -> usize {
    10
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub photo_url: Option<String>,
    pub likes_count: i64,
    pub rating_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub filename: String,
    pub url: String,
    pub size: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: String,
    pub search_index: String,
    pub indexed_recipes: u64,
    pub realtime_connections: usize,
}
