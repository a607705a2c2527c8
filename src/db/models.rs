use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// One ingredient line: "200 g flour" is `{name: flour, count: 200, type: g}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub count: f64,
    #[serde(rename = "type")]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub number: i64,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub ingredients: Json<Vec<Ingredient>>,
    pub instructions: Json<Vec<Step>>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub user_id: String,
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Step>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecipe {
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Step>,
    pub photo_url: Option<String>,
}

/// Like and rating aggregates for one recipe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecipeStats {
    pub likes_count: i64,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RankedRecipe {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recipe: Recipe,
    pub likes_count: i64,
    pub rating_average: Option<f64>,
}
