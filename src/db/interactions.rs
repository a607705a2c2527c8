use crate::db::{models::*, DbPool};
use crate::error::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;

/// Flip the user's like on a recipe. Returns whether the recipe is liked afterwards.
pub async fn toggle_like(pool: &DbPool, user_id: &str, recipe_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM recipe_likes WHERE user_id = ? AND recipe_id = ?")
        .bind(user_id)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = if removed == 0 {
        sqlx::query("INSERT INTO recipe_likes (user_id, recipe_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(recipe_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        true
    } else {
        false
    };

    tx.commit().await?;
    Ok(liked)
}

/// Whether the user currently likes the recipe
pub async fn is_liked(pool: &DbPool, user_id: &str, recipe_id: i64) -> Result<bool> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM recipe_likes WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Count likes on a recipe
pub async fn count_likes(pool: &DbPool, recipe_id: i64) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_likes WHERE recipe_id = ?")
        .bind(recipe_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// IDs of the recipes a user liked, most recent like first
pub async fn liked_recipe_ids(pool: &DbPool, user_id: &str) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT recipe_id FROM recipe_likes WHERE user_id = ? ORDER BY created_at DESC, recipe_id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Insert or replace the user's rating for a recipe
pub async fn upsert_rating(pool: &DbPool, user_id: &str, recipe_id: i64, score: i64) -> Result<()> {
    if !(1..=5).contains(&score) {
        return Err(Error::Validation(format!(
            "Rating must be between 1 and 5, got {score}"
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO recipe_ratings (user_id, recipe_id, score, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(user_id, recipe_id) DO UPDATE SET
            score = excluded.score,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(score)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Like and rating aggregates for one recipe
pub async fn recipe_stats(pool: &DbPool, recipe_id: i64) -> Result<RecipeStats> {
    let stats = sqlx::query_as::<_, RecipeStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM recipe_likes WHERE recipe_id = ?1) AS likes_count,
            (SELECT AVG(score) FROM recipe_ratings WHERE recipe_id = ?1) AS rating_average,
            (SELECT COUNT(*) FROM recipe_ratings WHERE recipe_id = ?1) AS rating_count
        "#,
    )
    .bind(recipe_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

/// Like counts for multiple recipes in a single query (batch loading to avoid N+1)
pub async fn like_counts_for_recipes(
    pool: &DbPool,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, i64>> {
    if recipe_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = recipe_ids
        .iter()
        .enumerate()
        .map(|(i, _)| format!("?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    let query_str = format!(
        r#"
        SELECT recipe_id, COUNT(*)
        FROM recipe_likes
        WHERE recipe_id IN ({placeholders})
        GROUP BY recipe_id
        "#
    );

    let mut query = sqlx::query_as::<_, (i64, i64)>(&query_str);
    for id in recipe_ids {
        query = query.bind(id);
    }

    let mut counts: HashMap<i64, i64> = query.fetch_all(pool).await?.into_iter().collect();

    for &recipe_id in recipe_ids {
        counts.entry(recipe_id).or_insert(0);
    }

    Ok(counts)
}

/// Recipes ranked by likes, then average rating, then recency.
/// With a user, their own recipes and the ones they already liked are left out.
pub async fn popular_recipes(
    pool: &DbPool,
    exclude_user: Option<&str>,
    limit: i64,
) -> Result<Vec<RankedRecipe>> {
    let recipes = sqlx::query_as::<_, RankedRecipe>(
        r#"
        SELECT r.*,
            (SELECT COUNT(*) FROM recipe_likes l WHERE l.recipe_id = r.id) AS likes_count,
            (SELECT AVG(g.score) FROM recipe_ratings g WHERE g.recipe_id = r.id) AS rating_average
        FROM recipes r
        WHERE ?1 IS NULL
            OR (r.user_id != ?1
                AND r.id NOT IN (SELECT recipe_id FROM recipe_likes WHERE user_id = ?1))
        ORDER BY likes_count DESC, rating_average DESC, r.created_at DESC, r.id DESC
        LIMIT ?2
        "#,
    )
    .bind(exclude_user)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(recipes)
}
