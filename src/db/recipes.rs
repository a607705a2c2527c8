use crate::db::{models::*, DbPool};
use crate::error::{Error, Result};
use chrono::Utc;
use sqlx::types::Json;

/// Create a new recipe
pub async fn create_recipe(pool: &DbPool, new_recipe: &NewRecipe) -> Result<Recipe> {
    let now = Utc::now();

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (
            user_id, title, ingredients, instructions, photo_url, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&new_recipe.user_id)
    .bind(&new_recipe.title)
    .bind(Json(&new_recipe.ingredients))
    .bind(Json(&new_recipe.instructions))
    .bind(&new_recipe.photo_url)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(recipe)
}

/// Get recipe by ID
pub async fn get_recipe(pool: &DbPool, recipe_id: i64) -> Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))?;

    Ok(recipe)
}

/// Update recipe
pub async fn update_recipe(pool: &DbPool, recipe_id: i64, update: &UpdateRecipe) -> Result<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET title = ?, ingredients = ?, instructions = ?, photo_url = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&update.title)
    .bind(Json(&update.ingredients))
    .bind(Json(&update.instructions))
    .bind(&update.photo_url)
    .bind(Utc::now())
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} not found")))?;

    Ok(recipe)
}

/// Delete recipe. Likes and ratings go with it.
pub async fn delete_recipe(pool: &DbPool, recipe_id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Recipe {recipe_id} not found")));
    }

    Ok(())
}

/// List all recipes with pagination, newest first
pub async fn list_recipes(pool: &DbPool, limit: i64, offset: i64) -> Result<Vec<Recipe>> {
    let recipes = sqlx::query_as::<_, Recipe>(
        "SELECT * FROM recipes ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(recipes)
}

/// List recipes authored by a user, newest first
pub async fn list_recipes_by_user(
    pool: &DbPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Recipe>> {
    let recipes = sqlx::query_as::<_, Recipe>(
        "SELECT * FROM recipes WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(recipes)
}

/// List recipes in ID order, for batch processing
pub async fn list_recipes_after(pool: &DbPool, after_id: i64, limit: i64) -> Result<Vec<Recipe>> {
    let recipes =
        sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id > ? ORDER BY id LIMIT ?")
            .bind(after_id)
            .bind(limit)
            .fetch_all(pool)
            .await?;

    Ok(recipes)
}

/// Count all recipes
pub async fn count_all_recipes(pool: &DbPool) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{sample_recipe, seed_user};
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_recipe_crud() {
        let pool = test_pool().await;
        seed_user(&pool, "chef").await;

        let recipe = create_recipe(&pool, &sample_recipe("chef", "Carbonara"))
            .await
            .unwrap();
        assert_eq!(recipe.title, "Carbonara");
        assert_eq!(recipe.ingredients.0.len(), 1);

        let retrieved = get_recipe(&pool, recipe.id).await.unwrap();
        assert_eq!(retrieved.instructions.0[0].instruction, "Boil the pasta");

        let updated = update_recipe(
            &pool,
            recipe.id,
            &UpdateRecipe {
                title: "Carbonara Classica".to_string(),
                ingredients: recipe.ingredients.0.clone(),
                instructions: recipe.instructions.0.clone(),
                photo_url: Some("/uploads/files/abc.png".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Carbonara Classica");
        assert!(updated.photo_url.is_some());

        delete_recipe(&pool, recipe.id).await.unwrap();
        assert!(matches!(
            get_recipe(&pool, recipe.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            delete_recipe(&pool, recipe.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let pool = test_pool().await;
        seed_user(&pool, "a").await;
        seed_user(&pool, "b").await;

        for title in ["One", "Two", "Three"] {
            create_recipe(&pool, &sample_recipe("a", title)).await.unwrap();
        }
        create_recipe(&pool, &sample_recipe("b", "Four")).await.unwrap();

        assert_eq!(count_all_recipes(&pool).await.unwrap(), 4);
        assert_eq!(list_recipes(&pool, 2, 0).await.unwrap().len(), 2);
        assert_eq!(list_recipes_by_user(&pool, "a", 10, 0).await.unwrap().len(), 3);

        let batch = list_recipes_after(&pool, 0, 3).await.unwrap();
        assert_eq!(batch.len(), 3);
        let rest = list_recipes_after(&pool, batch[2].id, 3).await.unwrap();
        assert_eq!(rest.len(), 1);
    }
}
