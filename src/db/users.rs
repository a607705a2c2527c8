use crate::db::{models::*, DbPool};
use crate::error::{Error, Result};
use chrono::Utc;

/// Create the user, or refresh email and display name if the identity is already known
pub async fn upsert_user(pool: &DbPool, new_user: &NewUser) -> Result<(User, bool)> {
    let existing = find_user(pool, &new_user.id).await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, display_name, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            email = excluded.email,
            display_name = excluded.display_name
        RETURNING *
        "#,
    )
    .bind(&new_user.id)
    .bind(&new_user.email)
    .bind(&new_user.display_name)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        let duplicate = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if duplicate {
            Error::Validation(format!("Email {} is already registered", new_user.email))
        } else {
            Error::Database(e)
        }
    })?;

    Ok((user, existing.is_none()))
}

/// Get user by ID
pub async fn get_user(pool: &DbPool, user_id: &str) -> Result<User> {
    find_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {user_id} not found")))
}

/// Get user by ID, `None` when the identity never registered
pub async fn find_user(pool: &DbPool, user_id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Count recipes authored by a user
pub async fn count_user_recipes(pool: &DbPool, user_id: &str) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Count recipes a user liked
pub async fn count_user_likes(pool: &DbPool, user_id: &str) -> Result<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipe_likes WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_upsert_user() {
        let pool = test_pool().await;

        let new_user = NewUser {
            id: "uid-1".to_string(),
            email: "cook@example.com".to_string(),
            display_name: Some("Cook".to_string()),
        };

        let (user, created) = upsert_user(&pool, &new_user).await.unwrap();
        assert!(created);
        assert_eq!(user.email, "cook@example.com");

        let renamed = NewUser {
            display_name: Some("Head Cook".to_string()),
            ..new_user
        };
        let (user, created) = upsert_user(&pool, &renamed).await.unwrap();
        assert!(!created);
        assert_eq!(user.display_name.as_deref(), Some("Head Cook"));

        assert!(get_user(&pool, "uid-1").await.is_ok());
        assert!(matches!(
            get_user(&pool, "missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_validation_error() {
        let pool = test_pool().await;

        upsert_user(
            &pool,
            &NewUser {
                id: "uid-1".to_string(),
                email: "same@example.com".to_string(),
                display_name: None,
            },
        )
        .await
        .unwrap();

        let result = upsert_user(
            &pool,
            &NewUser {
                id: "uid-2".to_string(),
                email: "same@example.com".to_string(),
                display_name: None,
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
