//! Per-user favorite recipes.

use crate::types::{RecipeId, UserId, now_millis};
use crate::Result;

use super::{Database, query_error};

impl Database {
    /// Mark a recipe as a favorite; favoriting twice is a no-op
    pub async fn favorite_recipe(&self, user_id: UserId, recipe_id: RecipeId) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favorites (user_id, recipe_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, recipe_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(query_error("Failed to favorite recipe"))?;

        Ok(())
    }

    /// Remove a favorite
    ///
    /// Returns false if the recipe was not a favorite.
    pub async fn unfavorite_recipe(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND recipe_id = ?")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to unfavorite recipe"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the user favorited the recipe
    pub async fn is_favorite(&self, user_id: UserId, recipe_id: RecipeId) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM favorites WHERE user_id = ? AND recipe_id = ?")
                .bind(user_id)
                .bind(recipe_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(query_error("Failed to check favorite"))?;

        Ok(found.is_some())
    }
}
