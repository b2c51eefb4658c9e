//! Recently viewed tracking.

use crate::types::{RecipeId, UserId, ViewOrder, now_millis};
use crate::Result;

use super::{Database, RECIPE_SUMMARY_COLUMNS, RecentlyViewed, query_error};

impl Database {
    /// Record that a user viewed a recipe
    ///
    /// The first view creates the row; later views only move `updated_at`.
    pub async fn record_recipe_view(&self, user_id: UserId, recipe_id: RecipeId) -> Result<()> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO recipe_reads (user_id, recipe_id, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, recipe_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(query_error("Failed to record recipe view"))?;

        Ok(())
    }

    /// List the recipes a user viewed, by time of the latest view
    pub async fn list_recently_viewed(
        &self,
        user_id: UserId,
        order: ViewOrder,
    ) -> Result<Vec<RecentlyViewed>> {
        let sql = format!(
            r#"
            SELECT {RECIPE_SUMMARY_COLUMNS}, rr.updated_at AS viewed_at
            FROM recipe_reads rr
            JOIN recipes r ON r.id = rr.recipe_id
            JOIN users u ON u.id = r.user_id
            WHERE rr.user_id = ?
            ORDER BY rr.updated_at {order}, r.title COLLATE NOCASE ASC
            "#,
            order = order.as_sql()
        );

        let reads = sqlx::query_as::<_, RecentlyViewed>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list recently viewed"))?;

        Ok(reads)
    }
}
