//! Category operations.

use crate::types::{CategoryId, now_millis};
use crate::Result;

use super::{Category, Database, query_error};

impl Database {
    /// Insert a category
    ///
    /// Names are unique ignoring case; a duplicate fails with a constraint violation.
    pub async fn insert_category(&self, name: &str) -> Result<Category> {
        let category = Category {
            id: CategoryId::new(),
            name: name.to_string(),
            created_at: now_millis(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?, ?, ?)")
            .bind(category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to insert category"))?;

        Ok(category)
    }

    /// List all categories by name
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name COLLATE NOCASE ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("Failed to list categories"))?;

        Ok(categories)
    }

    /// Get a category by ID
    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("Failed to get category"))?;

        Ok(category)
    }

    /// Get a category by name, ignoring case
    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("Failed to get category by name"))?;

        Ok(category)
    }

    /// Return the IDs from `ids` that name no stored category, in input order
    pub async fn missing_categories(&self, ids: &[CategoryId]) -> Result<Vec<CategoryId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT id FROM categories WHERE id IN (");
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found: Vec<CategoryId> = query_builder
            .build_query_scalar::<CategoryId>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to check categories"))?;

        Ok(ids
            .iter()
            .filter(|id| !found.contains(id))
            .copied()
            .collect())
    }
}
