//! Recipe CRUD, listings and search.
//!
//! A recipe's categories and ingredients are always written together with the
//! recipe row inside one transaction, so readers never see a recipe with half of
//! its ingredient list.

use crate::error::DatabaseError;
use crate::form::{IngredientInput, RecipeSubmission};
use crate::types::{CategoryId, IngredientId, RecipeId, SortOrder, UserId, now_millis};
use crate::{Error, Result};
use sqlx::SqliteConnection;
use std::collections::HashSet;

use super::{
    Category, Database, Ingredient, RECIPE_SUMMARY_COLUMNS, Recipe, RecipeDetails, RecipeSummary,
    query_error,
};

/// Ingredient rows per INSERT; 5 binds each keeps well under SQLite's variable limit
const INGREDIENT_CHUNK_SIZE: usize = 100;

/// Escape `%`, `_` and `\` so user input matches literally inside a LIKE pattern
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Database {
    /// Insert a recipe with its category links and ingredients
    pub async fn insert_recipe(
        &self,
        author: UserId,
        submission: &RecipeSubmission,
    ) -> Result<RecipeId> {
        let id = RecipeId::new();
        let now = now_millis();

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            INSERT INTO recipes (id, user_id, title, instructions, servings, background, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(author)
        .bind(&submission.title)
        .bind(&submission.instructions)
        .bind(&submission.servings)
        .bind(&submission.background)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(query_error("Failed to insert recipe"))?;

        Self::link_categories(&mut *tx, id, &submission.categories).await?;

        let rows: Vec<(IngredientId, &IngredientInput)> = submission
            .ingredients
            .iter()
            .map(|ingredient| (IngredientId::new(), ingredient))
            .collect();
        Self::insert_ingredients(&mut *tx, id, &rows).await?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit recipe insert: {}",
                e
            )))
        })?;

        Ok(id)
    }

    /// Replace a recipe's details, categories and ingredients
    ///
    /// Runs in one transaction. An ingredient id from the submission is kept only if
    /// it belonged to this recipe before the update; any other id is replaced by a
    /// fresh one. Fails with [`DatabaseError::NotFound`] and changes nothing if the
    /// recipe does not exist.
    pub async fn update_recipe(&self, id: RecipeId, submission: &RecipeSubmission) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let result = sqlx::query(
            r#"
            UPDATE recipes
            SET title = ?, instructions = ?, servings = ?, background = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&submission.title)
        .bind(&submission.instructions)
        .bind(&submission.servings)
        .bind(&submission.background)
        .bind(now_millis())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(query_error("Failed to update recipe"))?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "recipe {}",
                id
            ))));
        }

        let existing: HashSet<IngredientId> =
            sqlx::query_scalar::<_, IngredientId>("SELECT id FROM ingredients WHERE recipe_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(query_error("Failed to load existing ingredients"))?
                .into_iter()
                .collect();

        sqlx::query("DELETE FROM ingredients WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(query_error("Failed to delete ingredients"))?;

        sqlx::query("DELETE FROM recipe_categories WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(query_error("Failed to clear recipe categories"))?;

        Self::link_categories(&mut *tx, id, &submission.categories).await?;

        let mut used: HashSet<IngredientId> = HashSet::with_capacity(submission.ingredients.len());
        let rows: Vec<(IngredientId, &IngredientInput)> = submission
            .ingredients
            .iter()
            .map(|ingredient| {
                let row_id = match ingredient.id {
                    Some(existing_id) if existing.contains(&existing_id) && used.insert(existing_id) => {
                        existing_id
                    }
                    _ => IngredientId::new(),
                };
                (row_id, ingredient)
            })
            .collect();
        Self::insert_ingredients(&mut *tx, id, &rows).await?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit recipe update: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn link_categories(
        conn: &mut SqliteConnection,
        recipe_id: RecipeId,
        categories: &[CategoryId],
    ) -> Result<()> {
        for category_id in categories {
            sqlx::query(
                "INSERT OR IGNORE INTO recipe_categories (recipe_id, category_id) VALUES (?, ?)",
            )
            .bind(recipe_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .map_err(query_error("Failed to link category"))?;
        }
        Ok(())
    }

    /// Insert ingredients in batches, recording each one's position in `rows`
    async fn insert_ingredients(
        conn: &mut SqliteConnection,
        recipe_id: RecipeId,
        rows: &[(IngredientId, &IngredientInput)],
    ) -> Result<()> {
        for (chunk_index, chunk) in rows.chunks(INGREDIENT_CHUNK_SIZE).enumerate() {
            let offset = chunk_index * INGREDIENT_CHUNK_SIZE;
            let mut query_builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
                "INSERT INTO ingredients (id, recipe_id, name, quantity, position) ",
            );

            query_builder.push_values(chunk.iter().enumerate(), |mut b, (i, (id, ingredient))| {
                b.push_bind(*id)
                    .push_bind(recipe_id)
                    .push_bind(ingredient.name.clone())
                    .push_bind(ingredient.quantity.clone())
                    .push_bind((offset + i) as i64);
            });

            query_builder
                .build()
                .execute(&mut *conn)
                .await
                .map_err(query_error("Failed to insert ingredients batch"))?;
        }
        Ok(())
    }

    /// Get the recipe row alone
    pub async fn get_recipe_record(&self, id: RecipeId) -> Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, instructions, servings, background, created_at, updated_at
            FROM recipes WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("Failed to get recipe"))?;

        Ok(recipe)
    }

    /// Get everything shown on a recipe page
    ///
    /// `viewer` only affects [`RecipeDetails::favorited`].
    pub async fn get_recipe(
        &self,
        id: RecipeId,
        viewer: Option<UserId>,
    ) -> Result<Option<RecipeDetails>> {
        let Some(recipe) = self.get_recipe_record(id).await? else {
            return Ok(None);
        };

        let author = self.get_user(recipe.user_id).await?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!(
                "author {} of recipe {}",
                recipe.user_id, id
            )))
        })?;

        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name, c.created_at
            FROM categories c
            JOIN recipe_categories rc ON rc.category_id = c.id
            WHERE rc.recipe_id = ?
            ORDER BY c.name COLLATE NOCASE ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("Failed to get recipe categories"))?;

        let ingredients = self.list_ingredients(id).await?;

        let favorite_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE recipe_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(query_error("Failed to count favorites"))?;

        let favorited = match viewer {
            Some(user_id) => self.is_favorite(user_id, id).await?,
            None => false,
        };

        Ok(Some(RecipeDetails {
            recipe,
            author,
            categories,
            ingredients,
            favorite_count,
            favorited,
        }))
    }

    /// List a recipe's ingredients in submission order
    pub async fn list_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, recipe_id, name, quantity, position
            FROM ingredients
            WHERE recipe_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("Failed to list ingredients"))?;

        Ok(ingredients)
    }

    /// List recipes in a category, ordered by title
    pub async fn list_recipes_by_category(
        &self,
        category_id: CategoryId,
        sort: SortOrder,
    ) -> Result<Vec<RecipeSummary>> {
        let sql = format!(
            r#"
            SELECT {RECIPE_SUMMARY_COLUMNS}
            FROM recipes r
            JOIN users u ON u.id = r.user_id
            JOIN recipe_categories rc ON rc.recipe_id = r.id
            WHERE rc.category_id = ?
            ORDER BY r.title COLLATE NOCASE {order}, r.id
            "#,
            order = sort.as_sql()
        );

        let recipes = sqlx::query_as::<_, RecipeSummary>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list recipes by category"))?;

        Ok(recipes)
    }

    /// List recipes a user authored, by title
    pub async fn list_recipes_by_author(&self, author: UserId) -> Result<Vec<RecipeSummary>> {
        let sql = format!(
            r#"
            SELECT {RECIPE_SUMMARY_COLUMNS}
            FROM recipes r
            JOIN users u ON u.id = r.user_id
            WHERE r.user_id = ?
            ORDER BY r.title COLLATE NOCASE ASC, r.id
            "#
        );

        let recipes = sqlx::query_as::<_, RecipeSummary>(&sql)
            .bind(author)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list recipes by author"))?;

        Ok(recipes)
    }

    /// List a user's favorite recipes, optionally limited to one category
    pub async fn list_favorite_recipes(
        &self,
        user_id: UserId,
        category: Option<CategoryId>,
        sort: SortOrder,
    ) -> Result<Vec<RecipeSummary>> {
        let mut query_builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
            r#"
            SELECT {RECIPE_SUMMARY_COLUMNS}
            FROM recipes r
            JOIN users u ON u.id = r.user_id
            JOIN favorites f ON f.recipe_id = r.id
            WHERE f.user_id = "#
        ));
        query_builder.push_bind(user_id);

        if let Some(category_id) = category {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM recipe_categories rc WHERE rc.recipe_id = r.id AND rc.category_id = ",
            );
            query_builder.push_bind(category_id);
            query_builder.push(")");
        }

        query_builder.push(format!(
            " ORDER BY r.title COLLATE NOCASE {}, r.id",
            sort.as_sql()
        ));

        let recipes = query_builder
            .build_query_as::<RecipeSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list favorite recipes"))?;

        Ok(recipes)
    }

    /// Case-insensitive substring search over titles, ingredient names and category names
    pub async fn search_recipes(&self, query: &str, limit: usize) -> Result<Vec<RecipeSummary>> {
        let pattern = like_pattern(query);
        let sql = format!(
            r#"
            SELECT {RECIPE_SUMMARY_COLUMNS}
            FROM recipes r
            JOIN users u ON u.id = r.user_id
            WHERE r.title LIKE ? ESCAPE '\'
               OR EXISTS (
                   SELECT 1 FROM ingredients i
                   WHERE i.recipe_id = r.id AND i.name LIKE ? ESCAPE '\'
               )
               OR EXISTS (
                   SELECT 1 FROM recipe_categories rc
                   JOIN categories c ON c.id = rc.category_id
                   WHERE rc.recipe_id = r.id AND c.name LIKE ? ESCAPE '\'
               )
            ORDER BY r.title COLLATE NOCASE ASC, r.id
            LIMIT ?
            "#
        );

        let recipes = sqlx::query_as::<_, RecipeSummary>(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to search recipes"))?;

        Ok(recipes)
    }

    /// Delete a recipe; ingredients, links, notes, favorites and reads cascade
    ///
    /// Returns false if the recipe did not exist.
    pub async fn delete_recipe(&self, id: RecipeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to delete recipe"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("egg"), "%egg%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
