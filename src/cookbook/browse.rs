//! Categories, listings, search and seeding.

use super::Cookbook;
use crate::db::{Category, RecentlyViewed, RecipeSummary, UserProfile};
use crate::error::DatabaseError;
use crate::form::{CategoryForm, FormData};
use crate::types::{CategoryId, SortOrder, UserId, ViewOrder};
use crate::{Error, Result};

/// Categories every new cookbook starts with
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "appetizer",
    "beverage",
    "bread",
    "breakfast",
    "cake",
    "candy",
    "dessert",
    "entree",
    "preserve",
    "sauce",
    "side",
    "salad",
];

impl Cookbook {
    /// Handle the admin category form
    pub async fn create_category(&self, admin: Option<UserId>, form: &FormData) -> Result<Category> {
        let admin = self.require_admin(admin).await?;
        let name = CategoryForm::from_form(form).validate()?;

        let category = self.db.insert_category(&name).await.map_err(|e| match e {
            Error::Database(DatabaseError::ConstraintViolation(_)) => {
                Error::Conflict(format!("category {} already exists", name))
            }
            other => other,
        })?;

        tracing::info!(category_id = %category.id, user_id = %admin.id, name = %category.name, "category created");
        Ok(category)
    }

    /// All categories, by name
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.db.list_categories().await
    }

    /// Recipes in one category, sorted by title
    pub async fn category_recipes(
        &self,
        category_id: CategoryId,
        sort: SortOrder,
    ) -> Result<(Category, Vec<RecipeSummary>)> {
        let category = self
            .db
            .get_category(category_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {}", category_id)))?;
        let recipes = self.db.list_recipes_by_category(category_id, sort).await?;

        tracing::debug!(category_id = %category_id, count = recipes.len(), "listed category recipes");
        Ok((category, recipes))
    }

    /// The signed-in user's favorites, optionally limited to one category
    pub async fn favorites(
        &self,
        user: Option<UserId>,
        category: Option<CategoryId>,
        sort: SortOrder,
    ) -> Result<Vec<RecipeSummary>> {
        let user = self.require_user(user).await?;
        self.db.list_favorite_recipes(user.id, category, sort).await
    }

    /// The signed-in user's recently viewed recipes
    pub async fn recently_viewed(
        &self,
        user: Option<UserId>,
        order: ViewOrder,
    ) -> Result<Vec<RecentlyViewed>> {
        let user = self.require_user(user).await?;
        self.db.list_recently_viewed(user.id, order).await
    }

    /// The signed-in user's profile page
    pub async fn profile(&self, user: Option<UserId>) -> Result<UserProfile> {
        let user = self.require_user(user).await?;
        self.db
            .get_user_profile(user.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user.id)))
    }

    /// Search recipes by title, ingredient or category
    ///
    /// A blank query returns nothing rather than every recipe.
    pub async fn search(&self, query: &str) -> Result<Vec<RecipeSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .db
            .search_recipes(query, self.config.recipes.search_limit)
            .await?;
        tracing::debug!(query, count = results.len(), "recipe search");
        Ok(results)
    }

    /// Insert any of [`DEFAULT_CATEGORIES`] that are missing
    ///
    /// Returns how many were inserted.
    pub async fn seed_default_categories(&self) -> Result<usize> {
        let mut inserted = 0;
        for name in DEFAULT_CATEGORIES {
            if self.db.get_category_by_name(name).await?.is_none() {
                self.db.insert_category(name).await?;
                inserted += 1;
            }
        }

        if inserted > 0 {
            tracing::info!(inserted, "seeded default categories");
        }
        Ok(inserted)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookbook::test_support::{add_user, test_cookbook};
    use crate::error::ToHttpStatus;
    use crate::types::Role;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (cookbook, _temp_file) = test_cookbook().await;

        assert_eq!(
            cookbook.seed_default_categories().await.unwrap(),
            DEFAULT_CATEGORIES.len()
        );
        assert_eq!(cookbook.seed_default_categories().await.unwrap(), 0);

        let names: Vec<String> = cookbook
            .categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(names.first().map(String::as_str), Some("appetizer"));
        assert_eq!(names.last().map(String::as_str), Some("side"));
    }

    #[tokio::test]
    async fn create_category_requires_admin_and_unique_name() {
        let (cookbook, _temp_file) = test_cookbook().await;
        let member = add_user(&cookbook, "m@example.com", Role::User).await;
        let admin = add_user(&cookbook, "a@example.com", Role::Admin).await;
        let form = FormData::parse("name=Soup");

        assert_eq!(
            cookbook
                .create_category(Some(member), &form)
                .await
                .unwrap_err()
                .status_code(),
            403
        );

        let soup = cookbook.create_category(Some(admin), &form).await.unwrap();
        assert_eq!(soup.name, "Soup");

        assert_eq!(
            cookbook
                .create_category(Some(admin), &FormData::parse("name=soup"))
                .await
                .unwrap_err()
                .status_code(),
            409
        );
        assert_eq!(
            cookbook
                .create_category(Some(admin), &FormData::parse("name=++"))
                .await
                .unwrap_err()
                .status_code(),
            400
        );
    }

    #[tokio::test]
    async fn unknown_category_listing_is_404() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let err = cookbook
            .category_recipes(CategoryId::new(), SortOrder::Asc)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn blank_search_returns_nothing() {
        let (cookbook, _temp_file) = test_cookbook().await;

        assert!(cookbook.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn personal_lists_require_sign_in() {
        let (cookbook, _temp_file) = test_cookbook().await;

        assert_eq!(
            cookbook
                .favorites(None, None, SortOrder::Asc)
                .await
                .unwrap_err()
                .status_code(),
            401
        );
        assert_eq!(
            cookbook
                .recently_viewed(None, ViewOrder::Newest)
                .await
                .unwrap_err()
                .status_code(),
            401
        );
        assert_eq!(cookbook.profile(None).await.unwrap_err().status_code(), 401);
    }
}
