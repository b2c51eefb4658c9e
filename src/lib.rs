//! # family-cookbook
//!
//! Backend library for a family recipe-sharing site.
//!
//! ## Design Philosophy
//!
//! family-cookbook is designed to be:
//! - **Form-first** - Operations take the submitted form as-is and do their own decoding
//!   and validation, reporting every failing field at once
//! - **Library-first** - No HTTP server, sessions or UI; the embedding request layer
//!   passes in the signed-in user and the form body
//! - **Transactional** - A recipe and its ingredients and categories change together or
//!   not at all
//!
//! ## Quick Start
//!
//! ```no_run
//! use family_cookbook::{Config, Cookbook, FormData, PasswordHasher, Result};
//! use std::sync::Arc;
//!
//! struct MyHasher;
//!
//! impl PasswordHasher for MyHasher {
//!     fn hash(&self, password: &str) -> Result<String> {
//!         Ok(format!("not-a-real-hash:{password}"))
//!     }
//!
//!     fn verify(&self, password: &str, hash: &str) -> Result<bool> {
//!         Ok(hash == format!("not-a-real-hash:{password}"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let cookbook = Cookbook::new(Config::default(), Arc::new(MyHasher)).await?;
//!     cookbook.seed_default_categories().await?;
//!
//!     let user = cookbook
//!         .register("grandma@example.com", "correct horse", Some("Grandma"), None)
//!         .await?;
//!     let bread = cookbook.db.get_category_by_name("bread").await?.ok_or("no bread")?;
//!
//!     let body = format!(
//!         "title=Soda+Bread&instructions=Mix+and+bake&categories={}\
//!          &ingredient[a1][name]=flour&ingredient[a1][quantity]=4+cups\
//!          &ingredient[b2][name]=buttermilk",
//!         bread.id
//!     );
//!     let recipe_id = cookbook
//!         .create_recipe(Some(user.id), &FormData::parse(&body))
//!         .await?;
//!
//!     let page = cookbook.view_recipe(recipe_id, Some(user.id)).await?;
//!     println!("{} has {} ingredients", page.details.recipe.title, page.details.ingredients.len());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// High-level operations over forms and storage
pub mod cookbook;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Form decoding and validation
pub mod form;
/// Identifiers and ordering types
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use cookbook::{
    Cookbook, PasswordHasher, PasswordResetToken, RecipeAction, RecipeActionOutcome, RecipePage,
};
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, FormError, PasswordResetError, Result,
    ToHttpStatus, ValidationError,
};
pub use form::{FormData, IngredientDraft, decode_ingredients};
pub use types::{CategoryId, IngredientId, NoteId, RecipeId, Role, SortOrder, UserId, ViewOrder};
