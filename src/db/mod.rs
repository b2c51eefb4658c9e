//! Database layer for family-cookbook
//!
//! Handles SQLite persistence for accounts, recipes and everything hanging off them.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`users`] - Accounts, password hashes, profiles
//! - [`password_resets`] - Reset token storage
//! - [`categories`] - Category CRUD
//! - [`recipes`] - Recipe CRUD, transactional ingredient/category replacement, search
//! - [`notes`] - Notes left on recipes
//! - [`favorites`] - Per-user favorite recipes
//! - [`reads`] - Recently viewed tracking

use crate::error::DatabaseError;
use crate::types::{CategoryId, IngredientId, NoteId, RecipeId, Role, UserId};
use crate::Error;
use serde::Serialize;
use sqlx::{FromRow, sqlite::SqlitePool};

mod categories;
mod favorites;
mod migrations;
mod notes;
mod password_resets;
mod reads;
mod recipes;
mod users;

/// New account to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    /// Login email, unique ignoring case
    pub email: &'a str,
    /// Hash produced by the embedder's password hasher
    pub password_hash: &'a str,
    /// Given name
    pub first_name: Option<&'a str>,
    /// Family name
    pub last_name: Option<&'a str>,
    /// Account role
    pub role: Role,
}

/// Account record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    /// Unique database ID
    pub id: UserId,
    /// Login email
    pub email: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// Account role
    pub role: Role,
    /// Unix milliseconds when the account was created
    pub created_at: i64,
    /// Unix milliseconds of the last profile change
    pub updated_at: i64,
}

impl User {
    /// Whether the account may use admin operations
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Account joined with its stored password hash
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    /// The account
    #[sqlx(flatten)]
    pub user: User,
    /// Stored hash, missing for accounts created without a password
    pub password_hash: Option<String>,
}

/// Outstanding password reset for one account
#[derive(Debug, Clone, FromRow)]
pub struct PasswordReset {
    /// Account the token was issued for
    pub user_id: UserId,
    /// SHA-256 hex digest of the token; the token itself is never stored
    pub token_hash: String,
    /// Unix milliseconds after which the token is rejected
    pub expires_at: i64,
}

/// Category record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Category {
    /// Unique database ID
    pub id: CategoryId,
    /// Display name, unique ignoring case
    pub name: String,
    /// Unix milliseconds when the category was created
    pub created_at: i64,
}

/// Recipe record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Recipe {
    /// Unique database ID
    pub id: RecipeId,
    /// Author
    pub user_id: UserId,
    /// Title
    pub title: String,
    /// Preparation instructions
    pub instructions: String,
    /// Servings description
    pub servings: Option<String>,
    /// Story behind the recipe
    pub background: Option<String>,
    /// Unix milliseconds when the recipe was created
    pub created_at: i64,
    /// Unix milliseconds of the last edit
    pub updated_at: i64,
}

/// Ingredient record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Ingredient {
    /// Unique database ID
    pub id: IngredientId,
    /// Recipe this ingredient belongs to
    pub recipe_id: RecipeId,
    /// Ingredient name
    pub name: String,
    /// Free-text quantity
    pub quantity: Option<String>,
    /// 0-based position in the submitted list
    pub position: i64,
}

/// Recipe listing row with its author's name
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct RecipeSummary {
    /// Recipe ID
    pub id: RecipeId,
    /// Title
    pub title: String,
    /// Servings description
    pub servings: Option<String>,
    /// Author ID
    pub author_id: UserId,
    /// Author's given name
    pub author_first_name: Option<String>,
    /// Author's family name
    pub author_last_name: Option<String>,
    /// Unix milliseconds when the recipe was created
    pub created_at: i64,
}

/// Everything shown on a recipe page
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetails {
    /// The recipe itself
    pub recipe: Recipe,
    /// Author account
    pub author: User,
    /// Linked categories, by name
    pub categories: Vec<Category>,
    /// Ingredients in submitted order
    pub ingredients: Vec<Ingredient>,
    /// Number of users who favorited the recipe
    pub favorite_count: i64,
    /// Whether the viewing user favorited it (false for anonymous viewers)
    pub favorited: bool,
}

/// Note record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Note {
    /// Unique database ID
    pub id: NoteId,
    /// Recipe the note is on
    pub recipe_id: RecipeId,
    /// Author
    pub user_id: UserId,
    /// Note text
    pub content: String,
    /// Unix milliseconds when the note was created
    pub created_at: i64,
    /// Unix milliseconds of the last edit
    pub updated_at: i64,
}

/// Note joined with its author's name
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct NoteWithAuthor {
    /// The note
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub note: Note,
    /// Author's given name
    pub author_first_name: Option<String>,
    /// Author's family name
    pub author_last_name: Option<String>,
}

/// Recently viewed entry
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct RecentlyViewed {
    /// The recipe
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recipe: RecipeSummary,
    /// Unix milliseconds of the latest view
    pub viewed_at: i64,
}

/// A user's profile page
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// The account
    pub user: User,
    /// Recipes the user authored, by title
    pub recipes: Vec<RecipeSummary>,
    /// Recipes the user favorited, by title
    pub favorites: Vec<RecipeSummary>,
    /// Recipes the user viewed, newest first
    pub recently_viewed: Vec<RecentlyViewed>,
}

/// Columns selected for [`RecipeSummary`]; expects `recipes r` joined with `users u`
const RECIPE_SUMMARY_COLUMNS: &str = r#"
    r.id, r.title, r.servings, r.created_at,
    u.id AS author_id, u.first_name AS author_first_name, u.last_name AS author_last_name
"#;

/// Map an sqlx error to a database error, keeping constraint violations distinct
/// so callers can report them as conflicts.
fn query_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                return Error::Database(DatabaseError::ConstraintViolation(format!(
                    "{}: {}",
                    context, db_err
                )));
            }
        }
        Error::Database(DatabaseError::QueryFailed(format!("{}: {}", context, e)))
    }
}

/// Database handle for family-cookbook
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
