use crate::db::*;
use crate::form::{IngredientInput, RecipeSubmission};
use crate::types::{CategoryId, Role};
use tempfile::NamedTempFile;

mod categories;
mod close;
mod reads;

/// Open a fresh database; keep the temp file alive for the test's duration
async fn open_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

async fn insert_test_user(db: &Database, email: &str) -> User {
    db.insert_user(&NewUser {
        email,
        password_hash: "hashed:password",
        first_name: Some("Test"),
        last_name: None,
        role: Role::User,
    })
    .await
    .unwrap()
}

fn submission(title: &str, categories: Vec<CategoryId>, ingredients: &[&str]) -> RecipeSubmission {
    RecipeSubmission {
        title: title.to_string(),
        instructions: "Mix everything".to_string(),
        servings: Some("4".to_string()),
        background: None,
        categories,
        ingredients: ingredients
            .iter()
            .map(|name| IngredientInput::new(*name, None))
            .collect(),
    }
}
