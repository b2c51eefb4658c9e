//! Cookbook fixtures shared by integration tests

use family_cookbook::config::PersistenceConfig;
use family_cookbook::{Config, Cookbook, Error, PasswordHasher, Result};
use std::sync::Arc;
use tempfile::TempDir;

/// Hasher that tags the password instead of hashing it
pub struct TaggingHasher;

impl PasswordHasher for TaggingHasher {
    fn hash(&self, password: &str) -> Result<String> {
        Ok(format!("tagged${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let stored = hash
            .strip_prefix("tagged$")
            .ok_or_else(|| Error::PasswordHash(format!("malformed hash {hash}")))?;
        Ok(stored == password)
    }
}

/// Open a cookbook backed by a database inside a fresh temp directory
pub async fn open_cookbook() -> (Cookbook, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config {
        persistence: PersistenceConfig {
            database_path: temp_dir.path().join("data").join("cookbook.db"),
        },
        ..Default::default()
    };

    let cookbook = Cookbook::new(config, Arc::new(TaggingHasher)).await.unwrap();
    (cookbook, temp_dir)
}

/// Build a URL-encoded recipe body
pub fn recipe_body(title: &str, categories: &[String], ingredients: &[(&str, &str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer
        .append_pair("title", title)
        .append_pair("instructions", "Combine, then cook until done")
        .append_pair("servings", "4");
    for category in categories {
        serializer.append_pair("categories", category);
    }
    for (group, name, quantity) in ingredients {
        serializer
            .append_pair(&format!("ingredient[{group}][name]"), name)
            .append_pair(&format!("ingredient[{group}][quantity]"), quantity);
    }
    serializer.finish()
}
