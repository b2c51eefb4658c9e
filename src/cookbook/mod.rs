//! High-level cookbook operations
//!
//! [`Cookbook`] is what the embedding request layer calls: each operation takes the
//! signed-in user (if any) and the submitted form, runs decoding and validation,
//! and only then touches the database.
//!
//! ## Submodules
//!
//! - [`accounts`] - registration, login checks, password reset tokens, profiles
//! - [`recipes`] - recipe create/update/delete, the recipe page and its actions
//! - [`browse`] - categories, listings, search and seeding

use crate::config::Config;
use crate::db::Database;
use crate::Result;
use std::sync::Arc;

pub mod accounts;
pub mod browse;
pub mod recipes;

pub use accounts::PasswordResetToken;
pub use recipes::{RecipeAction, RecipeActionOutcome, RecipePage};

/// Password hashing supplied by the embedder
///
/// The cookbook never sees a hashing algorithm; it stores whatever string
/// [`hash`](PasswordHasher::hash) returns and asks [`verify`](PasswordHasher::verify)
/// to check it later.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Family cookbook backend
///
/// Cheap to clone; clones share the database pool.
#[derive(Clone)]
pub struct Cookbook {
    /// Database instance for persistence (wrapped in Arc for sharing across handlers)
    pub db: Arc<Database>,
    pub(crate) config: Arc<Config>,
    pub(crate) hasher: Arc<dyn PasswordHasher>,
}

impl Cookbook {
    /// Validate the configuration and open the database it names
    pub async fn new(config: Config, hasher: Arc<dyn PasswordHasher>) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        tracing::info!(
            path = %config.persistence.database_path.display(),
            "cookbook database opened"
        );

        Self::with_database(db, config, hasher)
    }

    /// Wrap an already opened database
    pub fn with_database(
        db: Database,
        config: Config,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            db: Arc::new(db),
            config: Arc::new(config),
            hasher,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::NewUser;
    use crate::error::Error;
    use crate::types::{Role, UserId};
    use tempfile::NamedTempFile;

    /// Reversible stand-in for a real hasher
    pub(crate) struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String> {
            Ok(format!("plain:{password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool> {
            hash.strip_prefix("plain:")
                .map(|stored| stored == password)
                .ok_or_else(|| Error::PasswordHash("unrecognized hash".into()))
        }
    }

    pub(crate) async fn test_cookbook() -> (Cookbook, NamedTempFile) {
        test_cookbook_with(Config::default()).await
    }

    pub(crate) async fn test_cookbook_with(config: Config) -> (Cookbook, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Database::new(temp_file.path()).await.unwrap();
        let cookbook = Cookbook::with_database(db, config, Arc::new(PlainHasher)).unwrap();
        (cookbook, temp_file)
    }

    pub(crate) async fn add_user(cookbook: &Cookbook, email: &str, role: Role) -> UserId {
        cookbook
            .db
            .insert_user(&NewUser {
                email,
                password_hash: "plain:password123",
                first_name: Some("Family"),
                last_name: Some("Member"),
                role,
            })
            .await
            .unwrap()
            .id
    }
}
