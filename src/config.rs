//! Configuration types for family-cookbook

use crate::error::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Main configuration for [`Cookbook`](crate::Cookbook)
///
/// Fields are organized into sub-configs:
/// - [`persistence`](PersistenceConfig) - database location
/// - [`accounts`](AccountConfig) - passwords and reset tokens
/// - [`recipes`](RecipeConfig) - content validation and search
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Account and password reset settings
    #[serde(default)]
    pub accounts: AccountConfig,

    /// Recipe and note content rules
    #[serde(default)]
    pub recipes: RecipeConfig,
}

impl Config {
    /// Check values that deserialize fine but cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.accounts.reset_token_ttl.is_zero() {
            return Err(Error::Config {
                message: "reset token lifetime must be greater than zero".into(),
                key: Some("accounts.reset_token_ttl".into()),
            });
        }
        if self.accounts.reset_token_bytes < 16 {
            return Err(Error::Config {
                message: "reset tokens need at least 16 random bytes".into(),
                key: Some("accounts.reset_token_bytes".into()),
            });
        }
        if self.recipes.search_limit == 0 {
            return Err(Error::Config {
                message: "search limit must be greater than zero".into(),
                key: Some("recipes.search_limit".into()),
            });
        }
        if let Err(e) = url::Url::parse(&self.accounts.app_base_url) {
            return Err(Error::Config {
                message: format!("invalid app base URL: {}", e),
                key: Some("accounts.app_base_url".into()),
            });
        }
        Ok(())
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./family-cookbook.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Account, password and reset token configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Minimum accepted password length (default: 8)
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// How long a password reset token stays valid (default: 1 hour)
    #[serde(with = "duration_serde", default = "default_reset_token_ttl")]
    pub reset_token_ttl: Duration,

    /// Number of random bytes in a reset token before hex encoding (default: 32)
    #[serde(default = "default_reset_token_bytes")]
    pub reset_token_bytes: usize,

    /// Public base URL used to build reset links (default: "http://localhost:3000")
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            reset_token_ttl: default_reset_token_ttl(),
            reset_token_bytes: default_reset_token_bytes(),
            app_base_url: default_app_base_url(),
        }
    }
}

/// Recipe content rules
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Minimum trimmed length of recipe instructions (default: 3)
    #[serde(default = "default_min_text_length")]
    pub min_instructions_length: usize,

    /// Minimum length of a note (default: 3)
    #[serde(default = "default_min_text_length")]
    pub min_note_length: usize,

    /// Maximum number of search results (default: 20)
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            min_instructions_length: default_min_text_length(),
            min_note_length: default_min_text_length(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./family-cookbook.db")
}

fn default_min_password_length() -> usize {
    8
}

fn default_reset_token_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_reset_token_bytes() -> usize {
    32
}

fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_min_text_length() -> usize {
    3
}

fn default_search_limit() -> usize {
    20
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
