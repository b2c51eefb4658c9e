//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Database;

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        // Connect to database with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self { pool };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create initial schema
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            Self::create_users_schema(conn).await?;
            Self::create_recipes_schema(conn).await?;
            Self::create_activity_schema(conn).await?;
            Self::record_migration(conn, 1).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v1: {}",
                            e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    /// Execute each DDL statement, naming the failing one in the error
    async fn execute_ddl(conn: &mut SqliteConnection, statements: &[(&str, &str)]) -> Result<()> {
        for (what, sql) in statements {
            sqlx::query(sql).execute(&mut *conn).await.map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to create {}: {}",
                    what, e
                )))
            })?;
        }
        Ok(())
    }

    /// Create users, passwords and password_resets tables
    async fn create_users_schema(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            &[
                (
                    "users table",
                    r#"
                    CREATE TABLE users (
                        id BLOB PRIMARY KEY,
                        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                        first_name TEXT,
                        last_name TEXT,
                        role TEXT NOT NULL DEFAULT 'user',
                        created_at INTEGER NOT NULL,
                        updated_at INTEGER NOT NULL
                    )
                    "#,
                ),
                (
                    "passwords table",
                    r#"
                    CREATE TABLE passwords (
                        user_id BLOB PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                        hash TEXT NOT NULL
                    )
                    "#,
                ),
                (
                    "password_resets table",
                    r#"
                    CREATE TABLE password_resets (
                        user_id BLOB PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                        token_hash TEXT NOT NULL,
                        expires_at INTEGER NOT NULL
                    )
                    "#,
                ),
            ],
        )
        .await
    }

    /// Create categories, recipes, recipe_categories and ingredients tables
    async fn create_recipes_schema(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            &[
                (
                    "categories table",
                    r#"
                    CREATE TABLE categories (
                        id BLOB PRIMARY KEY,
                        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                        created_at INTEGER NOT NULL
                    )
                    "#,
                ),
                (
                    "recipes table",
                    r#"
                    CREATE TABLE recipes (
                        id BLOB PRIMARY KEY,
                        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                        title TEXT NOT NULL,
                        instructions TEXT NOT NULL,
                        servings TEXT,
                        background TEXT,
                        created_at INTEGER NOT NULL,
                        updated_at INTEGER NOT NULL
                    )
                    "#,
                ),
                (
                    "recipes author index",
                    "CREATE INDEX idx_recipes_user ON recipes(user_id)",
                ),
                (
                    "recipe_categories table",
                    r#"
                    CREATE TABLE recipe_categories (
                        recipe_id BLOB NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                        category_id BLOB NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                        PRIMARY KEY (recipe_id, category_id)
                    )
                    "#,
                ),
                (
                    "recipe_categories category index",
                    "CREATE INDEX idx_recipe_categories_category ON recipe_categories(category_id)",
                ),
                (
                    "ingredients table",
                    r#"
                    CREATE TABLE ingredients (
                        id BLOB PRIMARY KEY,
                        recipe_id BLOB NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                        name TEXT NOT NULL,
                        quantity TEXT,
                        position INTEGER NOT NULL
                    )
                    "#,
                ),
                (
                    "ingredients recipe index",
                    "CREATE INDEX idx_ingredients_recipe ON ingredients(recipe_id, position)",
                ),
            ],
        )
        .await
    }

    /// Create notes, favorites and recipe_reads tables
    async fn create_activity_schema(conn: &mut SqliteConnection) -> Result<()> {
        Self::execute_ddl(
            conn,
            &[
                (
                    "notes table",
                    r#"
                    CREATE TABLE notes (
                        id BLOB PRIMARY KEY,
                        recipe_id BLOB NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                        content TEXT NOT NULL,
                        created_at INTEGER NOT NULL,
                        updated_at INTEGER NOT NULL
                    )
                    "#,
                ),
                (
                    "notes recipe index",
                    "CREATE INDEX idx_notes_recipe ON notes(recipe_id, created_at)",
                ),
                (
                    "favorites table",
                    r#"
                    CREATE TABLE favorites (
                        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                        recipe_id BLOB NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                        created_at INTEGER NOT NULL,
                        PRIMARY KEY (user_id, recipe_id)
                    )
                    "#,
                ),
                (
                    "favorites recipe index",
                    "CREATE INDEX idx_favorites_recipe ON favorites(recipe_id)",
                ),
                (
                    "recipe_reads table",
                    r#"
                    CREATE TABLE recipe_reads (
                        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                        recipe_id BLOB NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                        created_at INTEGER NOT NULL,
                        updated_at INTEGER NOT NULL,
                        PRIMARY KEY (user_id, recipe_id)
                    )
                    "#,
                ),
                (
                    "recipe_reads user index",
                    "CREATE INDEX idx_recipe_reads_user ON recipe_reads(user_id, updated_at)",
                ),
            ],
        )
        .await
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i32) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record migration: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
