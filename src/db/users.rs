//! Account, password and profile operations.

use crate::error::DatabaseError;
use crate::types::{Role, SortOrder, UserId, ViewOrder, now_millis};
use crate::{Error, Result};
use sqlx::SqliteConnection;

use super::{Database, NewUser, User, UserCredentials, UserProfile, query_error};

const USER_COLUMNS: &str =
    "u.id, u.email, u.first_name, u.last_name, u.role, u.created_at, u.updated_at";

impl Database {
    /// Insert a new account together with its password hash
    ///
    /// Both rows are written in one transaction. A duplicate email (compared
    /// ignoring case) fails with [`DatabaseError::ConstraintViolation`].
    pub async fn insert_user(&self, new_user: &NewUser<'_>) -> Result<User> {
        let now = now_millis();
        let user = User {
            id: UserId::new(),
            email: new_user.email.to_string(),
            first_name: new_user.first_name.map(String::from),
            last_name: new_user.last_name.map(String::from),
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(query_error("Failed to insert user"))?;

        sqlx::query("INSERT INTO passwords (user_id, hash) VALUES (?, ?)")
            .bind(user.id)
            .bind(new_user.password_hash)
            .execute(&mut *tx)
            .await
            .map_err(query_error("Failed to insert password"))?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit user insert: {}",
                e
            )))
        })?;

        Ok(user)
    }

    /// Get an account by ID
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to get user"))?;

        Ok(user)
    }

    /// Get an account by email, ignoring case
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to get user by email"))?;

        Ok(user)
    }

    /// Get an account and its stored password hash for login
    pub async fn get_credentials(&self, email: &str) -> Result<Option<UserCredentials>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}, p.hash AS password_hash
            FROM users u
            LEFT JOIN passwords p ON p.user_id = u.id
            WHERE u.email = ?
            "#
        );
        let credentials = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to get credentials"))?;

        Ok(credentials)
    }

    /// Replace (or set) an account's password hash
    pub async fn update_password(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(query_error("Failed to acquire connection"))?;
        Self::write_password(&mut *conn, user_id, password_hash).await
    }

    pub(super) async fn write_password(
        conn: &mut SqliteConnection,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO passwords (user_id, hash)
            VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET hash = excluded.hash
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *conn)
        .await
        .map_err(query_error("Failed to update password"))?;

        Ok(())
    }

    /// Update an account's name
    ///
    /// Returns false if the account does not exist.
    pub async fn update_user_name(
        &self,
        user_id: UserId,
        first_name: &str,
        last_name: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET first_name = ?, last_name = ?, updated_at = ? WHERE id = ?",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(now_millis())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(query_error("Failed to update user name"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Change an account's role
    ///
    /// Returns false if the account does not exist.
    pub async fn set_role(&self, user_id: UserId, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role)
            .bind(now_millis())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to set role"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an account and everything it owns
    ///
    /// Returns false if no account has the email.
    pub async fn delete_user_by_email(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(query_error("Failed to delete user"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Load an account with its authored, favorited and recently viewed recipes
    pub async fn get_user_profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let Some(user) = self.get_user(user_id).await? else {
            return Ok(None);
        };

        let recipes = self.list_recipes_by_author(user_id).await?;
        let favorites = self
            .list_favorite_recipes(user_id, None, SortOrder::Asc)
            .await?;
        let recently_viewed = self
            .list_recently_viewed(user_id, ViewOrder::Newest)
            .await?;

        Ok(Some(UserProfile {
            user,
            recipes,
            favorites,
            recently_viewed,
        }))
    }
}
