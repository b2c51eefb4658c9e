//! Password reset token storage.

use crate::types::UserId;
use crate::{Error, Result};

use super::{Database, PasswordReset, query_error};

impl Database {
    /// Store the reset token hash for an account, replacing any earlier token
    pub async fn set_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                token_hash = excluded.token_hash,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(query_error("Failed to set reset token"))?;

        Ok(())
    }

    /// Get the outstanding reset token for an account
    pub async fn get_reset_token(&self, user_id: UserId) -> Result<Option<PasswordReset>> {
        let reset = sqlx::query_as::<_, PasswordReset>(
            "SELECT user_id, token_hash, expires_at FROM password_resets WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("Failed to get reset token"))?;

        Ok(reset)
    }

    /// Consume a reset token and store the new password hash in one transaction
    ///
    /// The token row is deleted only if it still matches `token_hash` and has not
    /// expired at `now`. Returns false, changing nothing, when no such row exists,
    /// so a token can be spent at most once even under concurrent submissions.
    pub async fn consume_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        now: i64,
        password_hash: &str,
    ) -> Result<bool> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(query_error("Failed to acquire connection"))?;

        // IMMEDIATE takes the write lock before reading, so a second consumer
        // waits for this one and then finds the row gone
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(query_error("Failed to begin transaction"))?;

        let result = async {
            let deleted = sqlx::query(
                r#"
                DELETE FROM password_resets
                WHERE user_id = ? AND token_hash = ? AND expires_at >= ?
                "#,
            )
            .bind(user_id)
            .bind(token_hash)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(query_error("Failed to consume reset token"))?;

            if deleted.rows_affected() == 0 {
                return Ok(false);
            }

            Self::write_password(&mut *conn, user_id, password_hash).await?;
            Ok::<bool, Error>(true)
        }
        .await;

        match result {
            Ok(true) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(query_error("Failed to commit password reset"))?;
                Ok(true)
            }
            Ok(false) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Ok(false)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }
}
