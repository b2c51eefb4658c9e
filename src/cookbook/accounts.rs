//! Accounts: registration, login checks, password resets and the admin profile.

use super::Cookbook;
use crate::db::{NewUser, User};
use crate::error::{DatabaseError, PasswordResetError, ValidationError};
use crate::form::validation::{validate_email, validate_password};
use crate::form::{FormData, PasswordResetForm, ProfileForm};
use crate::types::{Role, UserId, now_millis};
use crate::{Error, Result};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Freshly issued password reset token, handed to the external mailer
///
/// The plaintext token only exists here; the database keeps its SHA-256 digest.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetToken {
    /// Account the token was issued for
    pub user_id: UserId,
    /// Normalized account email
    pub email: String,
    /// Plaintext token (hex)
    pub token: String,
    /// Unix milliseconds after which the token is rejected
    pub expires_at: i64,
    /// Link to the reset page carrying `token` and `email`
    pub reset_link: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    buf.iter().map(|b| format!("{:02x}", b)).collect()
}

impl Cookbook {
    /// Create an account
    ///
    /// Email and password problems are reported together. The email is stored
    /// trimmed and lowercased; an address that is already registered is a
    /// [`Error::Conflict`].
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User> {
        let email = normalize_email(email);

        let mut errors = ValidationError::default();
        if let Err(e) = validate_email(&email) {
            errors.field_errors.extend(e.field_errors);
        }
        if let Err(e) = validate_password(password, self.config.accounts.min_password_length) {
            errors.field_errors.extend(e.field_errors);
        }
        if !errors.is_empty() {
            return Err(errors
                .with_fields(serde_json::json!({ "email": email }))
                .into());
        }

        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(Error::Conflict(format!(
                "a user already exists with email {}",
                email
            )));
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self
            .db
            .insert_user(&NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: first_name.map(str::trim).filter(|s| !s.is_empty()),
                last_name: last_name.map(str::trim).filter(|s| !s.is_empty()),
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                Error::Database(DatabaseError::ConstraintViolation(_)) => Error::Conflict(format!(
                    "a user already exists with email {}",
                    email
                )),
                other => other,
            })?;

        tracing::info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Check a login attempt
    ///
    /// Returns the account when the password matches, None for an unknown email,
    /// an account without a password, or a wrong password.
    pub async fn verify_login(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(credentials) = self.db.get_credentials(&normalize_email(email)).await? else {
            return Ok(None);
        };
        let Some(hash) = credentials.password_hash.as_deref() else {
            return Ok(None);
        };

        if self.hasher.verify(password, hash)? {
            Ok(Some(credentials.user))
        } else {
            tracing::debug!(user_id = %credentials.user.id, "login rejected");
            Ok(None)
        }
    }

    /// Resolve the signed-in user, failing with [`Error::Unauthorized`] when there is none
    pub async fn require_user(&self, user_id: Option<UserId>) -> Result<User> {
        let user_id = user_id.ok_or_else(|| Error::Unauthorized("sign in required".into()))?;
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::Unauthorized(format!("user {} no longer exists", user_id)))
    }

    /// Resolve the signed-in user and require the admin role
    pub async fn require_admin(&self, user_id: Option<UserId>) -> Result<User> {
        let user = self.require_user(user_id).await?;
        if !user.is_admin() {
            return Err(Error::Forbidden("admin role required".into()));
        }
        Ok(user)
    }

    /// Handle the forgot-password form: issue a reset token for its `email`
    ///
    /// Any earlier token for the account is replaced.
    pub async fn request_password_reset(&self, form: &FormData) -> Result<PasswordResetToken> {
        let email = normalize_email(form.get("email").unwrap_or_default());
        validate_email(&email)?;

        let user = self
            .db
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| PasswordResetError::UnknownEmail {
                email: email.clone(),
            })?;

        let accounts = &self.config.accounts;
        let token = generate_token(accounts.reset_token_bytes);
        let ttl = i64::try_from(accounts.reset_token_ttl.as_millis()).map_err(|_| Error::Config {
            message: "reset token ttl is too large".to_string(),
            key: Some("accounts.reset_token_ttl".to_string()),
        })?;
        let expires_at = now_millis().saturating_add(ttl);
        self.db
            .set_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;

        let reset_link = self.reset_link(&email, &token)?;
        tracing::info!(user_id = %user.id, expires_at, "issued password reset token");

        Ok(PasswordResetToken {
            user_id: user.id,
            email,
            token,
            expires_at,
            reset_link,
        })
    }

    fn reset_link(&self, email: &str, token: &str) -> Result<String> {
        let invalid = |e: url::ParseError| Error::Config {
            message: format!("invalid app base url: {}", e),
            key: Some("accounts.app_base_url".to_string()),
        };

        let mut base = url::Url::parse(&self.config.accounts.app_base_url).map_err(invalid)?;
        // Without a trailing slash, join would replace the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut link = base.join("reset-password").map_err(invalid)?;
        link.query_pairs_mut()
            .append_pair("token", token)
            .append_pair("email", email);
        Ok(link.into())
    }

    /// Check a reset token without consuming it
    pub async fn verify_reset_token(&self, email: &str, token: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = self
            .db
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| PasswordResetError::UnknownEmail {
                email: email.clone(),
            })?;

        let Some(reset) = self.db.get_reset_token(user.id).await? else {
            tracing::warn!(user_id = %user.id, "reset token presented but none issued");
            return Err(PasswordResetError::InvalidToken.into());
        };

        if !constant_time_eq(hash_token(token).as_bytes(), reset.token_hash.as_bytes()) {
            tracing::warn!(user_id = %user.id, "reset token mismatch");
            return Err(PasswordResetError::InvalidToken.into());
        }

        if now_millis() > reset.expires_at {
            tracing::warn!(user_id = %user.id, "reset token expired");
            return Err(PasswordResetError::TokenExpired.into());
        }

        Ok(user)
    }

    /// Handle the reset-password form: verify its token, then store the new password
    ///
    /// The token is consumed in the same transaction that writes the password, so
    /// of several concurrent submissions at most one succeeds.
    pub async fn reset_password(&self, form: &FormData) -> Result<User> {
        let form = PasswordResetForm::from_form(form);
        let (email, token) = form.credentials()?;
        let user = self.verify_reset_token(email, token).await?;

        let password = form.new_password(self.config.accounts.min_password_length)?;
        let password_hash = self.hasher.hash(password)?;
        let consumed = self
            .db
            .consume_reset_token(user.id, &hash_token(token), now_millis(), &password_hash)
            .await?;
        if !consumed {
            tracing::warn!(user_id = %user.id, "reset token already used");
            return Err(PasswordResetError::InvalidToken.into());
        }

        tracing::info!(user_id = %user.id, "password reset");
        Ok(user)
    }

    /// Handle the admin profile form: update the signed-in admin's name
    pub async fn update_profile(&self, user_id: Option<UserId>, form: &FormData) -> Result<User> {
        let admin = self.require_admin(user_id).await?;
        let (first_name, last_name) = ProfileForm::from_form(form).validate()?;

        self.db
            .update_user_name(admin.id, &first_name, last_name.as_deref())
            .await?;

        tracing::info!(user_id = %admin.id, "profile updated");
        self.db
            .get_user(admin.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", admin.id)))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::cookbook::test_support::{add_user, test_cookbook, test_cookbook_with};
    use crate::error::ToHttpStatus;

    #[test]
    fn constant_time_eq_compares_whole_input() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn generated_tokens_are_hex_and_distinct() {
        let a = generate_token(32);
        let b = generate_token(32);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn register_normalizes_email_and_hashes_password() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let user = cookbook
            .register("  Lucas@Example.COM ", "supersecret", Some("Lucas"), Some(" "))
            .await
            .unwrap();

        assert_eq!(user.email, "lucas@example.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.last_name, None);

        let credentials = cookbook
            .db
            .get_credentials("lucas@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credentials.password_hash.as_deref(), Some("plain:supersecret"));
    }

    #[tokio::test]
    async fn register_reports_email_and_password_together() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let err = cookbook
            .register("nope", "short", None, None)
            .await
            .unwrap_err();

        let validation = match err {
            Error::Validation(validation) => validation,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(validation.field_errors["email"], "Email is invalid");
        assert_eq!(
            validation.field_errors["password"],
            "Password must be at least 8 characters."
        );
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (cookbook, _temp_file) = test_cookbook().await;

        cookbook
            .register("dup@example.com", "password123", None, None)
            .await
            .unwrap();
        let err = cookbook
            .register("DUP@example.com", "password456", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn verify_login_checks_password() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let user = cookbook
            .register("login@example.com", "password123", None, None)
            .await
            .unwrap();

        let ok = cookbook
            .verify_login("Login@Example.com", "password123")
            .await
            .unwrap();
        assert_eq!(ok.map(|u| u.id), Some(user.id));

        assert!(
            cookbook
                .verify_login("login@example.com", "wrong-password")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            cookbook
                .verify_login("ghost@example.com", "password123")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn require_user_and_admin() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let member = add_user(&cookbook, "member@example.com", Role::User).await;
        let admin = add_user(&cookbook, "admin@example.com", Role::Admin).await;

        assert_eq!(cookbook.require_user(None).await.unwrap_err().status_code(), 401);
        assert_eq!(
            cookbook
                .require_user(Some(UserId::new()))
                .await
                .unwrap_err()
                .status_code(),
            401
        );
        assert_eq!(cookbook.require_user(Some(member)).await.unwrap().id, member);

        assert_eq!(
            cookbook
                .require_admin(Some(member))
                .await
                .unwrap_err()
                .status_code(),
            403
        );
        assert!(cookbook.require_admin(Some(admin)).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn reset_token_flow() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let user_id = add_user(&cookbook, "forgot@example.com", Role::User).await;

        let issued = cookbook
            .request_password_reset(&FormData::parse("email=Forgot%40example.com"))
            .await
            .unwrap();
        assert_eq!(issued.user_id, user_id);
        assert_eq!(issued.token.len(), 64);
        assert!(issued.reset_link.starts_with("http://localhost:3000/reset-password?token="));
        assert!(issued.reset_link.ends_with("&email=forgot%40example.com"));

        // The stored value is the digest, not the token
        let stored = cookbook.db.get_reset_token(user_id).await.unwrap().unwrap();
        assert_ne!(stored.token_hash, issued.token);
        assert_eq!(stored.token_hash, hash_token(&issued.token));

        assert_eq!(
            cookbook
                .verify_reset_token("forgot@example.com", &issued.token)
                .await
                .unwrap()
                .id,
            user_id
        );

        let err = cookbook
            .verify_reset_token("forgot@example.com", "not-the-token")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PasswordReset(PasswordResetError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn reset_request_for_unknown_email_is_404() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let err = cookbook
            .request_password_reset(&FormData::parse("email=ghost%40example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = cookbook
            .request_password_reset(&FormData::parse("email=bad"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let user_id = add_user(&cookbook, "late@example.com", Role::User).await;
        cookbook
            .db
            .set_reset_token(user_id, &hash_token("stale"), now_millis() - 1)
            .await
            .unwrap();

        let err = cookbook
            .verify_reset_token("late@example.com", "stale")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PasswordReset(PasswordResetError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn reset_password_stores_hash_and_consumes_token() {
        let (cookbook, _temp_file) = test_cookbook().await;

        add_user(&cookbook, "reset@example.com", Role::User).await;
        let issued = cookbook
            .request_password_reset(&FormData::parse("email=reset%40example.com"))
            .await
            .unwrap();

        let body = format!(
            "email=reset%40example.com&token={}&password=brand-new-pass",
            issued.token
        );

        // Too-short password leaves the token usable
        let short = format!("email=reset%40example.com&token={}&password=tiny", issued.token);
        assert_eq!(
            cookbook
                .reset_password(&FormData::parse(&short))
                .await
                .unwrap_err()
                .status_code(),
            400
        );

        cookbook.reset_password(&FormData::parse(&body)).await.unwrap();

        assert!(
            cookbook
                .verify_login("reset@example.com", "brand-new-pass")
                .await
                .unwrap()
                .is_some()
        );

        // Second use fails
        let err = cookbook
            .reset_password(&FormData::parse(&body))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PasswordReset(PasswordResetError::InvalidToken)
        ));
    }

    async fn issue_token(cookbook: &Cookbook, email: &str) -> PasswordResetToken {
        cookbook
            .request_password_reset(&FormData::from_pairs([(
                "email".to_string(),
                email.to_string(),
            )]))
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resets_spend_token_once() {
        let (cookbook, _temp_file) = test_cookbook().await;
        add_user(&cookbook, "race@example.com", Role::User).await;

        for round in 0..10 {
            let issued = issue_token(&cookbook, "race@example.com").await;
            let first = FormData::from_pairs([
                ("email".to_string(), issued.email.clone()),
                ("token".to_string(), issued.token.clone()),
                ("password".to_string(), format!("first-password-{round}")),
            ]);
            let second = FormData::from_pairs([
                ("email".to_string(), issued.email.clone()),
                ("token".to_string(), issued.token.clone()),
                ("password".to_string(), format!("second-password-{round}")),
            ]);

            let (a, b) = tokio::join!(
                cookbook.reset_password(&first),
                cookbook.reset_password(&second)
            );
            let succeeded = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
            assert_eq!(succeeded, 1, "round {round}: token spent {succeeded} times");

            let rejected = if a.is_ok() { b } else { a };
            assert!(matches!(
                rejected.unwrap_err(),
                Error::PasswordReset(PasswordResetError::InvalidToken)
            ));
            assert!(cookbook.db.get_reset_token(issued.user_id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn stale_token_is_not_consumed() {
        let (cookbook, _temp_file) = test_cookbook().await;
        let user_id = add_user(&cookbook, "stale@example.com", Role::User).await;
        cookbook
            .db
            .set_reset_token(user_id, &hash_token("old"), now_millis() - 1)
            .await
            .unwrap();

        let consumed = cookbook
            .db
            .consume_reset_token(user_id, &hash_token("old"), now_millis(), "plain:changed")
            .await
            .unwrap();
        assert!(!consumed);

        // Nothing was written: the old password still works and the row remains
        assert!(
            cookbook
                .verify_login("stale@example.com", "password123")
                .await
                .unwrap()
                .is_some()
        );
        assert!(cookbook.db.get_reset_token(user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_link_keeps_base_path() {
        let mut config = Config::default();
        config.accounts.app_base_url = "https://family.example/cookbook".to_string();
        let (cookbook, _temp_file) = test_cookbook_with(config).await;
        add_user(&cookbook, "path@example.com", Role::User).await;

        let issued = issue_token(&cookbook, "path@example.com").await;
        assert!(
            issued
                .reset_link
                .starts_with("https://family.example/cookbook/reset-password?token="),
            "{}",
            issued.reset_link
        );
    }

    #[tokio::test]
    async fn oversized_ttl_is_a_config_error() {
        let mut config = Config::default();
        config.accounts.reset_token_ttl = std::time::Duration::MAX;
        let (cookbook, _temp_file) = test_cookbook_with(config).await;
        add_user(&cookbook, "ttl@example.com", Role::User).await;

        let err = cookbook
            .request_password_reset(&FormData::parse("email=ttl%40example.com"))
            .await
            .unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("accounts.reset_token_ttl"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_profile_is_admin_only() {
        let (cookbook, _temp_file) = test_cookbook().await;

        let member = add_user(&cookbook, "m@example.com", Role::User).await;
        let admin = add_user(&cookbook, "a@example.com", Role::Admin).await;

        let form = FormData::parse("firstName=Grandma&lastName=");
        assert_eq!(
            cookbook
                .update_profile(Some(member), &form)
                .await
                .unwrap_err()
                .status_code(),
            403
        );

        let updated = cookbook.update_profile(Some(admin), &form).await.unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Grandma"));
        assert_eq!(updated.last_name, None);

        let err = cookbook
            .update_profile(Some(admin), &FormData::parse("firstName=+"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
