//! Authentication service.
//!
//! Password accounts with argon2id hashes and opaque bearer tokens stored in
//! `shop.sessions`. The token travels in the `auth_token` cookie.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::instrument;

use drive_core::Email;

use crate::db::{RepositoryError, SessionRepository, UserRepository};
use crate::models::{CurrentUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a login session stays valid.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Verified against when the email is unknown, so a miss costs the same
/// argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password(&generate_token()).ok());

/// A freshly minted login session.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    sessions: SessionRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            sessions: SessionRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password and open a session.
    ///
    /// Unknown emails, malformed emails and wrong passwords all fail the same way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            return Err(reject_unknown_user(password));
        };

        verify_password(password, &password_hash)?;

        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
        self.sessions.create(user.id, &token, expires_at).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginSession {
            user,
            token,
            expires_at,
        })
    }

    /// Delete a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Absent, unknown and expired tokens all yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn current_user(&self, token: &str) -> Result<Option<CurrentUser>, AuthError> {
        let user = self.sessions.find_user(token).await?;
        Ok(user.map(CurrentUser::from))
    }
}

/// Generate an opaque 256-bit session token.
fn generate_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Burn one verification against the dummy hash, then fail.
fn reject_unknown_user(password: &str) -> AuthError {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_unknown_user_pays_for_a_verification() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        let real = hash_password("correct horse").unwrap();
        // Same algorithm, version and cost parameters as a stored hash.
        let params = |h: &str| h.split('$').take(4).collect::<Vec<_>>().join("$");
        assert_eq!(params(dummy), params(&real));

        assert!(matches!(
            reject_unknown_user("correct horse"),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("12345678").is_ok());
        // Counted in characters, not bytes.
        assert!(validate_password("žžžž").is_err());
    }

    #[test]
    fn test_tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
