// hearth-server/src/services/auth_service.rs

//! Password hashing, session tokens and the one-time cross-domain login token.

use crate::db;
use crate::errors::{AppError, Result};
use crate::models::Session;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 hashing failed.");
      AppError::Internal(format!("Password hashing failed: {e}"))
    })
}

/// `Ok(false)` on a mismatch; an unparsable stored hash is an internal error.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool> {
  if candidate.is_empty() {
    return Ok(false);
  }
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash is malformed.");
    AppError::Internal(format!("Invalid stored password hash: {e}"))
  })?;

  match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(e) => Err(AppError::Internal(format!("Password verification failed: {e}"))),
  }
}

pub fn new_token() -> String {
  Uuid::new_v4().to_string()
}

/// Creates a session for `user_id` that lives `ttl_hours`.
#[instrument(name = "auth_service::open_session", skip(pool), err(Display))]
pub async fn open_session(pool: &SqlitePool, user_id: i64, ttl_hours: i64) -> Result<Session> {
  let expires_at = Utc::now() + Duration::hours(ttl_hours);
  let session = db::sessions::insert(pool, &new_token(), user_id, expires_at).await?;
  info!(user_id, "Session opened.");
  Ok(session)
}

/// Issues a single-use login token valid for `ttl_secs`.
#[instrument(name = "auth_service::issue_login_token", skip(pool), err(Display))]
pub async fn issue_login_token(pool: &SqlitePool, user_id: i64, ttl_secs: i64) -> Result<String> {
  let token = new_token();
  db::sessions::insert_login_token(pool, &token, user_id, Utc::now() + Duration::seconds(ttl_secs)).await?;
  Ok(token)
}

/// Consumes a login token and returns its user. Unknown or already used
/// tokens are forbidden, expired ones unauthorized.
#[instrument(name = "auth_service::redeem_login_token", skip_all, err(Display))]
pub async fn redeem_login_token(pool: &SqlitePool, token: &str) -> Result<i64> {
  let (user_id, expires_at) = db::sessions::take_login_token(pool, token)
    .await?
    .ok_or_else(|| AppError::Forbidden("Login token is invalid or already used.".into()))?;
  if expires_at <= Utc::now() {
    return Err(AppError::Auth("Login token has expired.".into()));
  }
  Ok(user_id)
}
