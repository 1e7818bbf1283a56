// hearth-server/src/db/sessions.rs

use crate::errors::Result;
use crate::models::{Session, User};
use chrono::{DateTime, Utc};
use sqlx::Sqlite;

pub async fn insert<'e, E>(exec: E, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<Session>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Session>(
      "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4) \
       RETURNING token, user_id, created_at, expires_at",
    )
    .bind(token)
    .bind(user_id)
    .bind(Utc::now())
    .bind(expires_at)
    .fetch_one(exec)
    .await?,
  )
}

/// The active user behind a live session token.
pub async fn find_user<'e, E>(exec: E, token: &str) -> Result<Option<User>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, User>(
      "SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, u.role, u.is_active, \
       u.created_at, u.updated_at \
       FROM sessions s JOIN users u ON u.id = s.user_id \
       WHERE s.token = $1 AND s.expires_at > $2 AND u.is_active = 1",
    )
    .bind(token)
    .bind(Utc::now())
    .fetch_optional(exec)
    .await?,
  )
}

pub async fn delete<'e, E>(exec: E, token: &str) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query("DELETE FROM sessions WHERE token = $1").bind(token).execute(exec).await?;
  Ok(())
}

pub async fn delete_for_user<'e, E>(exec: E, user_id: i64) -> Result<u64>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("DELETE FROM sessions WHERE user_id = $1").bind(user_id).execute(exec).await?;
  Ok(done.rows_affected())
}

pub async fn prune_expired<'e, E>(exec: E) -> Result<u64>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let now = Utc::now();
  let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1").bind(now).execute(exec).await?;
  Ok(done.rows_affected())
}

pub async fn insert_login_token<'e, E>(exec: E, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query("INSERT INTO login_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .execute(exec)
    .await?;
  Ok(())
}

/// Deletes the login token and returns its owner and expiry, if it existed.
pub async fn take_login_token<'e, E>(exec: E, token: &str) -> Result<Option<(i64, DateTime<Utc>)>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, (i64, DateTime<Utc>)>("DELETE FROM login_tokens WHERE token = $1 RETURNING user_id, expires_at")
      .bind(token)
      .fetch_optional(exec)
      .await?,
  )
}
