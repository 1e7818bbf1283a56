// hearth-server/src/db/users.rs

use crate::errors::Result;
use crate::models::{CustomerProfile, Role, User};
use chrono::{NaiveDate, Utc};
use sqlx::{Sqlite, SqliteConnection};

const USER_COLUMNS: &str =
  "id, username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at";

pub struct NewUser<'a> {
  pub username: &'a str,
  pub email: Option<&'a str>,
  pub password_hash: &'a str,
  pub first_name: &'a str,
  pub last_name: &'a str,
  pub role: Role,
}

pub async fn insert(conn: &mut SqliteConnection, new: &NewUser<'_>) -> Result<User> {
  let now = Utc::now();
  Ok(
    sqlx::query_as::<_, User>(&format!(
      "INSERT INTO users (username, email, password_hash, first_name, last_name, role, is_active, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7) RETURNING {USER_COLUMNS}"
    ))
    .bind(new.username)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.role)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?,
  )
}

/// Creates the customer profile and the customer's single cart.
pub async fn insert_customer_extras(conn: &mut SqliteConnection, user_id: i64, phone_no: &str) -> Result<()> {
  let now = Utc::now();
  sqlx::query("INSERT INTO customer_profiles (user_id, phone_no) VALUES ($1, $2)")
    .bind(user_id)
    .bind(phone_no)
    .execute(&mut *conn)
    .await?;
  sqlx::query("INSERT INTO carts (customer_id, total_price_cents, created_at, updated_at) VALUES ($1, 0, $2, $2)")
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> Result<Option<User>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
      .bind(id)
      .fetch_optional(exec)
      .await?,
  )
}

/// Looks a login identifier up as a username first, then as an email.
pub async fn find_by_identifier<'e, E>(exec: E, identifier: &str) -> Result<Option<User>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, User>(&format!(
      "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = lower($1) \
       ORDER BY CASE WHEN username = $1 THEN 0 ELSE 1 END LIMIT 1"
    ))
    .bind(identifier)
    .fetch_optional(exec)
    .await?,
  )
}

/// Whether `username` belongs to someone other than `except_user`.
pub async fn username_taken<'e, E>(exec: E, username: &str, except_user: Option<i64>) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id != COALESCE($2, -1))")
      .bind(username)
      .bind(except_user)
      .fetch_one(exec)
      .await?,
  )
}

pub async fn email_taken<'e, E>(exec: E, email: &str, except_user: Option<i64>) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = lower($1) AND id != COALESCE($2, -1))")
      .bind(email)
      .bind(except_user)
      .fetch_one(exec)
      .await?,
  )
}

pub async fn admin_exists<'e, E>(exec: E) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
      .fetch_one(exec)
      .await?,
  )
}

pub async fn customer_profile<'e, E>(exec: E, user_id: i64) -> Result<Option<CustomerProfile>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, CustomerProfile>(
      "SELECT user_id, phone_no, gender, date_of_birth, profile_picture_key, profile_picture_type \
       FROM customer_profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(exec)
    .await?,
  )
}

/// Fields a user may change on their own profile; `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct ProfileChanges {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub username: Option<String>,
  pub email: Option<String>,
  pub phone_no: Option<String>,
  pub gender: Option<String>,
  pub date_of_birth: Option<NaiveDate>,
}

pub async fn update_profile(conn: &mut SqliteConnection, user_id: i64, changes: &ProfileChanges) -> Result<()> {
  sqlx::query(
    "UPDATE users SET first_name = COALESCE($2, first_name), last_name = COALESCE($3, last_name), \
     username = COALESCE($4, username), email = COALESCE(lower($5), email), updated_at = $6 WHERE id = $1",
  )
  .bind(user_id)
  .bind(changes.first_name.as_deref())
  .bind(changes.last_name.as_deref())
  .bind(changes.username.as_deref())
  .bind(changes.email.as_deref())
  .bind(Utc::now())
  .execute(&mut *conn)
  .await?;

  sqlx::query(
    "UPDATE customer_profiles SET phone_no = COALESCE($2, phone_no), gender = COALESCE($3, gender), \
     date_of_birth = COALESCE($4, date_of_birth) WHERE user_id = $1",
  )
  .bind(user_id)
  .bind(changes.phone_no.as_deref())
  .bind(changes.gender.as_deref())
  .bind(changes.date_of_birth)
  .execute(&mut *conn)
  .await?;
  Ok(())
}

/// Replaces the picture reference and returns the previous blob key.
pub async fn set_profile_picture(
  conn: &mut SqliteConnection,
  user_id: i64,
  blob_key: &str,
  content_type: &str,
) -> Result<Option<String>> {
  let previous: Option<String> =
    sqlx::query_scalar("SELECT profile_picture_key FROM customer_profiles WHERE user_id = $1")
      .bind(user_id)
      .fetch_optional(&mut *conn)
      .await?
      .flatten();
  sqlx::query("UPDATE customer_profiles SET profile_picture_key = $2, profile_picture_type = $3 WHERE user_id = $1")
    .bind(user_id)
    .bind(blob_key)
    .bind(content_type)
    .execute(&mut *conn)
    .await?;
  Ok(previous)
}

pub async fn update_password<'e, E>(exec: E, user_id: i64, password_hash: &str) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
    .bind(user_id)
    .bind(password_hash)
    .bind(Utc::now())
    .execute(exec)
    .await?;
  Ok(())
}

/// Blob keys owned by a user outside the asset table.
pub async fn owned_blob_keys(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<String>> {
  Ok(
    sqlx::query_scalar::<_, String>(
      "SELECT profile_picture_key FROM customer_profiles WHERE user_id = $1 AND profile_picture_key IS NOT NULL \
       UNION ALL SELECT image_key FROM reviews WHERE customer_id = $1 AND image_key IS NOT NULL",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?,
  )
}

pub async fn delete(conn: &mut SqliteConnection, user_id: i64) -> Result<bool> {
  let done = sqlx::query("DELETE FROM users WHERE id = $1").bind(user_id).execute(&mut *conn).await?;
  Ok(done.rows_affected() > 0)
}
