// hearth-server/src/db/addresses.rs

use crate::errors::{AppError, Result};
use crate::models::Address;
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

const ADDRESS_COLUMNS: &str = "id, customer_id, address, is_default, created_at";

pub async fn list<'e, E>(exec: E, customer_id: i64) -> Result<Vec<Address>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Address>(&format!(
      "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE customer_id = $1 ORDER BY is_default DESC, id"
    ))
    .bind(customer_id)
    .fetch_all(exec)
    .await?,
  )
}

async fn clear_default(conn: &mut SqliteConnection, customer_id: i64) -> Result<()> {
  sqlx::query("UPDATE addresses SET is_default = 0 WHERE customer_id = $1")
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

pub async fn insert(conn: &mut SqliteConnection, customer_id: i64, address: &str, is_default: bool) -> Result<Address> {
  if is_default {
    clear_default(conn, customer_id).await?;
  }
  Ok(
    sqlx::query_as::<_, Address>(&format!(
      "INSERT INTO addresses (customer_id, address, is_default, created_at) VALUES ($1, $2, $3, $4) RETURNING {ADDRESS_COLUMNS}"
    ))
    .bind(customer_id)
    .bind(address)
    .bind(is_default)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?,
  )
}

pub async fn update_text<'e, E>(exec: E, customer_id: i64, address_id: i64, address: &str) -> Result<Address>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query_as::<_, Address>(&format!(
    "UPDATE addresses SET address = $3 WHERE id = $2 AND customer_id = $1 RETURNING {ADDRESS_COLUMNS}"
  ))
  .bind(customer_id)
  .bind(address_id)
  .bind(address)
  .fetch_optional(exec)
  .await?
  .ok_or_else(|| AppError::not_found("Address"))
}

/// Makes `address_id` the only default address of the customer.
pub async fn set_default(conn: &mut SqliteConnection, customer_id: i64, address_id: i64) -> Result<()> {
  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM addresses WHERE id = $1 AND customer_id = $2)")
    .bind(address_id)
    .bind(customer_id)
    .fetch_one(&mut *conn)
    .await?;
  if !exists {
    return Err(AppError::not_found("Address"));
  }
  clear_default(conn, customer_id).await?;
  sqlx::query("UPDATE addresses SET is_default = 1 WHERE id = $1")
    .bind(address_id)
    .execute(&mut *conn)
    .await?;
  Ok(())
}

pub async fn delete<'e, E>(exec: E, customer_id: i64, address_id: i64) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("DELETE FROM addresses WHERE id = $1 AND customer_id = $2")
    .bind(address_id)
    .bind(customer_id)
    .execute(exec)
    .await?;
  if done.rows_affected() == 0 {
    return Err(AppError::not_found("Address"));
  }
  Ok(())
}
