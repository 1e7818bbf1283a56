// hearth-server/src/db/wishlist.rs

use crate::errors::Result;
use crate::models::ProductListing;
use chrono::Utc;
use sqlx::Sqlite;

/// Adds the entry; returns `false` when it was already there.
pub async fn add<'e, E>(exec: E, customer_id: i64, product_id: i64) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query(
    "INSERT INTO wishlist_entries (customer_id, product_id, added_at) VALUES ($1, $2, $3) \
     ON CONFLICT (customer_id, product_id) DO NOTHING",
  )
  .bind(customer_id)
  .bind(product_id)
  .bind(Utc::now())
  .execute(exec)
  .await?;
  Ok(done.rows_affected() > 0)
}

/// Returns `false` when there was nothing to remove.
pub async fn remove<'e, E>(exec: E, customer_id: i64, product_id: i64) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("DELETE FROM wishlist_entries WHERE customer_id = $1 AND product_id = $2")
    .bind(customer_id)
    .bind(product_id)
    .execute(exec)
    .await?;
  Ok(done.rows_affected() > 0)
}

pub async fn list<'e, E>(exec: E, customer_id: i64) -> Result<Vec<ProductListing>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, ProductListing>(&format!(
      "SELECT {} FROM wishlist_entries w JOIN products p ON p.id = w.product_id JOIN items i ON i.id = p.item_id \
       WHERE w.customer_id = $1 ORDER BY w.added_at DESC",
      super::products::LISTING_COLUMNS
    ))
    .bind(customer_id)
    .fetch_all(exec)
    .await?,
  )
}
