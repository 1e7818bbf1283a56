// hearth-server/src/db/carts.rs

use crate::errors::{AppError, Result};
use crate::models::{Cart, CartLine, PurchaseKind};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

/// Upper bound on the quantity of one cart line, before and after merging.
pub const MAX_LINE_QUANTITY: i64 = 1_000;

pub async fn for_customer<'e, E>(exec: E, customer_id: i64) -> Result<Cart>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query_as::<_, Cart>(
    "SELECT id, customer_id, total_price_cents, created_at, updated_at FROM carts WHERE customer_id = $1",
  )
  .bind(customer_id)
  .fetch_optional(exec)
  .await?
  .ok_or_else(|| AppError::not_found("Cart"))
}

pub async fn lines<'e, E>(exec: E, cart_id: i64) -> Result<Vec<CartLine>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, CartLine>(
      "SELECT ci.id, ci.product_id, i.name AS product_name, ci.kind, ci.quantity, ci.unit_price_cents, \
       ci.quantity * ci.unit_price_cents AS line_total_cents, ci.added_at \
       FROM cart_items ci JOIN products p ON p.id = ci.product_id JOIN items i ON i.id = p.item_id \
       WHERE ci.cart_id = $1 ORDER BY ci.id",
    )
    .bind(cart_id)
    .fetch_all(exec)
    .await?,
  )
}

/// Quantity already in the cart for `(product, kind)`, zero when absent.
pub async fn line_quantity<'e, E>(exec: E, cart_id: i64, product_id: i64, kind: PurchaseKind) -> Result<i64>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, i64>(
      "SELECT COALESCE(SUM(quantity), 0) FROM cart_items WHERE cart_id = $1 AND product_id = $2 AND kind = $3",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(kind)
    .fetch_one(exec)
    .await?,
  )
}

/// Adds `quantity` to the `(product, kind)` line, creating it when missing.
/// A merge that would exceed [`MAX_LINE_QUANTITY`] leaves the line untouched.
pub async fn upsert_line<'e, E>(
  exec: E,
  cart_id: i64,
  product_id: i64,
  kind: PurchaseKind,
  quantity: i64,
  unit_price_cents: i64,
) -> Result<i64>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query_scalar::<_, i64>(
    "INSERT INTO cart_items (cart_id, product_id, kind, quantity, unit_price_cents, added_at) \
     VALUES ($1, $2, $3, $4, $5, $6) \
     ON CONFLICT (cart_id, product_id, kind) DO UPDATE SET \
     quantity = cart_items.quantity + excluded.quantity, unit_price_cents = excluded.unit_price_cents \
     WHERE cart_items.quantity + excluded.quantity <= $7 \
     RETURNING id",
  )
  .bind(cart_id)
  .bind(product_id)
  .bind(kind)
  .bind(quantity)
  .bind(unit_price_cents)
  .bind(Utc::now())
  .bind(MAX_LINE_QUANTITY)
  .fetch_optional(exec)
  .await?
  .ok_or_else(|| AppError::Validation(format!("A cart line holds at most {MAX_LINE_QUANTITY} copies.")))
}

pub async fn remove_line<'e, E>(exec: E, cart_id: i64, line_id: i64) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
    .bind(line_id)
    .bind(cart_id)
    .execute(exec)
    .await?;
  Ok(done.rows_affected() == 1)
}

pub async fn clear(conn: &mut SqliteConnection, cart_id: i64) -> Result<()> {
  sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
    .bind(cart_id)
    .execute(&mut *conn)
    .await?;
  sqlx::query("UPDATE carts SET total_price_cents = 0, updated_at = $2 WHERE id = $1")
    .bind(cart_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
  Ok(())
}

/// Refreshes every line's unit price from its product and stores the new
/// cart total, which is returned.
pub async fn recompute_total(conn: &mut SqliteConnection, cart_id: i64) -> Result<i64> {
  sqlx::query(
    "UPDATE cart_items SET unit_price_cents = COALESCE((\
       SELECT CASE cart_items.kind WHEN 'digital' THEN p.digital_price_cents ELSE p.physical_price_cents END \
       FROM products p WHERE p.id = cart_items.product_id), unit_price_cents) \
     WHERE cart_id = $1",
  )
  .bind(cart_id)
  .execute(&mut *conn)
  .await?;

  let total: i64 =
    sqlx::query_scalar("SELECT COALESCE(SUM(quantity * unit_price_cents), 0) FROM cart_items WHERE cart_id = $1")
      .bind(cart_id)
      .fetch_one(&mut *conn)
      .await?;

  sqlx::query("UPDATE carts SET total_price_cents = $2, updated_at = $3 WHERE id = $1")
    .bind(cart_id)
    .bind(total)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
  Ok(total)
}
