// hearth-server/src/db/orders.rs

use crate::errors::Result;
use crate::models::{Order, OrderItem, OrderStatus};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

const ORDER_COLUMNS: &str = "id, customer_id, total_price_cents, status, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, item_id, product_name, kind, quantity, unit_price_cents";

/// Creates a pending order and copies the cart's lines into it, freezing
/// product names and unit prices.
pub async fn create_from_cart(
  conn: &mut SqliteConnection,
  customer_id: i64,
  cart_id: i64,
  total_price_cents: i64,
) -> Result<Order> {
  let now = Utc::now();
  let order = sqlx::query_as::<_, Order>(&format!(
    "INSERT INTO orders (customer_id, total_price_cents, status, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $4) RETURNING {ORDER_COLUMNS}"
  ))
  .bind(customer_id)
  .bind(total_price_cents)
  .bind(OrderStatus::Pending)
  .bind(now)
  .fetch_one(&mut *conn)
  .await?;

  sqlx::query(
    "INSERT INTO order_items (order_id, product_id, item_id, product_name, kind, quantity, unit_price_cents) \
     SELECT $1, ci.product_id, p.item_id, i.name, ci.kind, ci.quantity, ci.unit_price_cents \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id JOIN items i ON i.id = p.item_id \
     WHERE ci.cart_id = $2 ORDER BY ci.id",
  )
  .bind(order.id)
  .bind(cart_id)
  .execute(&mut *conn)
  .await?;
  Ok(order)
}

pub async fn list_for_customer<'e, E>(exec: E, customer_id: i64) -> Result<Vec<Order>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Order>(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(customer_id)
    .fetch_all(exec)
    .await?,
  )
}

pub async fn find_for_customer<'e, E>(exec: E, customer_id: i64, order_id: i64) -> Result<Option<Order>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Order>(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND customer_id = $2"
    ))
    .bind(order_id)
    .bind(customer_id)
    .fetch_optional(exec)
    .await?,
  )
}

pub async fn items<'e, E>(exec: E, order_id: i64) -> Result<Vec<OrderItem>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, OrderItem>(&format!(
      "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(exec)
    .await?,
  )
}

/// Moves the order from `from` to `to`. Returns `false` when the order was
/// no longer in `from`, so concurrent transitions cannot both win.
pub async fn transition<'e, E>(exec: E, order_id: i64, from: OrderStatus, to: OrderStatus) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2")
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(Utc::now())
    .execute(exec)
    .await?;
  Ok(done.rows_affected() == 1)
}
