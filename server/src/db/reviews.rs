// hearth-server/src/db/reviews.rs

use crate::errors::Result;
use crate::models::Review;
use crate::services::rating;
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

const REVIEW_SELECT: &str = "SELECT r.id, r.product_id, r.customer_id, u.username, r.rating, r.comment, \
  r.image_key IS NOT NULL AS has_image, r.created_at, r.updated_at FROM reviews r JOIN users u ON u.id = r.customer_id";

pub async fn insert<'e, E>(exec: E, product_id: i64, customer_id: i64, rating: i64, comment: &str) -> Result<i64>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, i64>(
      "INSERT INTO reviews (product_id, customer_id, rating, comment, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $5) RETURNING id",
    )
    .bind(product_id)
    .bind(customer_id)
    .bind(rating)
    .bind(comment)
    .bind(Utc::now())
    .fetch_one(exec)
    .await?,
  )
}

pub async fn exists_for<'e, E>(exec: E, product_id: i64, customer_id: i64) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM reviews WHERE product_id = $1 AND customer_id = $2)")
      .bind(product_id)
      .bind(customer_id)
      .fetch_one(exec)
      .await?,
  )
}

pub async fn find<'e, E>(exec: E, review_id: i64) -> Result<Option<Review>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
      .bind(review_id)
      .fetch_optional(exec)
      .await?,
  )
}

pub async fn list_for_product<'e, E>(exec: E, product_id: i64) -> Result<Vec<Review>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.id DESC"))
      .bind(product_id)
      .fetch_all(exec)
      .await?,
  )
}

pub async fn list_for_customer<'e, E>(exec: E, customer_id: i64) -> Result<Vec<Review>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE r.customer_id = $1 ORDER BY r.id DESC"))
      .bind(customer_id)
      .fetch_all(exec)
      .await?,
  )
}

pub async fn update<'e, E>(exec: E, review_id: i64, rating: Option<i64>, comment: Option<&str>) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query(
    "UPDATE reviews SET rating = COALESCE($2, rating), comment = COALESCE($3, comment), updated_at = $4 WHERE id = $1",
  )
  .bind(review_id)
  .bind(rating)
  .bind(comment)
  .bind(Utc::now())
  .execute(exec)
  .await?;
  Ok(())
}

/// Deletes the review and returns its image blob key, if it had one.
pub async fn delete<'e, E>(exec: E, review_id: i64) -> Result<Option<String>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar::<_, Option<String>>("DELETE FROM reviews WHERE id = $1 RETURNING image_key")
      .bind(review_id)
      .fetch_optional(exec)
      .await?
      .flatten(),
  )
}

/// Blob key and content type of the review's image.
pub async fn image<'e, E>(exec: E, review_id: i64) -> Result<Option<(String, String)>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let row: Option<(Option<String>, Option<String>)> =
    sqlx::query_as("SELECT image_key, image_type FROM reviews WHERE id = $1")
      .bind(review_id)
      .fetch_optional(exec)
      .await?;
  Ok(row.and_then(|(key, ctype)| Some((key?, ctype.unwrap_or_else(|| "application/octet-stream".into())))))
}

/// Sets (or with `None`, clears) the image and returns the replaced blob key.
pub async fn replace_image(
  conn: &mut SqliteConnection,
  review_id: i64,
  image: Option<(&str, &str)>,
) -> Result<Option<String>> {
  let previous: Option<String> = sqlx::query_scalar("SELECT image_key FROM reviews WHERE id = $1")
    .bind(review_id)
    .fetch_optional(&mut *conn)
    .await?
    .flatten();
  let (key, ctype) = image.unzip();
  sqlx::query("UPDATE reviews SET image_key = $2, image_type = $3, updated_at = $4 WHERE id = $1")
    .bind(review_id)
    .bind(key)
    .bind(ctype)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
  Ok(previous)
}

/// Recomputes and stores the product's rating from its reviews.
pub async fn refresh_product_rating(conn: &mut SqliteConnection, product_id: i64) -> Result<f64> {
  let mean: Option<f64> = sqlx::query_scalar("SELECT AVG(CAST(rating AS REAL)) FROM reviews WHERE product_id = $1")
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;
  let value = rating::aggregate(mean);
  super::products::set_rating(&mut *conn, product_id, value).await?;
  Ok(value)
}

pub async fn reviewed_product_ids<'e, E>(exec: E, customer_id: i64) -> Result<Vec<i64>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar("SELECT product_id FROM reviews WHERE customer_id = $1")
      .bind(customer_id)
      .fetch_all(exec)
      .await?,
  )
}
