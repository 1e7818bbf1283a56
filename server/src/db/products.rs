// hearth-server/src/db/products.rs

use crate::errors::{AppError, Result};
use crate::models::ProductListing;
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection};

pub(crate) const LISTING_COLUMNS: &str = "p.id AS product_id, i.id AS item_id, i.name, i.description, i.category, \
  i.item_type, i.model_id, i.is_container, p.digital_price_cents, p.physical_price_cents, p.digital_available, \
  p.physical_available, p.image_id, p.stock, p.rating";

pub async fn listing<'e, E>(exec: E, product_id: i64) -> Result<Option<ProductListing>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, ProductListing>(&format!(
      "SELECT {LISTING_COLUMNS} FROM products p JOIN items i ON i.id = p.item_id WHERE p.id = $1"
    ))
    .bind(product_id)
    .fetch_optional(exec)
    .await?,
  )
}

pub async fn require_listing<'e, E>(exec: E, product_id: i64) -> Result<ProductListing>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  listing(exec, product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {product_id} not found.")))
}

/// Catalog listing filtered by exact category and a case-insensitive name fragment.
pub async fn list<'e, E>(exec: E, category: Option<&str>, query: Option<&str>) -> Result<Vec<ProductListing>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_as::<_, ProductListing>(&format!(
      "SELECT {LISTING_COLUMNS} FROM products p JOIN items i ON i.id = p.item_id \
       WHERE ($1 IS NULL OR i.category = $1) AND ($2 IS NULL OR instr(lower(i.name), lower($2)) > 0) \
       ORDER BY p.id"
    ))
    .bind(category)
    .bind(query)
    .fetch_all(exec)
    .await?,
  )
}

pub async fn scene_ids<'e, E>(exec: E, product_id: i64) -> Result<Vec<i64>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar("SELECT scene_id FROM product_display_scenes WHERE product_id = $1 ORDER BY position")
      .bind(product_id)
      .fetch_all(exec)
      .await?,
  )
}

pub async fn review_ids<'e, E>(exec: E, product_id: i64) -> Result<Vec<i64>>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  Ok(
    sqlx::query_scalar("SELECT id FROM reviews WHERE product_id = $1 ORDER BY id")
      .bind(product_id)
      .fetch_all(exec)
      .await?,
  )
}

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub category: String,
  pub item_type: String,
  pub model_id: i64,
  pub is_container: bool,
  pub digital_price_cents: Option<i64>,
  pub physical_price_cents: Option<i64>,
  pub digital_available: bool,
  pub physical_available: bool,
  pub image_id: Option<i64>,
  pub stock: i64,
  pub display_scene_ids: Vec<i64>,
}

async fn replace_scenes(conn: &mut SqliteConnection, product_id: i64, scene_ids: &[i64]) -> Result<()> {
  sqlx::query("DELETE FROM product_display_scenes WHERE product_id = $1")
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
  for (position, scene_id) in scene_ids.iter().enumerate() {
    sqlx::query("INSERT OR IGNORE INTO product_display_scenes (product_id, scene_id, position) VALUES ($1, $2, $3)")
      .bind(product_id)
      .bind(scene_id)
      .bind(position as i64)
      .execute(&mut *conn)
      .await?;
  }
  Ok(())
}

/// Inserts the item, its product listing and scene links. Returns the product id.
pub async fn insert(conn: &mut SqliteConnection, new: &NewProduct) -> Result<i64> {
  let now = Utc::now();
  let item_id: i64 = sqlx::query_scalar(
    "INSERT INTO items (name, description, category, item_type, model_id, is_container, created_at, updated_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING id",
  )
  .bind(&new.name)
  .bind(&new.description)
  .bind(&new.category)
  .bind(&new.item_type)
  .bind(new.model_id)
  .bind(new.is_container)
  .bind(now)
  .fetch_one(&mut *conn)
  .await?;

  let product_id: i64 = sqlx::query_scalar(
    "INSERT INTO products (item_id, digital_price_cents, physical_price_cents, digital_available, physical_available, \
     image_id, stock, rating, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $8) RETURNING id",
  )
  .bind(item_id)
  .bind(new.digital_price_cents)
  .bind(new.physical_price_cents)
  .bind(new.digital_available)
  .bind(new.physical_available)
  .bind(new.image_id)
  .bind(new.stock)
  .bind(now)
  .fetch_one(&mut *conn)
  .await?;

  replace_scenes(conn, product_id, &new.display_scene_ids).await?;
  Ok(product_id)
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
  pub name: Option<String>,
  pub description: Option<String>,
  pub category: Option<String>,
  pub item_type: Option<String>,
  pub is_container: Option<bool>,
  pub digital_price_cents: Option<i64>,
  pub physical_price_cents: Option<i64>,
  pub digital_available: Option<bool>,
  pub physical_available: Option<bool>,
  pub image_id: Option<i64>,
  pub stock: Option<i64>,
  pub model_id: Option<i64>,
  pub display_scene_ids: Option<Vec<i64>>,
}

/// Applies `changes` and returns the ids of assets no longer referenced
/// (a replaced model, image or display scenes).
pub async fn update(conn: &mut SqliteConnection, product_id: i64, changes: &ProductChanges) -> Result<Vec<i64>> {
  let current = require_listing(&mut *conn, product_id).await?;
  let now = Utc::now();
  let mut orphaned = Vec::new();

  if let (Some(new_model), Some(old_model)) = (changes.model_id, current.model_id) {
    if new_model != old_model {
      orphaned.push(old_model);
    }
  }
  if let (Some(new_image), Some(old_image)) = (changes.image_id, current.image_id) {
    if new_image != old_image {
      orphaned.push(old_image);
    }
  }

  sqlx::query(
    "UPDATE items SET name = COALESCE($2, name), description = COALESCE($3, description), \
     category = COALESCE($4, category), item_type = COALESCE($5, item_type), is_container = COALESCE($6, is_container), \
     model_id = COALESCE($7, model_id), updated_at = $8 WHERE id = $1",
  )
  .bind(current.item_id)
  .bind(changes.name.as_deref())
  .bind(changes.description.as_deref())
  .bind(changes.category.as_deref())
  .bind(changes.item_type.as_deref())
  .bind(changes.is_container)
  .bind(changes.model_id)
  .bind(now)
  .execute(&mut *conn)
  .await?;

  sqlx::query(
    "UPDATE products SET digital_price_cents = COALESCE($2, digital_price_cents), \
     physical_price_cents = COALESCE($3, physical_price_cents), digital_available = COALESCE($4, digital_available), \
     physical_available = COALESCE($5, physical_available), image_id = COALESCE($6, image_id), \
     stock = COALESCE($7, stock), updated_at = $8 WHERE id = $1",
  )
  .bind(product_id)
  .bind(changes.digital_price_cents)
  .bind(changes.physical_price_cents)
  .bind(changes.digital_available)
  .bind(changes.physical_available)
  .bind(changes.image_id)
  .bind(changes.stock)
  .bind(now)
  .execute(&mut *conn)
  .await?;

  if let Some(new_scenes) = &changes.display_scene_ids {
    let old_scenes = scene_ids(&mut *conn, product_id).await?;
    orphaned.extend(old_scenes.into_iter().filter(|id| !new_scenes.contains(id)));
    replace_scenes(conn, product_id, new_scenes).await?;
  }
  Ok(orphaned)
}

/// What a product deletion leaves for the asset layer to clean up.
#[derive(Debug, Default)]
pub struct DeletedProduct {
  pub asset_ids: Vec<i64>,
  pub blob_keys: Vec<String>,
}

/// Deletes the item behind `product_id`; the listing, scene links, cart
/// lines, wishlist entries, reviews and owned copies go with it.
pub async fn delete(conn: &mut SqliteConnection, product_id: i64) -> Result<DeletedProduct> {
  let current = require_listing(&mut *conn, product_id).await?;
  let mut deleted = DeletedProduct::default();
  deleted.asset_ids.extend(current.model_id);
  deleted.asset_ids.extend(current.image_id);
  deleted.asset_ids.extend(scene_ids(&mut *conn, product_id).await?);
  deleted.blob_keys = sqlx::query_scalar("SELECT image_key FROM reviews WHERE product_id = $1 AND image_key IS NOT NULL")
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

  sqlx::query("DELETE FROM items WHERE id = $1")
    .bind(current.item_id)
    .execute(&mut *conn)
    .await?;
  Ok(deleted)
}

pub async fn set_rating<'e, E>(exec: E, product_id: i64, rating: f64) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query("UPDATE products SET rating = $2 WHERE id = $1")
    .bind(product_id)
    .bind(rating)
    .execute(exec)
    .await?;
  Ok(())
}

/// Takes `quantity` units out of stock; `false` when not enough are left.
pub async fn take_stock<'e, E>(exec: E, product_id: i64, quantity: i64) -> Result<bool>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  let done = sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
    .bind(product_id)
    .bind(quantity)
    .execute(exec)
    .await?;
  Ok(done.rows_affected() == 1)
}

pub async fn return_stock<'e, E>(exec: E, product_id: i64, quantity: i64) -> Result<()>
where
  E: sqlx::Executor<'e, Database = Sqlite>,
{
  sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
    .bind(product_id)
    .bind(quantity)
    .execute(exec)
    .await?;
  Ok(())
}
