// hearth-server/src/assets/catalog.rs

//! Asset rows plus their blobs.
//!
//! Writes go blob first, row second; when the row insert fails the blob is
//! removed again. Deletes go rows first (in one transaction), blobs second.
//! A blob that fails to delete is only logged: an orphaned blob is harmless,
//! a row pointing at a missing blob is not.

use super::blob_store::BlobStore;
use crate::errors::{AppError, Result};
use crate::models::{Asset, AssetKind};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const ASSET_COLUMNS: &str = "id, kind, filename, content_type, blob_key, size_bytes, parent_id, created_at";

#[derive(Debug, Clone)]
pub struct NewAsset {
  pub kind: AssetKind,
  pub filename: String,
  pub content_type: Option<String>,
  pub parent_id: Option<i64>,
}

impl NewAsset {
  pub fn new(kind: AssetKind, filename: impl Into<String>) -> Self {
    Self {
      kind,
      filename: filename.into(),
      content_type: None,
      parent_id: None,
    }
  }

  pub fn with_parent(mut self, parent_id: i64) -> Self {
    self.parent_id = Some(parent_id);
    self
  }

  pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
    self.content_type = content_type.filter(|c| !c.trim().is_empty());
    self
  }
}

/// An asset together with its bytes, ready to be served.
#[derive(Debug, Clone)]
pub struct AssetFile {
  pub asset: Asset,
  pub bytes: Vec<u8>,
}

fn clean_filename(raw: &str, kind: AssetKind) -> String {
  // Keep the last path segment only; uploads arrive from browsers and scripts alike.
  let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
  if name.is_empty() {
    format!("{kind}.bin")
  } else {
    name.to_string()
  }
}

/// Stores `bytes` as a new asset using `conn`, which may be a transaction.
/// Returns the row and the blob key so a caller that later rolls back can
/// remove the blob.
#[instrument(name = "assets::insert", skip(conn, blobs, bytes), fields(kind = %new.kind, len = bytes.len()), err(Display))]
pub async fn insert(conn: &mut SqliteConnection, blobs: &dyn BlobStore, new: NewAsset, bytes: &[u8]) -> Result<Asset> {
  if bytes.is_empty() {
    return Err(AppError::Validation(format!("Uploaded {} file is empty.", new.kind)));
  }
  let blob_key = format!("{}/{}", new.kind, Uuid::new_v4());
  blobs.put(&blob_key, bytes).await?;

  let content_type = new
    .content_type
    .unwrap_or_else(|| new.kind.default_content_type().to_string());
  let inserted = sqlx::query_as::<_, Asset>(&format!(
    "INSERT INTO assets (kind, filename, content_type, blob_key, size_bytes, parent_id, created_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ASSET_COLUMNS}"
  ))
  .bind(new.kind)
  .bind(clean_filename(&new.filename, new.kind))
  .bind(content_type)
  .bind(&blob_key)
  .bind(bytes.len() as i64)
  .bind(new.parent_id)
  .bind(Utc::now())
  .fetch_one(&mut *conn)
  .await;

  match inserted {
    Ok(asset) => {
      debug!(asset_id = asset.id, "Asset stored.");
      Ok(asset)
    }
    Err(e) => {
      remove_blobs(blobs, &[blob_key]).await;
      Err(e.into())
    }
  }
}

/// Standalone variant of [`insert`] on its own pooled connection.
pub async fn store(pool: &SqlitePool, blobs: &dyn BlobStore, new: NewAsset, bytes: &[u8]) -> Result<Asset> {
  let mut conn = pool.acquire().await?;
  insert(&mut conn, blobs, new, bytes).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Asset>> {
  Ok(
    sqlx::query_as::<_, Asset>(&format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1"))
      .bind(id)
      .fetch_optional(conn)
      .await?,
  )
}

/// The asset `id`, which must be of `kind`. Any mismatch reads as not found.
pub async fn get_of_kind(conn: &mut SqliteConnection, id: i64, kind: AssetKind) -> Result<Asset> {
  match find(conn, id).await? {
    Some(asset) if asset.kind == kind => Ok(asset),
    _ => Err(AppError::NotFound(format!("{kind} {id} not found."))),
  }
}

pub async fn children(conn: &mut SqliteConnection, parent_id: i64, kind: AssetKind) -> Result<Vec<Asset>> {
  Ok(
    sqlx::query_as::<_, Asset>(&format!(
      "SELECT {ASSET_COLUMNS} FROM assets WHERE parent_id = $1 AND kind = $2 ORDER BY id"
    ))
    .bind(parent_id)
    .bind(kind)
    .fetch_all(conn)
    .await?,
  )
}

#[instrument(name = "assets::fetch", skip(pool, blobs), err(Display))]
pub async fn fetch(pool: &SqlitePool, blobs: &dyn BlobStore, id: i64, kind: AssetKind) -> Result<AssetFile> {
  let asset = {
    let mut conn = pool.acquire().await?;
    get_of_kind(&mut conn, id, kind).await?
  };
  let bytes = blobs.get(&asset.blob_key).await?.ok_or_else(|| {
    warn!(asset_id = id, blob_key = %asset.blob_key, "Asset row has no blob.");
    AppError::NotFound(format!("{kind} {id} has no stored file."))
  })?;
  Ok(AssetFile { asset, bytes })
}

/// Deletes the given assets and their children inside `conn`. Returns the
/// blob keys to hand to [`remove_blobs`] once the surrounding transaction
/// has committed.
pub async fn delete_rows(conn: &mut SqliteConnection, ids: &[i64]) -> Result<Vec<String>> {
  let mut keys = Vec::new();
  for id in ids {
    let mut rows: Vec<String> =
      sqlx::query_scalar("SELECT blob_key FROM assets WHERE id = $1 OR parent_id = $1")
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    keys.append(&mut rows);
    sqlx::query("DELETE FROM assets WHERE id = $1").bind(id).execute(&mut *conn).await?;
  }
  Ok(keys)
}

/// Deletes assets (with children) in one transaction, then their blobs.
#[instrument(name = "assets::delete", skip(pool, blobs), err(Display))]
pub async fn delete(pool: &SqlitePool, blobs: &dyn BlobStore, ids: &[i64]) -> Result<()> {
  if ids.is_empty() {
    return Ok(());
  }
  let mut tx = pool.begin().await?;
  let keys = delete_rows(&mut tx, ids).await?;
  tx.commit().await?;
  info!(assets = ids.len(), blobs = keys.len(), "Assets deleted.");
  remove_blobs(blobs, &keys).await;
  Ok(())
}

pub async fn remove_blobs(blobs: &dyn BlobStore, keys: &[String]) {
  for key in keys {
    if let Err(e) = blobs.delete(key).await {
      warn!(blob_key = %key, error = %e, "Failed to delete blob; leaving it orphaned.");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filenames_lose_their_directories() {
    assert_eq!(clean_filename("C:\\models\\chair.glb", AssetKind::Model), "chair.glb");
    assert_eq!(clean_filename("/tmp/wood.png", AssetKind::Texture), "wood.png");
    assert_eq!(clean_filename("  ", AssetKind::Scene), "scene.bin");
  }
}
