// hearth-server/src/assets/blob_store.rs

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// Flat key/value storage for asset bytes. Keys look like `texture/<uuid>`.
#[async_trait]
pub trait BlobStore: Send + Sync {
  async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Deleting a missing key is not an error.
  async fn delete(&self, key: &str) -> Result<()>;

  async fn exists(&self, key: &str) -> Result<bool> {
    Ok(self.get(key).await?.is_some())
  }
}

/// Keys map to files under `root`. Writes land in a temp file first and are
/// renamed into place, so readers never observe a partial blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    debug!(root = %root.display(), "Blob store opened.");
    Ok(Self { root })
  }

  fn path_for(&self, key: &str) -> Result<PathBuf> {
    let relative = Path::new(key);
    let safe = !key.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
    if !safe {
      return Err(AppError::Storage(format!("Invalid blob key '{key}'")));
    }
    Ok(self.root.join(relative))
  }
}

#[async_trait]
impl BlobStore for FsBlobStore {
  #[instrument(name = "blob_store::put", skip(self, bytes), fields(len = bytes.len()), err(Display))]
  async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
    let path = self.path_for(key)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
      let _ = tokio::fs::remove_file(&tmp).await;
      return Err(e.into());
    }
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let path = self.path_for(key)?;
    match tokio::fs::read(&path).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn delete(&self, key: &str) -> Result<()> {
    let path = self.path_for(key)?;
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  async fn exists(&self, key: &str) -> Result<bool> {
    Ok(tokio::fs::try_exists(self.path_for(key)?).await?)
  }
}

/// Process-local store for tests and throwaway instances.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
  blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.blobs.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
  async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
    self.blobs.lock().insert(key.to_string(), bytes.to_vec());
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.blobs.lock().get(key).cloned())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    self.blobs.lock().remove(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn fs_store_round_trips_and_deletes() {
    let root = std::env::temp_dir().join(format!("hearth-blob-test-{}", uuid::Uuid::new_v4()));
    let store = FsBlobStore::open(&root).await.unwrap();

    store.put("model/abc", b"glb-bytes").await.unwrap();
    assert!(store.exists("model/abc").await.unwrap());
    assert_eq!(store.get("model/abc").await.unwrap().as_deref(), Some(&b"glb-bytes"[..]));

    store.delete("model/abc").await.unwrap();
    store.delete("model/abc").await.unwrap();
    assert_eq!(store.get("model/abc").await.unwrap(), None);

    tokio::fs::remove_dir_all(&root).await.ok();
  }

  #[tokio::test]
  async fn fs_store_rejects_escaping_keys() {
    let root = std::env::temp_dir().join(format!("hearth-blob-test-{}", uuid::Uuid::new_v4()));
    let store = FsBlobStore::open(&root).await.unwrap();
    assert!(store.put("../outside", b"x").await.is_err());
    assert!(store.get("/etc/passwd").await.is_err());
    tokio::fs::remove_dir_all(&root).await.ok();
  }

  #[tokio::test]
  async fn memory_store_counts_blobs() {
    let store = MemoryBlobStore::new();
    store.put("a", b"1").await.unwrap();
    store.put("b", b"2").await.unwrap();
    store.delete("a").await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(!store.exists("a").await.unwrap());
  }
}
