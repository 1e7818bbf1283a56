// hearth-server/src/models/asset.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
  Model,
  Texture,
  Scene,
  Image,
  HomeModel,
}

impl AssetKind {
  pub fn as_str(self) -> &'static str {
    match self {
      AssetKind::Model => "model",
      AssetKind::Texture => "texture",
      AssetKind::Scene => "scene",
      AssetKind::Image => "image",
      AssetKind::HomeModel => "home_model",
    }
  }

  /// Content type used when the uploader did not send one.
  pub fn default_content_type(self) -> &'static str {
    match self {
      AssetKind::Model | AssetKind::HomeModel | AssetKind::Scene => "model/gltf-binary",
      AssetKind::Texture | AssetKind::Image => "application/octet-stream",
    }
  }
}

impl fmt::Display for AssetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Asset {
  pub id: i64,
  pub kind: AssetKind,
  pub filename: String,
  pub content_type: String,
  #[serde(skip_serializing)]
  pub blob_key: String,
  pub size_bytes: i64,
  pub parent_id: Option<i64>,
  pub created_at: DateTime<Utc>,
}
