// hearth-server/src/models/home.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placement of an object: position carries a fourth `t` component used by
/// clients for timeline ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
  pub position: [f64; 4],
  pub rotation: [f64; 3],
  pub scale: [f64; 3],
}

impl Default for Transform {
  fn default() -> Self {
    Self {
      position: [0.0; 4],
      rotation: [0.0; 3],
      scale: [1.0; 3],
    }
  }
}

/// Axis-aligned bounds of a home model, in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
  pub min: [f64; 3],
  pub max: [f64; 3],
}

#[derive(Debug, Clone, FromRow)]
pub struct DigitalHome {
  pub id: i64,
  pub customer_id: i64,
  pub name: String,
  pub model_id: i64,
  pub pos_x: f64,
  pub pos_y: f64,
  pub pos_z: f64,
  pub rot_x: f64,
  pub rot_y: f64,
  pub rot_z: f64,
  pub scale_x: f64,
  pub scale_y: f64,
  pub scale_z: f64,
  pub min_x: f64,
  pub min_y: f64,
  pub min_z: f64,
  pub max_x: f64,
  pub max_y: f64,
  pub max_z: f64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl DigitalHome {
  pub fn transform(&self) -> Transform {
    Transform {
      position: [self.pos_x, self.pos_y, self.pos_z, 0.0],
      rotation: [self.rot_x, self.rot_y, self.rot_z],
      scale: [self.scale_x, self.scale_y, self.scale_z],
    }
  }

  pub fn boundary(&self) -> Boundary {
    Boundary {
      min: [self.min_x, self.min_y, self.min_z],
      max: [self.max_x, self.max_y, self.max_z],
    }
  }
}

/// A digital copy of an item granted by a completed order.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedItem {
  pub id: i64,
  pub customer_id: i64,
  pub item_id: i64,
  pub order_id: Option<i64>,
  pub is_container: bool,
  pub home_id: Option<i64>,
  pub texture_id: Option<i64>,
  pub pos_x: f64,
  pub pos_y: f64,
  pub pos_z: f64,
  pub pos_t: f64,
  pub rot_x: f64,
  pub rot_y: f64,
  pub rot_z: f64,
  pub scale_x: f64,
  pub scale_y: f64,
  pub scale_z: f64,
  #[sqlx(json)]
  pub position_history: Vec<[f64; 4]>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl OwnedItem {
  pub fn transform(&self) -> Transform {
    Transform {
      position: [self.pos_x, self.pos_y, self.pos_z, self.pos_t],
      rotation: [self.rot_x, self.rot_y, self.rot_z],
      scale: [self.scale_x, self.scale_y, self.scale_z],
    }
  }
}

/// An owned item joined with the catalog item it is a copy of.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedItemDetail {
  #[sqlx(flatten)]
  pub owned: OwnedItem,
  pub item_name: String,
  pub category: String,
  pub item_model_id: Option<i64>,
}

/// How one owned item hangs off another: a container holding it, or a
/// piece composed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LinkRelation {
  Contains,
  Composition,
}
