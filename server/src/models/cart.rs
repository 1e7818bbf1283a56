// hearth-server/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Whether a line buys the 3D model or the physical piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
  Digital,
  Physical,
}

impl fmt::Display for PurchaseKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      PurchaseKind::Digital => "digital",
      PurchaseKind::Physical => "physical",
    })
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
  pub id: i64,
  pub customer_id: i64,
  pub total_price_cents: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A cart item joined with the product name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  pub id: i64,
  pub product_id: i64,
  pub product_name: String,
  #[serde(rename = "type")]
  pub kind: PurchaseKind,
  pub quantity: i64,
  pub unit_price_cents: i64,
  pub line_total_cents: i64,
  pub added_at: DateTime<Utc>,
}
