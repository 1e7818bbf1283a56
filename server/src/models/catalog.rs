// hearth-server/src/models/catalog.rs

use super::cart::PurchaseKind;
use serde::Serialize;
use sqlx::FromRow;

/// A product (the sale listing) joined with its item (the furniture piece
/// itself). Every catalog read returns this shape.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductListing {
  pub product_id: i64,
  pub item_id: i64,
  pub name: String,
  pub description: String,
  pub category: String,
  pub item_type: String,
  pub model_id: Option<i64>,
  pub is_container: bool,
  pub digital_price_cents: Option<i64>,
  pub physical_price_cents: Option<i64>,
  pub digital_available: bool,
  pub physical_available: bool,
  pub image_id: Option<i64>,
  pub stock: i64,
  pub rating: f64,
}

impl ProductListing {
  /// Unit price for `kind`, or `None` when that kind cannot be bought.
  pub fn unit_price(&self, kind: PurchaseKind) -> Option<i64> {
    let (available, price) = match kind {
      PurchaseKind::Digital => (self.digital_available, self.digital_price_cents),
      PurchaseKind::Physical => (self.physical_available, self.physical_price_cents),
    };
    price.filter(|p| available && *p > 0)
  }
}
