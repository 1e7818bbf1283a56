// hearth-server/src/models/review.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
  pub id: i64,
  pub product_id: i64,
  pub customer_id: i64,
  pub username: String,
  pub rating: i64,
  pub comment: String,
  pub has_image: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
