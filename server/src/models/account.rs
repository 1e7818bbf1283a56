// hearth-server/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Address {
  pub id: i64,
  pub customer_id: i64,
  pub address: String,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
}
