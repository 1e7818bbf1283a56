// hearth-server/src/models/payment.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A tokenised card. Only the provider's token is kept, never the number.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CreditCard {
  pub id: i64,
  pub customer_id: i64,
  pub provider: String,
  #[serde(skip_serializing)]
  pub provider_token: String,
  pub card_brand: String,
  pub last4: String,
  pub exp_month: Option<i64>,
  pub exp_year: Option<i64>,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BankAccount {
  pub id: i64,
  pub customer_id: i64,
  pub provider: String,
  #[serde(skip_serializing)]
  pub provider_token: String,
  pub bank_name: String,
  pub account_holder: String,
  pub last4: String,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
}
