// hearth-server/src/models/order.rs

use super::cart::PurchaseKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  PaymentCompleted,
  Complete,
  Cancelled,
}

impl OrderStatus {
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, PaymentCompleted) | (PaymentCompleted, Complete) | (Pending, Cancelled) | (PaymentCompleted, Cancelled)
    )
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      OrderStatus::Pending => "pending",
      OrderStatus::PaymentCompleted => "payment_completed",
      OrderStatus::Complete => "complete",
      OrderStatus::Cancelled => "cancelled",
    })
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub customer_id: i64,
  pub total_price_cents: i64,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Order line with name and price frozen at checkout.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: Option<i64>,
  pub item_id: Option<i64>,
  pub product_name: String,
  #[serde(rename = "type")]
  pub kind: PurchaseKind,
  pub quantity: i64,
  pub unit_price_cents: i64,
}

#[cfg(test)]
mod tests {
  use super::OrderStatus::*;

  #[test]
  fn status_machine_only_moves_forward() {
    assert!(Pending.can_transition_to(PaymentCompleted));
    assert!(PaymentCompleted.can_transition_to(Complete));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(!Pending.can_transition_to(Complete));
    assert!(!Complete.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(!Complete.can_transition_to(Complete));
  }
}
