// hearth-server/src/pipelines/contexts.rs

//! Data carried through each workflow. Handlers receive these wrapped in
//! `hearth_flow::ContextData`; the HTTP handler that started the run reads
//! the outcome fields back once it completes.

use crate::db::homes::Placement;
use crate::db::products::NewProduct;
use crate::models::{Boundary, CartLine, DigitalHome, Order, OwnedItemDetail, ProductListing, PurchaseKind, Role, Session, User};
use crate::state::AppState;
use actix_web::web::Bytes;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub role: Role,
  pub username: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub email: Option<String>,
  pub phone_no: Option<String>,
  pub created_user: Option<User>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub identifier: String,
  pub password: String,
  pub user: Option<User>,
  pub session: Option<Session>,
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub customer_id: i64,
  pub product_id: i64,
  pub requested_kind: String,
  pub quantity: i64,
  pub kind: Option<PurchaseKind>,
  pub product: Option<ProductListing>,
  pub unit_price_cents: i64,
  pub cart_id: Option<i64>,
  pub cart_item_id: Option<i64>,
  pub cart_total_cents: i64,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub customer_id: i64,
  pub cart_id: Option<i64>,
  pub lines: Vec<CartLine>,
  pub total_cents: i64,
  pub order: Option<Order>,
}

#[derive(Clone)]
pub struct OrderCompletionCtxData {
  pub app_state: AppState,
  pub customer_id: i64,
  pub order_id: i64,
  pub order: Option<Order>,
  pub granted_item_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct ProductCreationCtxData {
  pub app_state: AppState,
  pub product: NewProduct,
  pub product_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum ReviewAction {
  Add {
    product_id: i64,
    rating: i64,
    comment: String,
  },
  Edit {
    review_id: i64,
    rating: Option<i64>,
    comment: Option<String>,
  },
  Delete {
    review_id: i64,
  },
}

#[derive(Clone)]
pub struct ReviewCtxData {
  pub app_state: AppState,
  pub customer_id: i64,
  pub action: ReviewAction,
  /// Product whose rating must be refreshed; resolved during authorisation.
  pub product_id: Option<i64>,
  pub review_id: Option<i64>,
  pub product_rating: Option<f64>,
  /// Image blob orphaned by a delete, removed once the transaction commits.
  pub released_image_key: Option<String>,
}

#[derive(Clone)]
pub struct HomeCreationCtxData {
  pub app_state: AppState,
  pub customer_id: i64,
  pub name: String,
  pub filename: String,
  pub model_bytes: Bytes,
  pub bounds: Option<Boundary>,
  pub home: Option<DigitalHome>,
}

/// One entry of a placement request body.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacementRequest {
  pub owned_item_id: i64,
  pub position: [f64; 4],
  pub rotation: [f64; 3],
  pub scale: [f64; 3],
  #[serde(default)]
  pub texture_id: Option<i64>,
  #[serde(default)]
  pub contains: Vec<i64>,
  #[serde(default)]
  pub composition: Vec<i64>,
}

#[derive(Clone)]
pub struct PlacementCtxData {
  pub app_state: AppState,
  pub customer_id: i64,
  pub home_id: i64,
  pub requests: Vec<PlacementRequest>,
  /// Every owned item the request touches, by id.
  pub owned: HashMap<i64, OwnedItemDetail>,
  pub placements: Vec<Placement>,
}
