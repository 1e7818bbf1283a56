// hearth-server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::run_pipeline;
use crate::db;
use crate::errors::AppError;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::money;
use crate::state::AppState;
use crate::web::extractors::Customer;

fn default_quantity() -> i64 {
  1
}

#[derive(Deserialize, Debug)]
pub struct AddToCartPayload {
  pub product_id: i64,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default = "default_quantity")]
  pub quantity: i64,
}

#[derive(Deserialize, Debug, Default)]
pub struct SummaryQuery {
  pub tax: Option<String>,
  pub shipping: Option<String>,
  pub discount: Option<String>,
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, customer, payload),
  fields(customer_id = customer.0.id(), product_id = payload.product_id, quantity = payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx = run_pipeline(
    &app_state,
    AddToCartCtxData {
      app_state: app_state.get_ref().clone(),
      customer_id: customer.0.id(),
      product_id: payload.product_id,
      requested_kind: payload.kind,
      quantity: payload.quantity,
      kind: None,
      product: None,
      unit_price_cents: 0,
      cart_id: None,
      cart_item_id: None,
      cart_total_cents: 0,
    },
  )
  .await?;

  info!(cart_item_id = ?ctx.cart_item_id, total = ctx.cart_total_cents, "Item added to cart.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Item added to cart.",
    "cart_item_id": ctx.cart_item_id,
    "total_price_cents": ctx.cart_total_cents,
  })))
}

pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let cart = db::carts::for_customer(&app_state.db_pool, customer.0.id()).await?;
  if !db::carts::remove_line(&app_state.db_pool, cart.id, path.into_inner()).await? {
    return Err(AppError::not_found("Cart item"));
  }
  let mut conn = app_state.db_pool.acquire().await?;
  let total = db::carts::recompute_total(&mut conn, cart.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from cart.", "total_price_cents": total })))
}

pub async fn view_cart_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let cart = db::carts::for_customer(&app_state.db_pool, customer.0.id()).await?;
  let total = {
    let mut conn = app_state.db_pool.acquire().await?;
    db::carts::recompute_total(&mut conn, cart.id).await?
  };
  let items = db::carts::lines(&app_state.db_pool, cart.id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "cart_id": cart.id,
    "items": items,
    "total_price_cents": total,
  })))
}

pub async fn clear_cart_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let cart = db::carts::for_customer(&app_state.db_pool, customer.0.id()).await?;
  let mut conn = app_state.db_pool.acquire().await?;
  db::carts::clear(&mut conn, cart.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Cart cleared." })))
}

/// Totals as decimal strings. Missing or unparsable amounts count as zero.
pub async fn cart_summary_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, AppError> {
  let cart = db::carts::for_customer(&app_state.db_pool, customer.0.id()).await?;
  let subtotal = {
    let mut conn = app_state.db_pool.acquire().await?;
    db::carts::recompute_total(&mut conn, cart.id).await?
  };
  let amount = |v: &Option<String>| v.as_deref().map(money::parse_cents).unwrap_or(0);
  let (tax, shipping, discount) = (amount(&query.tax), amount(&query.shipping), amount(&query.discount));
  let total = subtotal
    .checked_add(tax)
    .and_then(|t| t.checked_add(shipping))
    .and_then(|t| t.checked_sub(discount))
    .ok_or_else(|| AppError::Validation("Summary amounts are out of range.".into()))?;
  Ok(HttpResponse::Ok().json(json!({
    "subtotal": money::format_cents(subtotal),
    "tax": money::format_cents(tax),
    "shipping": money::format_cents(shipping),
    "discount": money::format_cents(discount),
    "total": money::format_cents(total),
  })))
}
