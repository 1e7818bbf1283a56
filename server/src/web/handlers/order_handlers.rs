// hearth-server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{info, instrument};

use super::run_pipeline;
use crate::db;
use crate::errors::AppError;
use crate::models::{Order, OrderStatus, PurchaseKind};
use crate::pipelines::contexts::{CheckoutCtxData, OrderCompletionCtxData};
use crate::state::AppState;
use crate::web::extractors::Customer;

#[instrument(name = "handler::checkout", skip_all, fields(customer_id = customer.0.id()))]
pub async fn checkout_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let ctx = run_pipeline(
    &app_state,
    CheckoutCtxData {
      app_state: app_state.get_ref().clone(),
      customer_id: customer.0.id(),
      cart_id: None,
      lines: Vec::new(),
      total_cents: 0,
      order: None,
    },
  )
  .await?;
  let order = ctx
    .order
    .ok_or_else(|| AppError::Internal("Checkout completed without an order.".into()))?;
  Ok(HttpResponse::Created().json(json!({
    "message": "Order placed.",
    "order_id": order.id,
    "total_price_cents": order.total_price_cents,
  })))
}

async fn order_json(app_state: &AppState, order: &Order) -> Result<serde_json::Value, AppError> {
  let items = db::orders::items(&app_state.db_pool, order.id).await?;
  let mut body = serde_json::to_value(order)?;
  body["items"] = serde_json::to_value(items)?;
  Ok(body)
}

pub async fn list_orders_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let orders = db::orders::list_for_customer(&app_state.db_pool, customer.0.id()).await?;
  let mut out = Vec::with_capacity(orders.len());
  for order in &orders {
    out.push(order_json(&app_state, order).await?);
  }
  Ok(HttpResponse::Ok().json(json!({ "orders": out })))
}

async fn load_order(conn: &mut SqliteConnection, customer_id: i64, order_id: i64) -> Result<Order, AppError> {
  db::orders::find_for_customer(conn, customer_id, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found.")))
}

pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order = {
    let mut conn = app_state.db_pool.acquire().await?;
    load_order(&mut conn, customer.0.id(), path.into_inner()).await?
  };
  Ok(HttpResponse::Ok().json(order_json(&app_state, &order).await?))
}

fn ensure_transition(order: &Order, next: OrderStatus) -> Result<(), AppError> {
  if order.status.can_transition_to(next) {
    Ok(())
  } else {
    Err(AppError::Conflict(format!(
      "Order {} is {} and cannot become {next}.",
      order.id, order.status
    )))
  }
}

#[instrument(name = "handler::payment_completed", skip(app_state, customer), fields(customer_id = customer.0.id()))]
pub async fn payment_completed_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let mut conn = app_state.db_pool.acquire().await?;
  let order = load_order(&mut conn, customer.0.id(), path.into_inner()).await?;
  ensure_transition(&order, OrderStatus::PaymentCompleted)?;
  if !db::orders::transition(&mut *conn, order.id, order.status, OrderStatus::PaymentCompleted).await? {
    return Err(AppError::Conflict("Order status changed concurrently.".into()));
  }
  info!(order_id = order.id, "Payment recorded.");
  Ok(HttpResponse::Ok().json(json!({ "order_id": order.id, "status": OrderStatus::PaymentCompleted })))
}

/// Cancelling puts physical stock back.
#[instrument(name = "handler::cancel_order", skip(app_state, customer), fields(customer_id = customer.0.id()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let mut tx = app_state.db_pool.begin().await?;
  let order = load_order(&mut tx, customer.0.id(), path.into_inner()).await?;
  ensure_transition(&order, OrderStatus::Cancelled)?;
  if !db::orders::transition(&mut *tx, order.id, order.status, OrderStatus::Cancelled).await? {
    return Err(AppError::Conflict("Order status changed concurrently.".into()));
  }
  let items = db::orders::items(&mut *tx, order.id).await?;
  for line in items.iter().filter(|l| l.kind == PurchaseKind::Physical) {
    if let Some(product_id) = line.product_id {
      db::products::return_stock(&mut *tx, product_id, line.quantity).await?;
    }
  }
  tx.commit().await?;
  info!(order_id = order.id, "Order cancelled.");
  Ok(HttpResponse::Ok().json(json!({ "order_id": order.id, "status": OrderStatus::Cancelled })))
}

#[instrument(name = "handler::complete_order", skip(app_state, customer), fields(customer_id = customer.0.id()))]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let ctx = run_pipeline(
    &app_state,
    OrderCompletionCtxData {
      app_state: app_state.get_ref().clone(),
      customer_id: customer.0.id(),
      order_id: path.into_inner(),
      order: None,
      granted_item_ids: Vec::new(),
    },
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({
    "order_id": ctx.order_id,
    "status": OrderStatus::Complete,
    "owned_item_ids": ctx.granted_item_ids,
  })))
}
