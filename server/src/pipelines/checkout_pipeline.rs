// hearth-server/src/pipelines/checkout_pipeline.rs

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::PurchaseKind;
use crate::pipelines::contexts::CheckoutCtxData;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument, warn};

pub fn register_checkout_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(
    "checkout",
    &[
      ("load_cart_lines", false, None),
      ("verify_prices_and_stock", false, None),
      ("place_order", false, None),
    ],
  );

  p.on("load_cart_lines", |ctx_data: ContextData<CheckoutCtxData>| async move {
    let (pool, customer_id) = {
      let guard = ctx_data.read();
      (guard.app_state.db_pool.clone(), guard.customer_id)
    };
    let cart = db::carts::for_customer(&pool, customer_id).await?;
    let lines = db::carts::lines(&pool, cart.id).await?;
    if lines.is_empty() {
      return Err(AppError::Validation("Cart is empty.".into()));
    }
    let mut guard = ctx_data.write();
    guard.cart_id = Some(cart.id);
    guard.lines = lines;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("verify_prices_and_stock", verify_prices_and_stock);
  p.on("place_order", place_order);

  registry.register(p);
  info!("Checkout pipeline registered.");
}

/// Refreshes line prices from the catalog and rejects lines that can no
/// longer be bought or whose physical stock ran out.
async fn verify_prices_and_stock(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (pool, cart_id, lines) = {
    let guard = ctx_data.read();
    (guard.app_state.db_pool.clone(), guard.cart_id, guard.lines.clone())
  };
  let cart_id = cart_id.ok_or_else(|| AppError::Internal("Cart not resolved.".into()))?;

  for line in &lines {
    let product = db::products::require_listing(&pool, line.product_id).await?;
    if product.unit_price(line.kind).is_none() {
      return Err(AppError::Validation(format!(
        "'{}' is no longer available as {}.",
        product.name, line.kind
      )));
    }
    if line.kind == PurchaseKind::Physical && product.stock < line.quantity {
      warn!(product_id = product.product_id, stock = product.stock, wanted = line.quantity, "Stock ran out before checkout.");
      return Err(AppError::Validation(format!("Insufficient stock for '{}'.", product.name)));
    }
  }

  let total = {
    let mut conn = pool.acquire().await?;
    db::carts::recompute_total(&mut conn, cart_id).await?
  };
  let refreshed = db::carts::lines(&pool, cart_id).await?;
  let mut guard = ctx_data.write();
  guard.total_cents = total;
  guard.lines = refreshed;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::place_order", skip_all, err(Display))]
async fn place_order(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (pool, customer_id, cart_id, total, lines) = {
    let guard = ctx_data.read();
    (
      guard.app_state.db_pool.clone(),
      guard.customer_id,
      guard.cart_id,
      guard.total_cents,
      guard.lines.clone(),
    )
  };
  let cart_id = cart_id.ok_or_else(|| AppError::Internal("Cart not resolved.".into()))?;

  let mut tx = pool.begin().await?;
  let order = db::orders::create_from_cart(&mut tx, customer_id, cart_id, total).await?;
  for line in lines.iter().filter(|l| l.kind == PurchaseKind::Physical) {
    if !db::products::take_stock(&mut *tx, line.product_id, line.quantity).await? {
      // Dropping the transaction rolls the order back.
      return Err(AppError::Validation(format!(
        "Insufficient stock for '{}'.",
        line.product_name
      )));
    }
  }
  db::carts::clear(&mut tx, cart_id).await?;
  tx.commit().await?;

  info!(order_id = order.id, customer_id, total, lines = lines.len(), "Order placed.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}
