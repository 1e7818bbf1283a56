// hearth-server/src/pipelines/cart_pipeline.rs

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::PurchaseKind;
use crate::pipelines::contexts::AddToCartCtxData;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, SkipCondition};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub fn register_add_to_cart_pipeline(registry: &FlowRegistry<AppError>) {
  // Digital copies are unlimited; only physical lines consume stock.
  let digital_only: SkipCondition<AddToCartCtxData> =
    Arc::new(|ctx_data: ContextData<AddToCartCtxData>| ctx_data.read().kind == Some(PurchaseKind::Digital));

  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(
    "add_to_cart",
    &[
      ("validate_add_to_cart", false, None),
      ("load_product", false, None),
      ("check_availability", false, None),
      ("check_stock", false, Some(digital_only)),
      ("upsert_cart_line", false, None),
      ("recompute_cart_total", false, None),
    ],
  );

  p.on("validate_add_to_cart", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let mut guard = ctx_data.write();
    if guard.quantity < 1 {
      return Err(AppError::Validation("Quantity must be at least 1.".into()));
    }
    if guard.quantity > db::carts::MAX_LINE_QUANTITY {
      return Err(AppError::Validation(format!(
        "Quantity must be at most {}.",
        db::carts::MAX_LINE_QUANTITY
      )));
    }
    let kind = match guard.requested_kind.trim().to_ascii_lowercase().as_str() {
      "digital" => PurchaseKind::Digital,
      "physical" => PurchaseKind::Physical,
      other => return Err(AppError::Validation(format!("Unknown purchase type '{other}'."))),
    };
    guard.kind = Some(kind);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("load_product", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let (pool, product_id) = {
      let guard = ctx_data.read();
      (guard.app_state.db_pool.clone(), guard.product_id)
    };
    let product = db::products::require_listing(&pool, product_id).await?;
    ctx_data.write().product = Some(product);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("check_availability", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let mut guard = ctx_data.write();
    let kind = guard.kind.ok_or_else(|| AppError::Internal("Purchase type not resolved.".into()))?;
    let price = guard.product.as_ref().and_then(|p| p.unit_price(kind));
    match price {
      Some(cents) => {
        guard.unit_price_cents = cents;
        Ok::<_, AppError>(PipelineControl::Continue)
      }
      None => Err(AppError::Validation(format!("This product is not available as {kind}."))),
    }
  });

  p.on("check_stock", check_stock);
  p.on("upsert_cart_line", upsert_cart_line);

  p.on("recompute_cart_total", |ctx_data: ContextData<AddToCartCtxData>| async move {
    let (pool, cart_id) = {
      let guard = ctx_data.read();
      (guard.app_state.db_pool.clone(), guard.cart_id)
    };
    let cart_id = cart_id.ok_or_else(|| AppError::Internal("Cart not resolved.".into()))?;
    let mut conn = pool.acquire().await?;
    let total = db::carts::recompute_total(&mut conn, cart_id).await?;
    debug!(cart_id, total, "Cart total recomputed.");
    ctx_data.write().cart_total_cents = total;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  registry.register(p);
  info!("Add-to-cart pipeline registered.");
}

async fn resolve_cart(ctx_data: &ContextData<AddToCartCtxData>, pool: &SqlitePool) -> AppResult<i64> {
  let (cached, customer_id) = {
    let guard = ctx_data.read();
    (guard.cart_id, guard.customer_id)
  };
  if let Some(id) = cached {
    return Ok(id);
  }
  let cart = db::carts::for_customer(pool, customer_id).await?;
  ctx_data.write().cart_id = Some(cart.id);
  Ok(cart.id)
}

async fn check_stock(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (pool, product_id, quantity, stock) = {
    let guard = ctx_data.read();
    (
      guard.app_state.db_pool.clone(),
      guard.product_id,
      guard.quantity,
      guard.product.as_ref().map(|p| p.stock).unwrap_or(0),
    )
  };
  let cart_id = resolve_cart(&ctx_data, &pool).await?;
  let in_cart = db::carts::line_quantity(&pool, cart_id, product_id, PurchaseKind::Physical).await?;
  if stock < in_cart + quantity {
    warn!(product_id, stock, in_cart, quantity, "Not enough stock for cart request.");
    return Err(AppError::Validation(format!(
      "Insufficient stock: {stock} available, {in_cart} already in cart."
    )));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "add_to_cart::upsert_cart_line", skip_all, err(Display))]
async fn upsert_cart_line(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (pool, product_id, quantity, kind, unit_price) = {
    let guard = ctx_data.read();
    (
      guard.app_state.db_pool.clone(),
      guard.product_id,
      guard.quantity,
      guard.kind,
      guard.unit_price_cents,
    )
  };
  let kind = kind.ok_or_else(|| AppError::Internal("Purchase type not resolved.".into()))?;
  let cart_id = resolve_cart(&ctx_data, &pool).await?;
  let line_id = db::carts::upsert_line(&pool, cart_id, product_id, kind, quantity, unit_price).await?;
  info!(cart_id, line_id, product_id, %kind, quantity, "Cart line updated.");
  ctx_data.write().cart_item_id = Some(line_id);
  Ok(PipelineControl::Continue)
}
