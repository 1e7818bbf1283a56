// hearth-server/src/pipelines/order_pipeline.rs

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderStatus, PurchaseKind};
use crate::pipelines::contexts::OrderCompletionCtxData;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument};

/// Completing an order hands out the digital copies it paid for.
pub fn register_order_completion_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<OrderCompletionCtxData, AppError>::new(
    "order_completion",
    &[
      ("load_order", false, None),
      ("check_transition", false, None),
      ("complete_and_grant", false, None),
    ],
  );

  p.on("load_order", |ctx_data: ContextData<OrderCompletionCtxData>| async move {
    let (pool, customer_id, order_id) = {
      let guard = ctx_data.read();
      (guard.app_state.db_pool.clone(), guard.customer_id, guard.order_id)
    };
    let order = db::orders::find_for_customer(&pool, customer_id, order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found.")))?;
    ctx_data.write().order = Some(order);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("check_transition", |ctx_data: ContextData<OrderCompletionCtxData>| async move {
    let guard = ctx_data.read();
    let status = guard.order.as_ref().map(|o| o.status);
    match status {
      Some(status) if status.can_transition_to(OrderStatus::Complete) => Ok(PipelineControl::Continue),
      Some(status) => Err(AppError::Conflict(format!("Cannot complete an order that is {status}."))),
      None => Err(AppError::Internal("Order not loaded.".into())),
    }
  });

  p.on("complete_and_grant", complete_and_grant);

  registry.register(p);
  info!("Order completion pipeline registered.");
}

#[instrument(name = "order_completion::complete_and_grant", skip_all, err(Display))]
async fn complete_and_grant(ctx_data: ContextData<OrderCompletionCtxData>) -> AppResult<PipelineControl> {
  let (pool, customer_id, order) = {
    let guard = ctx_data.read();
    (guard.app_state.db_pool.clone(), guard.customer_id, guard.order.clone())
  };
  let order = order.ok_or_else(|| AppError::Internal("Order not loaded.".into()))?;

  let mut tx = pool.begin().await?;
  if !db::orders::transition(&mut *tx, order.id, order.status, OrderStatus::Complete).await? {
    return Err(AppError::Conflict("Order status changed concurrently.".into()));
  }
  let items = db::orders::items(&mut *tx, order.id).await?;
  let mut granted = Vec::new();
  for line in items.iter().filter(|l| l.kind == PurchaseKind::Digital) {
    if let Some(item_id) = line.item_id {
      granted.extend(db::homes::grant(&mut tx, customer_id, order.id, item_id, line.quantity).await?);
    }
  }
  tx.commit().await?;

  info!(order_id = order.id, granted = granted.len(), "Order completed.");
  ctx_data.write().granted_item_ids = granted;
  Ok(PipelineControl::Continue)
}
