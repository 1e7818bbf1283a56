// hearth-server/src/pipelines/review_pipeline.rs

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::{ReviewAction, ReviewCtxData};
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, instrument};

/// Add, edit and delete all go through here so the product rating is
/// recomputed in the same transaction as the review write.
pub fn register_review_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<ReviewCtxData, AppError>::new(
    "review",
    &[
      ("validate_review", false, None),
      ("authorize_review", false, None),
      ("write_review", false, None),
    ],
  );

  p.on("validate_review", |ctx_data: ContextData<ReviewCtxData>| async move {
    let guard = ctx_data.read();
    let rating = match &guard.action {
      ReviewAction::Add { rating, .. } => Some(*rating),
      ReviewAction::Edit { rating, .. } => *rating,
      ReviewAction::Delete { .. } => None,
    };
    if rating.is_some_and(|r| !(1..=5).contains(&r)) {
      return Err(AppError::Validation("Rating must be between 1 and 5.".into()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("authorize_review", authorize_review);
  p.on("write_review", write_review);

  registry.register(p);
  info!("Review pipeline registered.");
}

async fn authorize_review(ctx_data: ContextData<ReviewCtxData>) -> AppResult<PipelineControl> {
  let (pool, customer_id, action) = {
    let guard = ctx_data.read();
    (guard.app_state.db_pool.clone(), guard.customer_id, guard.action.clone())
  };

  let (product_id, review_id) = match action {
    ReviewAction::Add { product_id, .. } => {
      db::products::require_listing(&pool, product_id).await?;
      if db::reviews::exists_for(&pool, product_id, customer_id).await? {
        return Err(AppError::Validation("You have already reviewed this product.".into()));
      }
      (product_id, None)
    }
    ReviewAction::Edit { review_id, .. } | ReviewAction::Delete { review_id } => {
      let review = db::reviews::find(&pool, review_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {review_id} not found.")))?;
      if review.customer_id != customer_id {
        return Err(AppError::Forbidden("You can only change your own reviews.".into()));
      }
      (review.product_id, Some(review_id))
    }
  };

  let mut guard = ctx_data.write();
  guard.product_id = Some(product_id);
  guard.review_id = review_id;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "review::write_review", skip_all, err(Display))]
async fn write_review(ctx_data: ContextData<ReviewCtxData>) -> AppResult<PipelineControl> {
  let (pool, customer_id, action, product_id) = {
    let guard = ctx_data.read();
    (
      guard.app_state.db_pool.clone(),
      guard.customer_id,
      guard.action.clone(),
      guard.product_id,
    )
  };
  let product_id = product_id.ok_or_else(|| AppError::Internal("Review product not resolved.".into()))?;

  let mut tx = pool.begin().await?;
  let mut released_image_key = None;
  let review_id = match action {
    ReviewAction::Add { rating, comment, .. } => {
      let inserted = db::reviews::insert(&mut *tx, product_id, customer_id, rating, comment.trim()).await;
      match inserted {
        Err(e) if e.is_unique_violation() => {
          return Err(AppError::Validation("You have already reviewed this product.".into()))
        }
        other => other?,
      }
    }
    ReviewAction::Edit {
      review_id,
      rating,
      comment,
    } => {
      db::reviews::update(&mut *tx, review_id, rating, comment.as_deref().map(str::trim)).await?;
      review_id
    }
    ReviewAction::Delete { review_id } => {
      released_image_key = db::reviews::delete(&mut *tx, review_id).await?;
      review_id
    }
  };
  let rating = db::reviews::refresh_product_rating(&mut tx, product_id).await?;
  tx.commit().await?;

  info!(review_id, product_id, rating, "Review written.");
  let mut guard = ctx_data.write();
  guard.review_id = Some(review_id);
  guard.product_rating = Some(rating);
  guard.released_image_key = released_image_key;
  Ok(PipelineControl::Continue)
}
