// hearth-server/src/web/handlers/review_handlers.rs

use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::run_pipeline;
use crate::assets::catalog::remove_blobs;
use crate::db;
use crate::errors::AppError;
use crate::models::Review;
use crate::pipelines::contexts::{ReviewAction, ReviewCtxData};
use crate::state::AppState;
use crate::web::extractors::Customer;
use crate::web::files;

#[derive(Deserialize, Debug)]
pub struct AddReviewPayload {
  pub product_id: i64,
  pub rating: i64,
  #[serde(default)]
  pub comment: String,
}

#[derive(Deserialize, Debug)]
pub struct EditReviewPayload {
  pub review_id: i64,
  pub rating: Option<i64>,
  pub comment: Option<String>,
}

async fn run_review(app_state: &AppState, customer_id: i64, action: ReviewAction) -> Result<ReviewCtxData, AppError> {
  run_pipeline(
    app_state,
    ReviewCtxData {
      app_state: app_state.clone(),
      customer_id,
      action,
      product_id: None,
      review_id: None,
      product_rating: None,
      released_image_key: None,
    },
  )
  .await
}

#[instrument(name = "handler::add_review", skip_all, fields(customer_id = customer.0.id(), product_id = payload.product_id))]
pub async fn add_review_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<AddReviewPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let action = ReviewAction::Add {
    product_id: payload.product_id,
    rating: payload.rating,
    comment: payload.comment,
  };
  let ctx = run_review(&app_state, customer.0.id(), action).await?;
  Ok(HttpResponse::Created().json(json!({
    "message": "Review added.",
    "review_id": ctx.review_id,
    "product_rating": ctx.product_rating,
  })))
}

#[instrument(name = "handler::edit_review", skip_all, fields(customer_id = customer.0.id(), review_id = payload.review_id))]
pub async fn edit_review_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  payload: web::Json<EditReviewPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let action = ReviewAction::Edit {
    review_id: payload.review_id,
    rating: payload.rating,
    comment: payload.comment,
  };
  let ctx = run_review(&app_state, customer.0.id(), action).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Review updated.", "product_rating": ctx.product_rating })))
}

#[instrument(name = "handler::delete_review", skip(app_state, customer), fields(customer_id = customer.0.id()))]
pub async fn delete_review_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let action = ReviewAction::Delete {
    review_id: path.into_inner(),
  };
  let ctx = run_review(&app_state, customer.0.id(), action).await?;
  if let Some(key) = ctx.released_image_key {
    remove_blobs(app_state.blobs.as_ref(), &[key]).await;
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Review deleted.", "product_rating": ctx.product_rating })))
}

async fn own_review(app_state: &AppState, customer_id: i64, review_id: i64) -> Result<Review, AppError> {
  let review = db::reviews::find(&app_state.db_pool, review_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Review {review_id} not found.")))?;
  if review.customer_id != customer_id {
    return Err(AppError::Forbidden("You can only change your own reviews.".into()));
  }
  Ok(review)
}

#[instrument(name = "handler::upload_review_image", skip(app_state, customer, req, body), fields(len = body.len()))]
pub async fn upload_review_image_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  req: HttpRequest,
  path: web::Path<i64>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let review = own_review(&app_state, customer.0.id(), path.into_inner()).await?;
  let content_type = files::picture_content_type(&req)?;
  let body = files::checked_body(body, app_state.config.max_profile_picture_bytes, "review image")?;
  let blobs = app_state.blobs.as_ref();

  let key = format!("review/{}", Uuid::new_v4());
  blobs.put(&key, &body).await?;
  let replaced = {
    let mut conn = app_state.db_pool.acquire().await?;
    db::reviews::replace_image(&mut conn, review.id, Some((&key, &content_type))).await
  };
  match replaced {
    Ok(previous) => {
      remove_blobs(blobs, &previous.into_iter().collect::<Vec<_>>()).await;
      Ok(HttpResponse::Ok().json(json!({ "message": "Review image updated." })))
    }
    Err(e) => {
      remove_blobs(blobs, &[key]).await;
      Err(e)
    }
  }
}

pub async fn delete_review_image_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let review = own_review(&app_state, customer.0.id(), path.into_inner()).await?;
  let previous = {
    let mut conn = app_state.db_pool.acquire().await?;
    db::reviews::replace_image(&mut conn, review.id, None).await?
  };
  remove_blobs(app_state.blobs.as_ref(), &previous.into_iter().collect::<Vec<_>>()).await;
  Ok(HttpResponse::Ok().json(json!({ "message": "Review image removed." })))
}

pub async fn get_review_image_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let review_id = path.into_inner();
  let (key, content_type) = db::reviews::image(&app_state.db_pool, review_id)
    .await?
    .ok_or_else(|| AppError::not_found("Review image"))?;
  let bytes = app_state
    .blobs
    .get(&key)
    .await?
    .ok_or_else(|| AppError::not_found("Review image"))?;
  Ok(files::inline(&content_type, bytes))
}

pub async fn product_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = db::products::require_listing(&app_state.db_pool, product_id).await?;
  let reviews = db::reviews::list_for_product(&app_state.db_pool, product_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "rating": product.rating, "reviews": reviews })))
}

pub async fn my_reviews_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let reviews = db::reviews::list_for_customer(&app_state.db_pool, customer.0.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "reviews": reviews })))
}
