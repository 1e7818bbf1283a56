// hearth-server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use super::run_pipeline;
use crate::assets;
use crate::db;
use crate::db::products::{NewProduct, ProductChanges};
use crate::errors::AppError;
use crate::models::AssetKind;
use crate::pipelines::contexts::ProductCreationCtxData;
use crate::state::AppState;
use crate::web::extractors::CatalogManager;

#[derive(Deserialize, Debug)]
pub struct AddProductPayload {
  pub name: String,
  pub description: String,
  pub category: String,
  #[serde(default)]
  pub product_type: String,
  pub digital_price_cents: Option<i64>,
  pub physical_price_cents: Option<i64>,
  #[serde(default)]
  pub digital_available: bool,
  #[serde(default)]
  pub physical_available: bool,
  #[serde(default)]
  pub stock: i64,
  #[serde(default)]
  pub is_container: bool,
  pub model_id: i64,
  #[serde(default)]
  pub display_scene_ids: Vec<i64>,
  pub image_id: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct ListQuery {
  pub category: Option<String>,
  pub q: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateProductPayload {
  pub product_id: i64,
  pub name: Option<String>,
  pub description: Option<String>,
  pub category: Option<String>,
  pub product_type: Option<String>,
  pub is_container: Option<bool>,
  pub digital_price_cents: Option<i64>,
  pub physical_price_cents: Option<i64>,
  pub digital_available: Option<bool>,
  pub physical_available: Option<bool>,
  pub image_id: Option<i64>,
  pub stock: Option<i64>,
  pub model_id: Option<i64>,
  pub display_scene_ids: Option<Vec<i64>>,
}

#[instrument(name = "handler::add_product", skip_all, fields(name = %payload.name))]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  payload: web::Json<AddProductPayload>,
) -> Result<HttpResponse, AppError> {
  let p = payload.into_inner();
  let ctx = run_pipeline(
    &app_state,
    ProductCreationCtxData {
      app_state: app_state.get_ref().clone(),
      product: NewProduct {
        name: p.name,
        description: p.description,
        category: p.category,
        item_type: p.product_type,
        model_id: p.model_id,
        is_container: p.is_container,
        digital_price_cents: p.digital_price_cents,
        physical_price_cents: p.physical_price_cents,
        digital_available: p.digital_available,
        physical_available: p.physical_available,
        image_id: p.image_id,
        stock: p.stock,
        display_scene_ids: p.display_scene_ids,
      },
      product_id: None,
    },
  )
  .await?;
  let product_id = ctx
    .product_id
    .ok_or_else(|| AppError::Internal("Product creation completed without a product id.".into()))?;
  Ok(HttpResponse::Created().json(json!({ "message": "Product added.", "product_id": product_id })))
}

pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListQuery>,
) -> Result<HttpResponse, AppError> {
  let clean = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
  let category = clean(&query.category);
  let q = clean(&query.q);
  let products = db::products::list(&app_state.db_pool, category.as_deref(), q.as_deref()).await?;
  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::product_detail", skip(app_state))]
pub async fn product_detail_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let pool = &app_state.db_pool;
  let listing = db::products::require_listing(pool, product_id).await?;
  let scene_ids = db::products::scene_ids(pool, product_id).await?;
  let review_ids = db::products::review_ids(pool, product_id).await?;
  let texture_ids: Vec<i64> = match listing.model_id {
    Some(model_id) => {
      let mut conn = pool.acquire().await?;
      assets::catalog::children(&mut conn, model_id, AssetKind::Texture)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect()
    }
    None => Vec::new(),
  };

  let mut body = serde_json::to_value(&listing)?;
  body["display_scene_ids"] = json!(scene_ids);
  body["texture_ids"] = json!(texture_ids);
  body["review_ids"] = json!(review_ids);
  Ok(HttpResponse::Ok().json(body))
}

async fn verify_kind(app_state: &AppState, id: Option<i64>, kind: AssetKind) -> Result<(), AppError> {
  if let Some(id) = id {
    let mut conn = app_state.db_pool.acquire().await?;
    assets::catalog::get_of_kind(&mut conn, id, kind).await?;
  }
  Ok(())
}

#[instrument(name = "handler::update_product", skip_all, fields(product_id = payload.product_id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  payload: web::Json<UpdateProductPayload>,
) -> Result<HttpResponse, AppError> {
  let p = payload.into_inner();
  if p.digital_price_cents.is_some_and(|c| c < 0) || p.physical_price_cents.is_some_and(|c| c < 0) {
    return Err(AppError::Validation("Prices cannot be negative.".into()));
  }
  let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

  verify_kind(&app_state, p.model_id, AssetKind::Model).await?;
  verify_kind(&app_state, p.image_id, AssetKind::Image).await?;
  for scene_id in p.display_scene_ids.iter().flatten() {
    verify_kind(&app_state, Some(*scene_id), AssetKind::Scene).await?;
  }

  let changes = ProductChanges {
    name: trimmed(p.name),
    description: trimmed(p.description),
    category: trimmed(p.category),
    item_type: p.product_type.map(|s| s.trim().to_string()),
    is_container: p.is_container,
    digital_price_cents: p.digital_price_cents,
    physical_price_cents: p.physical_price_cents,
    digital_available: p.digital_available,
    physical_available: p.physical_available,
    image_id: p.image_id,
    // A negative stock value is ignored rather than rejected.
    stock: p.stock.filter(|s| *s >= 0),
    model_id: p.model_id,
    display_scene_ids: p.display_scene_ids,
  };

  let mut tx = app_state.db_pool.begin().await?;
  let orphaned = db::products::update(&mut tx, p.product_id, &changes).await?;
  let blob_keys = assets::catalog::delete_rows(&mut tx, &orphaned).await?;
  tx.commit().await?;
  assets::catalog::remove_blobs(app_state.blobs.as_ref(), &blob_keys).await;

  info!(replaced_assets = orphaned.len(), "Product updated.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Product updated.", "product_id": p.product_id })))
}

#[instrument(name = "handler::delete_product", skip(app_state, _manager))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let mut tx = app_state.db_pool.begin().await?;
  let deleted = db::products::delete(&mut tx, product_id).await?;
  let mut blob_keys = assets::catalog::delete_rows(&mut tx, &deleted.asset_ids).await?;
  tx.commit().await?;
  blob_keys.extend(deleted.blob_keys);
  assets::catalog::remove_blobs(app_state.blobs.as_ref(), &blob_keys).await;

  info!(product_id, assets = deleted.asset_ids.len(), "Product deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Product deleted." })))
}
