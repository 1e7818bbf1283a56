// hearth-server/src/web/handlers/home_handlers.rs

use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, instrument};

use super::asset_handlers::{texture_listing, upload, UploadQuery};
use super::run_pipeline;
use crate::assets;
use crate::db;
use crate::errors::AppError;
use crate::models::{AssetKind, DigitalHome, LinkRelation, OwnedItemDetail};
use crate::pipelines::contexts::{HomeCreationCtxData, PlacementCtxData, PlacementRequest};
use crate::state::AppState;
use crate::web::extractors::Customer;
use crate::web::files;

async fn owned_item_json(app_state: &AppState, detail: &OwnedItemDetail) -> Result<Value, AppError> {
  let owned = &detail.owned;
  let contains = db::homes::linked(&app_state.db_pool, owned.id, LinkRelation::Contains).await?;
  let composition = db::homes::linked(&app_state.db_pool, owned.id, LinkRelation::Composition).await?;
  Ok(json!({
    "owned_item_id": owned.id,
    "item_id": owned.item_id,
    "item_name": detail.item_name,
    "category": detail.category,
    "model_id": detail.item_model_id,
    "order_id": owned.order_id,
    "is_container": owned.is_container,
    "home_id": owned.home_id,
    "texture_id": owned.texture_id,
    "transform": owned.transform(),
    "position_history": owned.position_history,
    "contains": contains,
    "composition": composition,
  }))
}

fn home_json(home: &DigitalHome) -> Value {
  json!({
    "home_id": home.id,
    "name": home.name,
    "model_id": home.model_id,
    "transform": home.transform(),
    "boundary": home.boundary(),
    "created_at": home.created_at,
    "updated_at": home.updated_at,
  })
}

pub async fn list_items_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let owned = db::homes::list_owned(&app_state.db_pool, customer.0.id()).await?;
  let mut items = Vec::with_capacity(owned.len());
  for detail in &owned {
    items.push(owned_item_json(&app_state, detail).await?);
  }
  Ok(HttpResponse::Ok().json(json!({ "items": items })))
}

pub async fn get_item_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let owned_item_id = path.into_inner();
  let detail = db::homes::find_owned(&app_state.db_pool, owned_item_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Owned item {owned_item_id} not found.")))?;
  if detail.owned.customer_id != customer.0.id() {
    return Err(AppError::Forbidden("You do not own this item.".into()));
  }
  Ok(HttpResponse::Ok().json(owned_item_json(&app_state, &detail).await?))
}

#[derive(Deserialize, Debug)]
pub struct CreateHomeQuery {
  pub name: String,
  pub filename: Option<String>,
}

#[instrument(name = "handler::create_home", skip_all, fields(customer_id = customer.0.id(), len = body.len()))]
pub async fn create_home_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  query: web::Query<CreateHomeQuery>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let body = files::checked_body(body, app_state.config.max_upload_bytes, "home model")?;
  let ctx = run_pipeline(
    &app_state,
    HomeCreationCtxData {
      app_state: app_state.get_ref().clone(),
      customer_id: customer.0.id(),
      name: query.name,
      filename: query.filename.unwrap_or_default(),
      model_bytes: body,
      bounds: None,
      home: None,
    },
  )
  .await?;
  let home = ctx
    .home
    .ok_or_else(|| AppError::Internal("Home creation completed without a home.".into()))?;
  Ok(HttpResponse::Created().json(json!({ "message": "Digital home created.", "home_id": home.id })))
}

pub async fn list_homes_handler(app_state: web::Data<AppState>, customer: Customer) -> Result<HttpResponse, AppError> {
  let homes = db::homes::list_for_customer(&app_state.db_pool, customer.0.id()).await?;
  let homes: Vec<Value> = homes.iter().map(home_json).collect();
  Ok(HttpResponse::Ok().json(json!({ "homes": homes })))
}

pub async fn get_home_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  let deployed = db::homes::deployed_in(&app_state.db_pool, home.id).await?;
  let mut items = Vec::with_capacity(deployed.len());
  for detail in &deployed {
    items.push(owned_item_json(&app_state, detail).await?);
  }
  let mut body = home_json(&home);
  body["deployed_items"] = Value::Array(items);
  Ok(HttpResponse::Ok().json(body))
}

pub async fn get_home_model_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  let file = assets::catalog::fetch(&app_state.db_pool, app_state.blobs.as_ref(), home.model_id, AssetKind::HomeModel).await?;
  Ok(files::attachment(file))
}

#[instrument(name = "handler::add_home_texture", skip(app_state, customer, req, query, body), fields(len = body.len()))]
pub async fn add_home_texture_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  req: HttpRequest,
  path: web::Path<i64>,
  query: web::Query<UploadQuery>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  let id = upload(
    &app_state,
    &req,
    AssetKind::Texture,
    query.into_inner().filename,
    Some(home.model_id),
    body,
  )
  .await?;
  Ok(HttpResponse::Created().json(json!({ "texture_id": id })))
}

pub async fn list_home_textures_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(texture_listing(&app_state, home.model_id).await?))
}

pub async fn delete_home_textures_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  let texture_ids: Vec<i64> = {
    let mut conn = app_state.db_pool.acquire().await?;
    assets::catalog::children(&mut conn, home.model_id, AssetKind::Texture)
      .await?
      .iter()
      .map(|t| t.id)
      .collect()
  };
  assets::catalog::delete(&app_state.db_pool, app_state.blobs.as_ref(), &texture_ids).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Home textures removed.", "removed": texture_ids.len() })))
}

#[instrument(name = "handler::delete_home", skip(app_state, customer), fields(customer_id = customer.0.id()))]
pub async fn delete_home_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  let keys = {
    let mut tx = app_state.db_pool.begin().await?;
    let model_id = db::homes::delete(&mut tx, home.id).await?;
    let keys = assets::catalog::delete_rows(&mut tx, &[model_id]).await?;
    tx.commit().await?;
    keys
  };
  assets::catalog::remove_blobs(app_state.blobs.as_ref(), &keys).await;
  info!(home_id = home.id, blobs = keys.len(), "Digital home deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Digital home deleted." })))
}

#[derive(Deserialize, Debug)]
pub struct PlacementPayload {
  pub items: Vec<PlacementRequest>,
}

#[instrument(name = "handler::place_items", skip(app_state, customer, payload), fields(customer_id = customer.0.id(), count = payload.items.len()))]
pub async fn place_items_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<i64>,
  payload: web::Json<PlacementPayload>,
) -> Result<HttpResponse, AppError> {
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), path.into_inner()).await?;
  let ctx = run_pipeline(
    &app_state,
    PlacementCtxData {
      app_state: app_state.get_ref().clone(),
      customer_id: customer.0.id(),
      home_id: home.id,
      requests: payload.into_inner().items,
      owned: HashMap::new(),
      placements: Vec::new(),
    },
  )
  .await?;
  let placed: Vec<i64> = ctx.placements.iter().map(|p| p.owned_item_id).collect();
  Ok(HttpResponse::Ok().json(json!({ "message": "Items placed.", "owned_item_ids": placed })))
}

pub async fn undeploy_item_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, AppError> {
  let (home_id, owned_item_id) = path.into_inner();
  let home = db::homes::owned_home(&app_state.db_pool, customer.0.id(), home_id).await?;
  if !db::homes::undeploy(&app_state.db_pool, home.id, owned_item_id).await? {
    return Err(AppError::NotFound(format!(
      "Owned item {owned_item_id} is not deployed in home {home_id}."
    )));
  }
  Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from home." })))
}
