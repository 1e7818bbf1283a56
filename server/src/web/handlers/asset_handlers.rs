// hearth-server/src/web/handlers/asset_handlers.rs

use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::assets::{self, NewAsset};
use crate::errors::AppError;
use crate::models::AssetKind;
use crate::state::AppState;
use crate::web::extractors::CatalogManager;
use crate::web::files;

#[derive(Deserialize, Debug, Default)]
pub struct UploadQuery {
  pub filename: Option<String>,
}

fn request_content_type(req: &HttpRequest) -> Option<String> {
  req
    .headers()
    .get(actix_web::http::header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string)
}

pub(crate) async fn upload(
  app_state: &AppState,
  req: &HttpRequest,
  kind: AssetKind,
  filename: Option<String>,
  parent_id: Option<i64>,
  body: Bytes,
) -> Result<i64, AppError> {
  let body = files::checked_body(body, app_state.config.max_upload_bytes, kind.as_str())?;
  let mut new = NewAsset::new(kind, filename.unwrap_or_default()).with_content_type(request_content_type(req));
  if let Some(parent_id) = parent_id {
    new = new.with_parent(parent_id);
  }
  let asset = assets::catalog::store(&app_state.db_pool, app_state.blobs.as_ref(), new, &body).await?;
  info!(asset_id = asset.id, %kind, size = asset.size_bytes, "Asset uploaded.");
  Ok(asset.id)
}

#[instrument(name = "handler::upload_model", skip_all, fields(len = body.len()))]
pub async fn upload_model_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  req: HttpRequest,
  query: web::Query<UploadQuery>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let id = upload(&app_state, &req, AssetKind::Model, query.into_inner().filename, None, body).await?;
  Ok(HttpResponse::Created().json(json!({ "model_id": id })))
}

#[instrument(name = "handler::upload_texture", skip_all, fields(model_id = *path, len = body.len()))]
pub async fn upload_texture_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  req: HttpRequest,
  path: web::Path<i64>,
  query: web::Query<UploadQuery>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let model_id = path.into_inner();
  {
    let mut conn = app_state.db_pool.acquire().await?;
    assets::catalog::get_of_kind(&mut conn, model_id, AssetKind::Model).await?;
  }
  let id = upload(&app_state, &req, AssetKind::Texture, query.into_inner().filename, Some(model_id), body).await?;
  Ok(HttpResponse::Created().json(json!({ "texture_id": id })))
}

pub async fn upload_scene_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  req: HttpRequest,
  query: web::Query<UploadQuery>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let id = upload(&app_state, &req, AssetKind::Scene, query.into_inner().filename, None, body).await?;
  Ok(HttpResponse::Created().json(json!({ "display_scene_id": id })))
}

pub async fn upload_image_handler(
  app_state: web::Data<AppState>,
  _manager: CatalogManager,
  req: HttpRequest,
  query: web::Query<UploadQuery>,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let id = upload(&app_state, &req, AssetKind::Image, query.into_inner().filename, None, body).await?;
  Ok(HttpResponse::Created().json(json!({ "image_id": id })))
}

async fn download(app_state: &AppState, id: i64, kind: AssetKind) -> Result<HttpResponse, AppError> {
  let file = assets::catalog::fetch(&app_state.db_pool, app_state.blobs.as_ref(), id, kind).await?;
  Ok(files::attachment(file))
}

pub async fn get_model_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  download(&app_state, path.into_inner(), AssetKind::Model).await
}

pub async fn get_texture_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  download(&app_state, path.into_inner(), AssetKind::Texture).await
}

pub async fn get_display_scene_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  download(&app_state, path.into_inner(), AssetKind::Scene).await
}

pub async fn get_image_handler(app_state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
  download(&app_state, path.into_inner(), AssetKind::Image).await
}

/// Texture listing for a product model or a home model.
pub(crate) async fn texture_listing(app_state: &AppState, parent_id: i64) -> Result<serde_json::Value, AppError> {
  let mut conn = app_state.db_pool.acquire().await?;
  let textures = assets::catalog::children(&mut conn, parent_id, AssetKind::Texture).await?;
  let entries: Vec<_> = textures
    .iter()
    .map(|t| {
      json!({
        "texture_id": t.id,
        "filename": t.filename,
        "url": format!("/api/v1/assets/textures/{}", t.id),
      })
    })
    .collect();
  Ok(json!({ "textures": entries }))
}

pub async fn list_model_textures_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let model_id = path.into_inner();
  {
    let mut conn = app_state.db_pool.acquire().await?;
    assets::catalog::get_of_kind(&mut conn, model_id, AssetKind::Model).await?;
  }
  Ok(HttpResponse::Ok().json(texture_listing(&app_state, model_id).await?))
}
