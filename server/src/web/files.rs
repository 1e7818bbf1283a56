// hearth-server/src/web/files.rs

use crate::assets::AssetFile;
use crate::errors::AppError;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse};

/// Serves a stored asset as a download named after the uploaded file.
pub fn attachment(file: AssetFile) -> HttpResponse {
  HttpResponse::Ok()
    .content_type(file.asset.content_type.as_str())
    .insert_header(ContentDisposition {
      disposition: DispositionType::Attachment,
      parameters: vec![DispositionParam::Filename(file.asset.filename.clone())],
    })
    .body(file.bytes)
}

pub fn inline(content_type: &str, bytes: Vec<u8>) -> HttpResponse {
  HttpResponse::Ok().content_type(content_type).body(bytes)
}

/// Accepted picture types for profile and review images.
pub fn picture_content_type(req: &HttpRequest) -> Result<String, AppError> {
  let content_type = req
    .headers()
    .get(actix_web::http::header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
    .unwrap_or_default();
  match content_type.as_str() {
    "image/jpeg" | "image/png" => Ok(content_type),
    "" => Err(AppError::Validation("Picture upload needs a Content-Type header.".into())),
    other => Err(AppError::Validation(format!("Unsupported picture type '{other}'; use JPEG or PNG."))),
  }
}

/// Rejects empty bodies and bodies above `limit` bytes.
pub fn checked_body(body: Bytes, limit: usize, what: &str) -> Result<Bytes, AppError> {
  if body.is_empty() {
    return Err(AppError::Validation(format!("Uploaded {what} is empty.")));
  }
  if body.len() > limit {
    return Err(AppError::PayloadTooLarge(format!("{what} exceeds {limit} bytes.")));
  }
  Ok(body)
}
