// hearth-server/src/web/handlers/auth_handlers.rs

use actix_web::cookie::Cookie;
use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::run_pipeline;
use crate::assets::catalog::remove_blobs;
use crate::db;
use crate::db::users::ProfileChanges;
use crate::errors::AppError;
use crate::models::{Role, Session, User};
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::extractors::{Admin, AuthenticatedUser, Customer, MaybeUser, SESSION_COOKIE, USERNAME_COOKIE};
use crate::web::files;

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
  pub username: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub phone_no: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  pub identifier: String,
  pub password: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct ProfileUpdatePayload {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub username: Option<String>,
  pub email: Option<String>,
  pub phone_no: Option<String>,
  pub gender: Option<String>,
  pub date_of_birth: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChangePasswordPayload {
  pub current_password: String,
  pub new_password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginTokenPayload {
  pub token: String,
}

fn session_cookie(token: &str) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token.to_string()).path("/").http_only(true).finish()
}

fn username_cookie(username: &str) -> Cookie<'static> {
  Cookie::build(USERNAME_COOKIE, username.to_string()).path("/").finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
  let mut cookie = Cookie::build(name, "").path("/").finish();
  cookie.make_removal();
  cookie
}

fn logged_in_response(user: &User, session: &Session) -> HttpResponse {
  HttpResponse::Ok()
    .cookie(session_cookie(&session.token))
    .cookie(username_cookie(&user.username))
    .json(json!({
      "message": "Login successful.",
      "token": session.token,
      "is_admin": user.role == Role::Admin,
      "is_staff": user.role == Role::Staff,
    }))
}

async fn register_account(app_state: &AppState, role: Role, payload: RegisterPayload) -> Result<User, AppError> {
  let ctx = run_pipeline(
    app_state,
    SignupCtxData {
      app_state: app_state.clone(),
      role,
      username: payload.username,
      password: payload.password,
      first_name: payload.first_name,
      last_name: payload.last_name,
      email: payload.email,
      phone_no: payload.phone_no,
      created_user: None,
    },
  )
  .await?;
  ctx.created_user.ok_or_else(|| {
    warn!("Signup pipeline completed but no user was recorded.");
    AppError::Internal("Signup completed without creating a user.".into())
  })
}

fn created_response(user: &User) -> HttpResponse {
  HttpResponse::Created().cookie(username_cookie(&user.username)).json(json!({
    "message": "User registered successfully.",
    "user_id": user.id,
    "username": user.username,
    "role": user.role,
  }))
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(username = %payload.username))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let user = register_account(&app_state, Role::Customer, payload.into_inner()).await?;
  Ok(created_response(&user))
}

#[instrument(name = "handler::register_staff", skip_all, fields(admin_id = admin.0.id()))]
pub async fn register_staff_handler(
  app_state: web::Data<AppState>,
  admin: Admin,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let mut payload = payload.into_inner();
  payload.phone_no = None;
  let user = register_account(&app_state, Role::Staff, payload).await?;
  Ok(created_response(&user))
}

/// The first admin may register without a session; later ones need an admin.
#[instrument(name = "handler::register_admin", skip_all)]
pub async fn register_admin_handler(
  app_state: web::Data<AppState>,
  current: MaybeUser,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  if db::users::admin_exists(&app_state.db_pool).await? {
    let is_admin = current.0.as_ref().is_some_and(|u| u.user.role == Role::Admin);
    if !is_admin {
      return Err(AppError::Forbidden("Only admins can register admins.".into()));
    }
  }
  let mut payload = payload.into_inner();
  payload.phone_no = None;
  let user = register_account(&app_state, Role::Admin, payload).await?;
  Ok(created_response(&user))
}

#[instrument(name = "handler::login", skip(app_state, current, payload), fields(identifier = %payload.identifier))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  current: MaybeUser,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  if current.0.is_some() {
    return Err(AppError::Forbidden("Already logged in.".into()));
  }
  let payload = payload.into_inner();
  let ctx = run_pipeline(
    &app_state,
    SigninCtxData {
      app_state: app_state.get_ref().clone(),
      identifier: payload.identifier,
      password: payload.password,
      user: None,
      session: None,
    },
  )
  .await?;
  match (ctx.user, ctx.session) {
    (Some(user), Some(session)) => {
      info!(user_id = user.id, "Login successful.");
      Ok(logged_in_response(&user, &session))
    }
    _ => Err(AppError::Internal("Signin completed without a session.".into())),
  }
}

pub async fn is_logged_in_handler(req: HttpRequest, current: MaybeUser) -> HttpResponse {
  match current.0 {
    Some(auth) => HttpResponse::Ok().json(json!({ "logged_in": true, "username": auth.user.username })),
    None => {
      let remembered = req.cookie(USERNAME_COOKIE).map(|c| c.value().to_string());
      HttpResponse::Ok().json(json!({ "logged_in": false, "username": remembered }))
    }
  }
}

#[instrument(name = "handler::logout", skip_all, fields(user_id = auth.id()))]
pub async fn logout_handler(app_state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  db::sessions::delete(&app_state.db_pool, &auth.token).await?;
  Ok(
    HttpResponse::Ok()
      .cookie(removal_cookie(SESSION_COOKIE))
      .cookie(removal_cookie(USERNAME_COOKIE))
      .json(json!({ "message": "Logged out." })),
  )
}

/// Deletes the account and everything hanging off it, then the blobs that
/// belonged to it.
#[instrument(name = "handler::delete_account", skip_all, fields(user_id = auth.id()))]
pub async fn delete_account_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user_id = auth.id();
  let mut tx = app_state.db_pool.begin().await?;
  let home_models = db::homes::model_ids_for_customer(&mut *tx, user_id).await?;
  let reviewed = db::reviews::reviewed_product_ids(&mut *tx, user_id).await?;
  let mut blob_keys = db::users::owned_blob_keys(&mut tx, user_id).await?;
  if !db::users::delete(&mut tx, user_id).await? {
    return Err(AppError::not_found("User"));
  }
  for product_id in reviewed {
    db::reviews::refresh_product_rating(&mut tx, product_id).await?;
  }
  blob_keys.extend(crate::assets::catalog::delete_rows(&mut tx, &home_models).await?);
  tx.commit().await?;

  remove_blobs(app_state.blobs.as_ref(), &blob_keys).await;
  info!(user_id, blobs = blob_keys.len(), "Account deleted.");
  Ok(
    HttpResponse::Ok()
      .cookie(removal_cookie(SESSION_COOKIE))
      .cookie(removal_cookie(USERNAME_COOKIE))
      .json(json!({ "message": "Account deleted." })),
  )
}

#[instrument(name = "handler::profile", skip_all, fields(user_id = auth.id()))]
pub async fn profile_handler(app_state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let user = &auth.user;
  let mut body = json!({
    "username": user.username,
    "first_name": user.first_name,
    "last_name": user.last_name,
    "email": user.email,
    "is_admin": user.role == Role::Admin,
    "is_staff": user.role == Role::Staff,
  });
  if let Some(profile) = db::users::customer_profile(&app_state.db_pool, user.id).await? {
    body["phone_no"] = json!(profile.phone_no);
    body["gender"] = json!(profile.gender);
    body["date_of_birth"] = json!(profile.date_of_birth);
    body["has_profile_picture"] = json!(profile.profile_picture_key.is_some());
  }
  Ok(HttpResponse::Ok().json(body))
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(name = "handler::update_profile", skip_all, fields(user_id = auth.id()))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  payload: web::Json<ProfileUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let user_id = auth.id();

  let date_of_birth = match non_blank(payload.date_of_birth) {
    Some(raw) => Some(
      NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Date of birth must be formatted YYYY-MM-DD.".into()))?,
    ),
    None => None,
  };
  let changes = ProfileChanges {
    first_name: non_blank(payload.first_name),
    last_name: non_blank(payload.last_name),
    username: non_blank(payload.username),
    email: non_blank(payload.email).map(|e| e.to_lowercase()),
    phone_no: non_blank(payload.phone_no),
    gender: non_blank(payload.gender),
    date_of_birth,
  };

  if let Some(email) = &changes.email {
    if !email.contains('@') {
      return Err(AppError::Validation("A valid email is required.".into()));
    }
    if db::users::email_taken(&app_state.db_pool, email, Some(user_id)).await? {
      return Err(AppError::Conflict("Email already exists.".into()));
    }
  }
  if let Some(username) = &changes.username {
    if db::users::username_taken(&app_state.db_pool, username, Some(user_id)).await? {
      return Err(AppError::Conflict("Username already exists.".into()));
    }
  }

  let mut tx = app_state.db_pool.begin().await?;
  db::users::update_profile(&mut tx, user_id, &changes).await?;
  tx.commit().await?;

  let mut response = HttpResponse::Ok();
  if let Some(username) = &changes.username {
    response.cookie(username_cookie(username));
  }
  Ok(response.json(json!({ "message": "Profile updated." })))
}

#[instrument(name = "handler::upload_profile_picture", skip_all, fields(user_id = customer.0.id(), len = body.len()))]
pub async fn upload_profile_picture_handler(
  app_state: web::Data<AppState>,
  customer: Customer,
  req: HttpRequest,
  body: Bytes,
) -> Result<HttpResponse, AppError> {
  let content_type = files::picture_content_type(&req)?;
  let body = files::checked_body(body, app_state.config.max_profile_picture_bytes, "profile picture")?;
  let blobs = app_state.blobs.as_ref();

  let key = format!("profile/{}", Uuid::new_v4());
  blobs.put(&key, &body).await?;
  let replaced = {
    let mut conn = app_state.db_pool.acquire().await?;
    db::users::set_profile_picture(&mut conn, customer.0.id(), &key, &content_type).await
  };
  match replaced {
    Ok(previous) => {
      remove_blobs(blobs, &previous.into_iter().collect::<Vec<_>>()).await;
      Ok(HttpResponse::Ok().json(json!({ "message": "Profile picture updated." })))
    }
    Err(e) => {
      remove_blobs(blobs, &[key]).await;
      Err(e)
    }
  }
}

pub async fn profile_picture_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let profile = db::users::customer_profile(&app_state.db_pool, auth.id()).await?;
  let (key, content_type) = profile
    .and_then(|p| Some((p.profile_picture_key?, p.profile_picture_type.unwrap_or_default())))
    .ok_or_else(|| AppError::not_found("Profile picture"))?;
  let bytes = app_state
    .blobs
    .get(&key)
    .await?
    .ok_or_else(|| AppError::not_found("Profile picture"))?;
  Ok(files::inline(&content_type, bytes))
}

/// Changing the password signs the user out everywhere.
#[instrument(name = "handler::change_password", skip_all, fields(user_id = auth.id()))]
pub async fn change_password_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  payload: web::Json<ChangePasswordPayload>,
) -> Result<HttpResponse, AppError> {
  if !auth_service::verify_password(&auth.user.password_hash, &payload.current_password)? {
    return Err(AppError::Forbidden("Current password is incorrect.".into()));
  }
  if payload.new_password.len() < auth_service::MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      auth_service::MIN_PASSWORD_LEN
    )));
  }
  let hash = auth_service::hash_password(&payload.new_password)?;
  db::users::update_password(&app_state.db_pool, auth.id(), &hash).await?;
  let revoked = db::sessions::delete_for_user(&app_state.db_pool, auth.id()).await?;
  info!(revoked, "Password changed; sessions revoked.");
  Ok(
    HttpResponse::Ok()
      .cookie(removal_cookie(SESSION_COOKIE))
      .json(json!({ "message": "Password changed. Please log in again." })),
  )
}

#[instrument(name = "handler::login_token", skip_all, fields(user_id = auth.id()))]
pub async fn login_token_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let ttl = app_state.config.login_token_ttl_secs;
  let token = auth_service::issue_login_token(&app_state.db_pool, auth.id(), ttl).await?;
  Ok(HttpResponse::Ok().json(json!({ "token": token, "expires_in": ttl })))
}

#[instrument(name = "handler::verify_login_token", skip_all)]
pub async fn verify_login_token_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginTokenPayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = auth_service::redeem_login_token(&app_state.db_pool, payload.token.trim()).await?;
  let user = db::users::find_by_id(&app_state.db_pool, user_id)
    .await?
    .filter(|u| u.is_active)
    .ok_or_else(|| AppError::Auth("Account is no longer active.".into()))?;
  let session = auth_service::open_session(&app_state.db_pool, user.id, app_state.config.session_ttl_hours).await?;
  Ok(logged_in_response(&user, &session))
}
