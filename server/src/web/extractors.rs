// hearth-server/src/web/extractors.rs

//! Session-backed request extractors. A session token is read from
//! `Authorization: Bearer <token>` first, then from the `sessionid` cookie.

use crate::db;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

pub const SESSION_COOKIE: &str = "sessionid";
pub const USERNAME_COOKIE: &str = "username";

pub fn session_token(req: &HttpRequest) -> Option<String> {
  let bearer = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty());
  bearer.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty()))
}

/// The user behind a valid, unexpired session. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
  pub token: String,
}

impl AuthenticatedUser {
  pub fn id(&self) -> i64 {
    self.user.id
  }
}

async fn lookup(state: Option<web::Data<AppState>>, token: Option<String>) -> Result<Option<AuthenticatedUser>, AppError> {
  let state = state.ok_or_else(|| AppError::Internal("Application state is not configured.".into()))?;
  let Some(token) = token else {
    return Ok(None);
  };
  let user = db::sessions::find_user(&state.db_pool, &token).await?;
  if user.is_none() {
    debug!("Session token is unknown or expired.");
  }
  Ok(user.map(|user| AuthenticatedUser { user, token }))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = session_token(req);
    Box::pin(async move {
      lookup(state, token)
        .await?
        .ok_or_else(|| AppError::Auth("Login required.".into()))
    })
  }
}

/// Like [`AuthenticatedUser`] but never rejects an anonymous request.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = session_token(req);
    Box::pin(async move { lookup(state, token).await.map(MaybeUser) })
  }
}

macro_rules! role_guard {
  ($(#[$meta:meta])* $name:ident, $allowed:expr, $message:literal) => {
    $(#[$meta])*
    #[derive(Debug, Clone)]
    pub struct $name(pub AuthenticatedUser);

    impl FromRequest for $name {
      type Error = AppError;
      type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

      fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthenticatedUser::from_request(req, payload);
        Box::pin(async move {
          let auth = auth.await?;
          let allowed: fn(Role) -> bool = $allowed;
          if allowed(auth.user.role) {
            Ok($name(auth))
          } else {
            Err(AppError::Forbidden($message.into()))
          }
        })
      }
    }
  };
}

role_guard!(
  /// A logged-in customer; staff and admins are refused.
  Customer,
  |role| role == Role::Customer,
  "Only customers can do this."
);

role_guard!(
  /// Staff or admin, allowed to edit the catalog.
  CatalogManager,
  Role::can_manage_catalog,
  "Only staff or admins can manage the catalog."
);

role_guard!(Admin, |role| role == Role::Admin, "Only admins can do this.");
