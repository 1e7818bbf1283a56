// hearth-server/src/pipelines/signin_pipeline.rs

use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{debug, info, warn};

pub fn register_signin_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(
    "signin",
    &[
      ("validate_credentials_input", false, None),
      ("prune_expired_sessions", true, None),
      ("authenticate_user", false, None),
      ("create_session", false, None),
    ],
  );

  p.on("validate_credentials_input", |ctx_data: ContextData<SigninCtxData>| async move {
    let guard = ctx_data.read();
    if guard.identifier.trim().is_empty() || guard.password.is_empty() {
      return Err(AppError::Validation("Username and password are required.".into()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("prune_expired_sessions", |ctx_data: ContextData<SigninCtxData>| async move {
    let pool = ctx_data.read().app_state.db_pool.clone();
    let pruned = db::sessions::prune_expired(&pool).await?;
    if pruned > 0 {
      debug!(pruned, "Expired sessions pruned.");
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("authenticate_user", authenticate_user);

  p.on("create_session", |ctx_data: ContextData<SigninCtxData>| async move {
    let (pool, ttl_hours, user_id) = {
      let guard = ctx_data.read();
      (
        guard.app_state.db_pool.clone(),
        guard.app_state.config.session_ttl_hours,
        guard.user.as_ref().map(|u| u.id),
      )
    };
    let user_id = user_id.ok_or_else(|| AppError::Internal("No authenticated user in signin context.".into()))?;
    let session = auth_service::open_session(&pool, user_id, ttl_hours).await?;
    ctx_data.write().session = Some(session);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  registry.register(p);
  info!("Signin pipeline registered.");
}

async fn authenticate_user(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (pool, identifier, password) = {
    let guard = ctx_data.read();
    (
      guard.app_state.db_pool.clone(),
      guard.identifier.trim().to_string(),
      guard.password.clone(),
    )
  };

  let rejected = || AppError::Auth("Invalid username or password.".into());
  let user = db::users::find_by_identifier(&pool, &identifier).await?.ok_or_else(|| {
    debug!(%identifier, "Unknown login identifier.");
    rejected()
  })?;
  if !user.is_active {
    warn!(user_id = user.id, "Login attempt on inactive account.");
    return Err(rejected());
  }
  if !auth_service::verify_password(&user.password_hash, &password)? {
    debug!(user_id = user.id, "Password mismatch on login.");
    return Err(rejected());
  }

  info!(user_id = user.id, "User authenticated.");
  ctx_data.write().user = Some(user);
  Ok(PipelineControl::Continue)
}
