// hearth-server/src/pipelines/signup_pipeline.rs

use crate::db;
use crate::db::users::NewUser;
use crate::errors::{AppError, Result as AppResult};
use crate::models::Role;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{debug, info, instrument, warn};

/// Registers the account registration pipeline, shared by customers, staff
/// and admins; the role decides which fields are mandatory.
pub fn register_signup_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<SignupCtxData, AppError>::new(
    "signup",
    &[
      ("validate_signup_input", false, None),
      ("check_existing_user", false, None),
      ("create_user", false, None),
    ],
  );

  p.on("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| async move {
    let mut guard = ctx_data.write();
    guard.username = guard.username.trim().to_string();
    guard.email = guard.email.take().map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
    guard.phone_no = guard.phone_no.take().map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

    let blank_names = guard.first_name.trim().is_empty() || guard.last_name.trim().is_empty();
    if guard.username.is_empty() || guard.password.is_empty() || blank_names {
      return Err(AppError::Validation("All fields are required.".into()));
    }
    if guard.password.len() < auth_service::MIN_PASSWORD_LEN {
      warn!(len = guard.password.len(), "Password too short for signup.");
      return Err(AppError::Validation(format!(
        "Password must be at least {} characters long.",
        auth_service::MIN_PASSWORD_LEN
      )));
    }
    match (guard.role, guard.email.as_deref()) {
      (Role::Customer | Role::Staff, None) => return Err(AppError::Validation("Email is required.".into())),
      (_, Some(email)) if !email.contains('@') => {
        return Err(AppError::Validation("A valid email is required.".into()))
      }
      _ => {}
    }
    if guard.role == Role::Customer && guard.phone_no.is_none() {
      return Err(AppError::Validation("Phone number is required.".into()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("check_existing_user", check_existing_user);
  p.on("create_user", create_user);

  registry.register(p);
  info!("Signup pipeline registered.");
}

async fn check_existing_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (pool, username, email) = {
    let guard = ctx_data.read();
    (guard.app_state.db_pool.clone(), guard.username.clone(), guard.email.clone())
  };

  if db::users::username_taken(&pool, &username, None).await? {
    return Err(AppError::Conflict("Username already exists.".into()));
  }
  if let Some(email) = email {
    if db::users::email_taken(&pool, &email, None).await? {
      return Err(AppError::Conflict("Email already exists.".into()));
    }
  }
  debug!(%username, "Username and email are free.");
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::create_user", skip_all, err(Display))]
async fn create_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let data = ctx_data.read().clone();
  let password_hash = auth_service::hash_password(&data.password)?;

  let mut tx = data.app_state.db_pool.begin().await?;
  let user = db::users::insert(
    &mut tx,
    &NewUser {
      username: &data.username,
      email: data.email.as_deref(),
      password_hash: &password_hash,
      first_name: data.first_name.trim(),
      last_name: data.last_name.trim(),
      role: data.role,
    },
  )
  .await
  .map_err(|e| {
    if e.is_unique_violation() {
      AppError::Conflict("Username or email already exists.".into())
    } else {
      e
    }
  })?;
  if data.role == Role::Customer {
    db::users::insert_customer_extras(&mut tx, user.id, data.phone_no.as_deref().unwrap_or_default()).await?;
  }
  tx.commit().await?;

  info!(user_id = user.id, role = ?user.role, "User registered.");
  ctx_data.write().created_user = Some(user);
  Ok(PipelineControl::Continue)
}
