// hearth-server/src/pipelines/home_pipeline.rs

use crate::assets::{self, glb, NewAsset};
use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::AssetKind;
use crate::pipelines::contexts::HomeCreationCtxData;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{debug, info, instrument};

pub fn register_home_creation_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<HomeCreationCtxData, AppError>::new(
    "home_creation",
    &[
      ("validate_home_input", false, None),
      ("compute_home_bounds", false, None),
      ("store_home", false, None),
    ],
  );

  p.on("validate_home_input", |ctx_data: ContextData<HomeCreationCtxData>| async move {
    let mut guard = ctx_data.write();
    guard.name = guard.name.trim().to_string();
    if guard.name.is_empty() {
      return Err(AppError::Validation("Home name is required.".into()));
    }
    if guard.model_bytes.is_empty() {
      return Err(AppError::Validation("Home model file is empty.".into()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("compute_home_bounds", |ctx_data: ContextData<HomeCreationCtxData>| async move {
    let bytes = ctx_data.read().model_bytes.clone();
    let bounds = glb::model_bounds(&bytes)?;
    debug!(min = ?bounds.min, max = ?bounds.max, "Home model bounds computed.");
    ctx_data.write().bounds = Some(bounds);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("store_home", store_home);

  registry.register(p);
  info!("Home creation pipeline registered.");
}

#[instrument(name = "home_creation::store_home", skip_all, err(Display))]
async fn store_home(ctx_data: ContextData<HomeCreationCtxData>) -> AppResult<PipelineControl> {
  let (state, customer_id, name, filename, bytes, bounds) = {
    let guard = ctx_data.read();
    (
      guard.app_state.clone(),
      guard.customer_id,
      guard.name.clone(),
      guard.filename.clone(),
      guard.model_bytes.clone(),
      guard.bounds,
    )
  };
  let bounds = bounds.ok_or_else(|| AppError::Internal("Home bounds not computed.".into()))?;
  let blobs = state.blobs.as_ref();

  let mut tx = state.db_pool.begin().await?;
  let model = assets::catalog::insert(
    &mut tx,
    blobs,
    NewAsset::new(AssetKind::HomeModel, filename).with_content_type(Some("model/gltf-binary".into())),
    &bytes,
  )
  .await?;

  let home = match db::homes::insert(&mut *tx, customer_id, &name, model.id, &bounds).await {
    Ok(home) => home,
    Err(e) => {
      assets::catalog::remove_blobs(blobs, &[model.blob_key]).await;
      return Err(e);
    }
  };
  if let Err(e) = tx.commit().await {
    assets::catalog::remove_blobs(blobs, &[model.blob_key]).await;
    return Err(e.into());
  }

  info!(home_id = home.id, customer_id, model_id = model.id, "Digital home created.");
  ctx_data.write().home = Some(home);
  Ok(PipelineControl::Continue)
}
