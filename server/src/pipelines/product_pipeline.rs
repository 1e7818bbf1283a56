// hearth-server/src/pipelines/product_pipeline.rs

use crate::assets;
use crate::db;
use crate::errors::{AppError, Result as AppResult};
use crate::models::AssetKind;
use crate::pipelines::contexts::ProductCreationCtxData;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::info;

pub fn register_product_creation_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<ProductCreationCtxData, AppError>::new(
    "product_creation",
    &[
      ("validate_product_input", false, None),
      ("verify_product_assets", false, None),
      ("insert_product", false, None),
    ],
  );

  p.on("validate_product_input", |ctx_data: ContextData<ProductCreationCtxData>| async move {
    let mut guard = ctx_data.write();
    let product = &mut guard.product;
    product.name = product.name.trim().to_string();
    product.category = product.category.trim().to_string();
    if product.name.is_empty() || product.description.trim().is_empty() || product.category.is_empty() {
      return Err(AppError::Validation("Name, description and category are required.".into()));
    }
    let priced = |p: Option<i64>| p.is_some_and(|c| c > 0);
    if !priced(product.digital_price_cents) && !priced(product.physical_price_cents) {
      return Err(AppError::Validation("At least one price must be greater than zero.".into()));
    }
    if product.digital_price_cents.is_some_and(|c| c < 0) || product.physical_price_cents.is_some_and(|c| c < 0) {
      return Err(AppError::Validation("Prices cannot be negative.".into()));
    }
    if product.stock < 0 {
      return Err(AppError::Validation("Stock cannot be negative.".into()));
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("verify_product_assets", verify_product_assets);

  p.on("insert_product", |ctx_data: ContextData<ProductCreationCtxData>| async move {
    let (pool, product) = {
      let guard = ctx_data.read();
      (guard.app_state.db_pool.clone(), guard.product.clone())
    };
    let mut tx = pool.begin().await?;
    let product_id = db::products::insert(&mut tx, &product).await?;
    tx.commit().await?;
    info!(product_id, name = %product.name, "Product created.");
    ctx_data.write().product_id = Some(product_id);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  registry.register(p);
  info!("Product creation pipeline registered.");
}

/// Every referenced asset must exist with the kind its slot expects.
async fn verify_product_assets(ctx_data: ContextData<ProductCreationCtxData>) -> AppResult<PipelineControl> {
  let (pool, product) = {
    let guard = ctx_data.read();
    (guard.app_state.db_pool.clone(), guard.product.clone())
  };
  let mut conn = pool.acquire().await?;
  assets::catalog::get_of_kind(&mut conn, product.model_id, AssetKind::Model).await?;
  for scene_id in &product.display_scene_ids {
    assets::catalog::get_of_kind(&mut conn, *scene_id, AssetKind::Scene).await?;
  }
  if let Some(image_id) = product.image_id {
    assets::catalog::get_of_kind(&mut conn, image_id, AssetKind::Image).await?;
  }
  Ok(PipelineControl::Continue)
}
