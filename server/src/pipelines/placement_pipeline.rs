// hearth-server/src/pipelines/placement_pipeline.rs

use crate::assets;
use crate::db;
use crate::db::homes::Placement;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{AssetKind, Transform};
use crate::pipelines::contexts::PlacementCtxData;
use hearth_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

pub fn register_placement_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<PlacementCtxData, AppError>::new(
    "placement",
    &[
      ("validate_placement_vectors", false, None),
      ("verify_ownership", false, None),
      ("check_link_rules", false, None),
      ("check_textures", false, None),
      ("write_placements", false, None),
    ],
  );

  p.on("validate_placement_vectors", |ctx_data: ContextData<PlacementCtxData>| async move {
    let guard = ctx_data.read();
    let mut seen = HashSet::new();
    for req in &guard.requests {
      if !seen.insert(req.owned_item_id) {
        return Err(AppError::Validation(format!("Item {} is listed twice.", req.owned_item_id)));
      }
      let finite = req
        .position
        .iter()
        .chain(&req.rotation)
        .chain(&req.scale)
        .all(|v| v.is_finite());
      if !finite {
        return Err(AppError::Validation("Transform values must be finite numbers.".into()));
      }
      if req.scale.iter().any(|s| *s <= 0.0) {
        return Err(AppError::Validation("Scale components must be greater than zero.".into()));
      }
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("verify_ownership", verify_ownership);

  p.on("check_link_rules", |ctx_data: ContextData<PlacementCtxData>| async move {
    let guard = ctx_data.read();
    for req in &guard.requests {
      let is_container = guard
        .owned
        .get(&req.owned_item_id)
        .map(|o| o.owned.is_container)
        .ok_or_else(|| AppError::Internal("Owned item not loaded.".into()))?;
      if is_container && !req.composition.is_empty() {
        return Err(AppError::Validation(format!(
          "Item {} is a container and cannot have composition items.",
          req.owned_item_id
        )));
      }
      if !is_container && !req.contains.is_empty() {
        return Err(AppError::Validation(format!(
          "Item {} is not a container and cannot contain items.",
          req.owned_item_id
        )));
      }
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("check_textures", check_textures);
  p.on("write_placements", write_placements);

  registry.register(p);
  info!("Placement pipeline registered.");
}

async fn verify_ownership(ctx_data: ContextData<PlacementCtxData>) -> AppResult<PipelineControl> {
  let (pool, customer_id, home_id, requests) = {
    let guard = ctx_data.read();
    (
      guard.app_state.db_pool.clone(),
      guard.customer_id,
      guard.home_id,
      guard.requests.clone(),
    )
  };
  db::homes::owned_home(&pool, customer_id, home_id).await?;

  let mut owned = HashMap::new();
  for req in &requests {
    for child in req.contains.iter().chain(&req.composition) {
      if *child == req.owned_item_id {
        return Err(AppError::Validation(format!("Item {child} cannot reference itself.")));
      }
    }
    let referenced = std::iter::once(&req.owned_item_id).chain(&req.contains).chain(&req.composition);
    for id in referenced {
      if owned.contains_key(id) {
        continue;
      }
      let item = db::homes::find_owned(&pool, *id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Owned item {id} not found.")))?;
      if item.owned.customer_id != customer_id {
        warn!(owned_item_id = id, customer_id, "Placement references another customer's item.");
        return Err(AppError::Forbidden(format!("You do not own item {id}.")));
      }
      owned.insert(*id, item);
    }
  }

  ctx_data.write().owned = owned;
  Ok(PipelineControl::Continue)
}

/// A texture must be one of the textures uploaded for the item's model.
async fn check_textures(ctx_data: ContextData<PlacementCtxData>) -> AppResult<PipelineControl> {
  let (pool, wanted) = {
    let guard = ctx_data.read();
    let wanted: Vec<(i64, i64, Option<i64>)> = guard
      .requests
      .iter()
      .filter_map(|req| {
        let texture_id = req.texture_id?;
        let model_id = guard.owned.get(&req.owned_item_id).and_then(|o| o.item_model_id);
        Some((req.owned_item_id, texture_id, model_id))
      })
      .collect();
    (guard.app_state.db_pool.clone(), wanted)
  };
  if wanted.is_empty() {
    return Ok(PipelineControl::Continue);
  }

  let mut conn = pool.acquire().await?;
  for (owned_item_id, texture_id, model_id) in wanted {
    let texture = assets::catalog::find(&mut conn, texture_id).await?;
    let belongs = texture.is_some_and(|t| t.kind == AssetKind::Texture && t.parent_id.is_some() && t.parent_id == model_id);
    if !belongs {
      return Err(AppError::Validation(format!(
        "Texture {texture_id} does not belong to the model of item {owned_item_id}."
      )));
    }
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "placement::write_placements", skip_all, err(Display))]
async fn write_placements(ctx_data: ContextData<PlacementCtxData>) -> AppResult<PipelineControl> {
  let (pool, home_id, placements) = {
    let guard = ctx_data.read();
    let placements: Vec<Placement> = guard
      .requests
      .iter()
      .map(|req| Placement {
        owned_item_id: req.owned_item_id,
        transform: Transform {
          position: req.position,
          rotation: req.rotation,
          scale: req.scale,
        },
        texture_id: req.texture_id,
        contains: req.contains.clone(),
        composition: req.composition.clone(),
      })
      .collect();
    (guard.app_state.db_pool.clone(), guard.home_id, placements)
  };

  let mut tx = pool.begin().await?;
  for placement in &placements {
    db::homes::place(&mut tx, home_id, placement).await?;
  }
  tx.commit().await?;

  info!(home_id, placed = placements.len(), "Items placed in home.");
  ctx_data.write().placements = placements;
  Ok(PipelineControl::Continue)
}
