// hearth-server/src/state.rs

use crate::assets::BlobStore;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use hearth_flow::FlowRegistry;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: SqlitePool,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
  pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
  /// Builds the shared state and registers every workflow pipeline.
  pub fn new(db_pool: SqlitePool, config: AppConfig, blobs: Arc<dyn BlobStore>) -> Self {
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    Self {
      db_pool,
      flows,
      config: Arc::new(config),
      blobs,
    }
  }
}
