// hearth-server/src/web/handlers/mod.rs

use crate::errors::AppError;
use crate::state::AppState;
use hearth_flow::{ContextData, PipelineResult};
use tracing::warn;

pub mod account_handlers;
pub mod asset_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod home_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod review_handlers;

/// Runs the pipeline registered for `T` and hands back the final context.
/// A pipeline stopped by one of its handlers is reported as a conflict.
pub(crate) async fn run_pipeline<T>(app_state: &AppState, data: T) -> Result<T, AppError>
where
  T: Clone + Send + Sync + 'static,
{
  let ctx_data = ContextData::new(data);
  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => Ok(match ctx_data.into_inner() {
      Ok(data) => data,
      Err(shared) => shared.read().clone(),
    }),
    PipelineResult::Stopped => {
      warn!(context = std::any::type_name::<T>(), "Pipeline was stopped by a handler.");
      Err(AppError::PipelineHalted)
    }
  }
}
