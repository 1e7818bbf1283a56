// hearth-server/src/pipelines/mod.rs

//! Multi-step workflows, each registered once in the shared [`FlowRegistry`]
//! under its context type.

use crate::errors::AppError;
use hearth_flow::FlowRegistry;

pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod home_pipeline;
pub mod order_pipeline;
pub mod placement_pipeline;
pub mod product_pipeline;
pub mod review_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

pub fn register_all_pipelines(registry: &FlowRegistry<AppError>) {
  signup_pipeline::register_signup_pipeline(registry);
  signin_pipeline::register_signin_pipeline(registry);
  product_pipeline::register_product_creation_pipeline(registry);
  cart_pipeline::register_add_to_cart_pipeline(registry);
  checkout_pipeline::register_checkout_pipeline(registry);
  order_pipeline::register_order_completion_pipeline(registry);
  review_pipeline::register_review_pipeline(registry);
  home_pipeline::register_home_creation_pipeline(registry);
  placement_pipeline::register_placement_pipeline(registry);
  tracing::info!(pipelines = registry.len(), "All application pipelines registered.");
}
