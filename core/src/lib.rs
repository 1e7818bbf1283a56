// hearth-flow/src/lib.rs

//! hearth-flow: async, type-safe step pipelines.
//!
//! A pipeline is an ordered list of named steps. Each step carries `before`,
//! `on` and `after` handlers that receive a shared [`ContextData`] and return
//! a [`PipelineControl`]. Steps can be optional or skipped by a predicate,
//! and pipelines are dispatched by context type through a [`FlowRegistry`].
//!
//! ```ignore
//! let mut p = Pipeline::<Ctx, MyError>::new("signup", &[("validate", false, None), ("persist", false, None)]);
//! p.on("validate", |ctx| Box::pin(async move { Ok::<_, MyError>(PipelineControl::Continue) }));
//! registry.register(p);
//! registry.run(ContextData::new(ctx)).await?;
//! ```

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{Phase, PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::definition::{Handler, Pipeline};
pub use crate::registry::FlowRegistry;
