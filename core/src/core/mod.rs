pub mod context_data;
pub mod control;
pub mod step;

pub use context_data::ContextData;
pub use control::{Phase, PipelineControl, PipelineResult};
pub use step::{SkipCondition, StepDef};
