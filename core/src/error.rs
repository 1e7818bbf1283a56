// hearth-flow/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("step not found in pipeline '{pipeline}': {step_name}")]
  StepNotFound { pipeline: String, step_name: String },

  #[error("step '{step_name}' is already defined in pipeline '{pipeline}'")]
  DuplicateStep { pipeline: String, step_name: String },

  #[error("handler missing for required step '{step_name}' in pipeline '{pipeline}'")]
  HandlerMissing { pipeline: String, step_name: String },

  #[error("no pipeline registered for context type {type_name}")]
  NotRegistered { type_name: &'static str },

  #[error("context type mismatch, expected {expected_type}")]
  TypeMismatch { expected_type: &'static str },

  #[error("handler failed: {source}")]
  Handler {
    #[source]
    source: anyhow::Error,
  },
}

impl From<anyhow::Error> for FlowError {
  fn from(source: anyhow::Error) -> Self {
    FlowError::Handler { source }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
