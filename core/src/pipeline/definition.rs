// hearth-flow/src/pipeline/definition.rs

//! `Pipeline<TData, Err>` and its structural editing.

use crate::core::context_data::ContextData;
use crate::core::control::{Phase, PipelineControl};
use crate::core::step::{SkipCondition, StepDef};
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed async step handler.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>> + Send + Sync,
>;

/// Ordered steps over a context `TData`. Handler errors are `Err`, which must
/// be able to carry the engine's own [`FlowError`].
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) handlers: HashMap<(String, Phase), Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let name = name.into();
    let mut pipeline = Self {
      name,
      steps: Vec::with_capacity(step_defs.len()),
      handlers: HashMap::new(),
    };
    for (step, optional, skip_if) in step_defs {
      pipeline.ensure_step_not_exists(step);
      pipeline.steps.push(StepDef::new(*step, *optional, skip_if.clone()));
    }
    pipeline
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Number of handlers registered for a step across all phases.
  pub fn handler_count(&self, step_name: &str) -> usize {
    Phase::ALL
      .iter()
      .filter_map(|phase| self.handlers.get(&(step_name.to_string(), *phase)))
      .map(Vec::len)
      .sum()
  }

  fn position_of(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Wiring a handler to a step that does not exist is a programming error,
  /// so this panics instead of returning a `FlowError`.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) -> usize {
    match self.position_of(step_name) {
      Some(idx) => idx,
      None => panic!("pipeline '{}': step '{}' is not defined", self.name, step_name),
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.position_of(step_name).is_some() {
      panic!("pipeline '{}': step '{}' is already defined", self.name, step_name);
    }
  }

  fn checked_insert_position(&self, existing_step_name: &str, new_step_name: &str) -> FlowResult<usize> {
    let idx = self.position_of(existing_step_name).ok_or_else(|| FlowError::StepNotFound {
      pipeline: self.name.clone(),
      step_name: existing_step_name.to_string(),
    })?;
    if self.position_of(new_step_name).is_some() {
      return Err(FlowError::DuplicateStep {
        pipeline: self.name.clone(),
        step_name: new_step_name.to_string(),
      });
    }
    Ok(idx)
  }

  /// Adds a step in front of `existing_step_name`. The pipeline is left
  /// unchanged when the anchor is missing or the new name is taken.
  pub fn insert_before_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let name: String = new_step_name.into();
    let idx = self.checked_insert_position(existing_step_name, &name)?;
    self.steps.insert(idx, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let name: String = new_step_name.into();
    let idx = self.checked_insert_position(existing_step_name, &name)?;
    self.steps.insert(idx + 1, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  /// Removes a step and its handlers. Returns whether the step existed.
  pub fn remove_step(&mut self, step_name: &str) -> bool {
    let Some(idx) = self.position_of(step_name) else {
      return false;
    };
    self.steps.remove(idx);
    self.handlers.retain(|(step, _), _| step != step_name);
    true
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) {
    let idx = self.ensure_step_exists(step_name);
    self.steps[idx].optional = optional;
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let idx = self.ensure_step_exists(step_name);
    self.steps[idx].skip_if = skip_if;
  }
}
