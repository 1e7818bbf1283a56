// hearth-flow/src/pipeline/execution.rs

use crate::core::context_data::ContextData;
use crate::core::control::{Phase, PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{debug, info, info_span, warn, Instrument};

/// How a single step ended.
enum StepOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// - a step whose `skip_if` returns true is skipped;
  /// - a required step without handlers fails with [`FlowError::HandlerMissing`];
  /// - `Stop` from any handler ends the run with [`PipelineResult::Stopped`];
  /// - a handler error aborts the run, unless the step is optional, in which
  ///   case it is logged and the run moves on to the next step.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    debug!(pipeline = %self.name, steps = self.steps.len(), "pipeline run starting");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if step_def.should_skip(&ctx_data) {
        debug!(pipeline = %self.name, step = step_name, "step skipped by condition");
        continue;
      }

      if self.handler_count(step_name) == 0 {
        if step_def.optional {
          debug!(pipeline = %self.name, step = step_name, "optional step has no handlers");
          continue;
        }
        return Err(Err::from(FlowError::HandlerMissing {
          pipeline: self.name.clone(),
          step_name: step_def.name.clone(),
        }));
      }

      let span = info_span!("pipeline_step", pipeline = %self.name, step = step_name, index = step_idx);
      match self.run_step(step_name, &ctx_data).instrument(span).await {
        StepOutcome::Continue => {}
        StepOutcome::Stop => {
          info!(pipeline = %self.name, step = step_name, "pipeline stopped");
          return Ok(PipelineResult::Stopped);
        }
        StepOutcome::Failed(e) if step_def.optional => {
          warn!(pipeline = %self.name, step = step_name, error = %e, "optional step failed, continuing");
        }
        StepOutcome::Failed(e) => {
          debug!(pipeline = %self.name, step = step_name, error = %e, "step failed");
          return Err(e);
        }
      }
    }

    debug!(pipeline = %self.name, "pipeline run completed");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_name: &str, ctx_data: &ContextData<TData>) -> StepOutcome<Err> {
    for phase in Phase::ALL {
      let Some(handlers) = self.handlers.get(&(step_name.to_string(), phase)) else {
        continue;
      };
      for handler in handlers {
        match handler(ctx_data.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => return StepOutcome::Stop,
          Err(e) => return StepOutcome::Failed(e),
        }
      }
    }
    StepOutcome::Continue
  }
}
