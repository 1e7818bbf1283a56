// tests/error_handling_tests.rs
mod common;

use common::*;
use hearth_flow::{ContextData, Phase, Pipeline, PipelineResult};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn handler_error_aborts_required_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "failing",
    &[("good", false, None), ("bad", false, None), ("never", false, None)],
  );
  pipeline.add_boxed(Phase::On, "good", recording_handler("good", "Good"));
  pipeline.add_boxed(Phase::On, "bad", failing_handler("bad", "boom"));
  pipeline.add_boxed(Phase::On, "never", recording_handler("never", "Never"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Handler("boom".to_string())));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good", "bad"]);
}

#[tokio::test]
#[serial]
async fn optional_step_error_is_logged_and_run_continues() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "housekeeping",
    &[("main", false, None), ("cleanup", true, None), ("tail", false, None)],
  );
  pipeline.add_boxed(Phase::On, "main", recording_handler("main", "M"));
  pipeline.add_boxed(Phase::On, "cleanup", failing_handler("cleanup", "cleanup failed"));
  pipeline.add_boxed(Phase::After, "cleanup", recording_handler("cleanup_after", "X"));
  pipeline.add_boxed(Phase::On, "tail", recording_handler("tail", "T"));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await, Ok(PipelineResult::Completed));

  // The failing step's later handlers are abandoned, the next step still runs.
  assert_eq!(ctx.read().steps_executed, vec!["main", "cleanup", "tail"]);
  assert_eq!(ctx.read().message, "MT");
}

#[tokio::test]
#[serial]
async fn required_step_without_handlers_is_an_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("incomplete", &[("wired", false, None), ("unwired", false, None)]);
  pipeline.add_boxed(Phase::On, "wired", recording_handler("wired", ""));

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Flow(msg)) => {
      assert!(msg.contains("unwired"), "unexpected message: {msg}");
      assert!(msg.contains("incomplete"));
    }
    other => panic!("expected HandlerMissing, got {other:?}"),
  }
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("sparse", &[("maybe", true, None), ("wired", false, None)]);
  pipeline.add_boxed(Phase::On, "wired", recording_handler("wired", ""));

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().steps_executed, vec!["wired"]);
}

#[tokio::test]
#[serial]
async fn set_optional_turns_missing_handler_into_skip() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new("toggle", &[("unwired", false, None)]);
  assert!(pipeline.run(ContextData::new(TestContext::default())).await.is_err());

  pipeline.set_optional("unwired", true);
  assert_eq!(
    pipeline.run(ContextData::new(TestContext::default())).await,
    Ok(PipelineResult::Completed)
  );
}
