// tests/context_data_tests.rs
mod common;

use common::*;
use hearth_flow::ContextData;

#[test]
fn clones_share_the_same_data() {
  let original = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned = original.clone();

  original.write().counter = 5;
  assert_eq!(cloned.read().counter, 5);

  cloned.write().counter = 10;
  assert_eq!(original.read().counter, 10);
}

#[test]
fn try_write_fails_while_read_guard_is_alive() {
  let ctx = ContextData::new(TestContext::default());
  let guard = ctx.read();
  assert!(ctx.try_write().is_none());
  assert!(ctx.try_read().is_some());
  drop(guard);
  assert!(ctx.try_write().is_some());
}

#[test]
fn mapped_guards_narrow_to_a_field() {
  let ctx = ContextData::new(TestContext::default());
  ctx.map_write(|c| &mut c.message).push_str("hello");
  assert_eq!(&*ctx.map_read(|c| &c.message), "hello");
}

#[test]
fn into_inner_returns_self_while_shared() {
  let ctx = ContextData::new(TestContext::default());
  let other = ctx.clone();
  let ctx = ctx.into_inner().expect_err("a clone is still alive");
  drop(other);
  assert!(ctx.into_inner().is_ok());
}
