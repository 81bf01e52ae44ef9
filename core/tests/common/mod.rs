#![allow(dead_code)]

use once_cell::sync::Lazy;
use shopflow::{ContextData, FlowError, Handler, PipelineControl};
use tracing::Level;

/// A toy fulfilment run: each step appends to `trail` so tests can assert ordering.
#[derive(Clone, Debug, Default)]
pub struct FulfilmentCtx {
  pub trail: Vec<String>,
  pub items_packed: u32,
  pub halt_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine: {0}")]
  Flow(String),

  #[error("handler: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(e: FlowError) -> Self {
    TestError::Flow(format!("{e:?}"))
  }
}

pub fn recording_handler(label: &'static str) -> Handler<FulfilmentCtx, TestError> {
  Box::new(move |ctx: ContextData<FulfilmentCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.trail.push(label.to_string());
      guard.items_packed += 1;
      if guard.halt_at.as_deref() == Some(label) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<FulfilmentCtx, TestError> {
  Box::new(move |ctx: ContextData<FulfilmentCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
