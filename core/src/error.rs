use thiserror::Error;

/// Failures raised by the engine itself rather than by application handlers.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("step '{step_name}' is not optional but has no handlers")]
  HandlerMissing { step_name: String },

  #[error("no pipeline registered for context type {type_name}")]
  NotRegistered { type_name: &'static str },

  #[error("context type mismatch: expected {expected_type}")]
  TypeMismatch { expected_type: &'static str },

  #[error("step handler failed: {source}")]
  HandlerError {
    #[source]
    source: anyhow::Error,
  },
}

impl From<anyhow::Error> for FlowError {
  fn from(source: anyhow::Error) -> Self {
    FlowError::HandlerError { source }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
