//! shopflow: async step pipelines over a shared, lock-guarded context.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step carries `before`,
//! `on` and `after` handlers that receive a clone of the run's [`ContextData`],
//! and any handler may halt the run with [`PipelineControl::Stop`]. Pipelines are
//! registered in a [`Registry`] keyed by their context type and dispatched from
//! there.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{Handler, SkipCondition, StepDef};
pub use crate::error::{FlowError, FlowResult};
pub use crate::pipeline::definition::Pipeline;
pub use crate::registry::Registry;
