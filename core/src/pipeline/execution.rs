use tracing::{event, info_span, instrument, Instrument, Level};

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::step::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Walks the steps in order, running each step's `before`, `on` and `after`
  /// handlers in registration order.
  ///
  /// The first handler error aborts the run and is returned as is. A `Stop` from
  /// any handler ends the run with [`PipelineResult::Stopped`].
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(context = %std::any::type_name::<TData>(), steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    for (index, step) in self.steps.iter().enumerate() {
      let name = step.name.as_str();

      if let Some(skip_if) = &step.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step = name, "step skipped");
          continue;
        }
      }

      let phases = [self.before.get(name), self.on.get(name), self.after.get(name)];
      let has_handlers = phases.iter().flatten().any(|handlers| !handlers.is_empty());
      if !has_handlers {
        if step.optional {
          continue;
        }
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step.name.clone(),
        }));
      }

      let span = info_span!("pipeline_step", step = name, index);
      let control = run_handlers(&phases, &ctx_data).instrument(span).await?;
      if control == PipelineControl::Stop {
        event!(Level::INFO, step = name, "pipeline stopped");
        return Ok(PipelineResult::Stopped);
      }
    }

    Ok(PipelineResult::Completed)
  }
}

async fn run_handlers<TData, Err>(
  phases: &[Option<&Vec<Handler<TData, Err>>>],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler in phases.iter().flatten().flat_map(|handlers| handlers.iter()) {
    match handler(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
      Err(e) => {
        event!(Level::WARN, error = %e, "step handler failed");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}
