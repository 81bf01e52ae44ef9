use std::sync::Arc;

use shopflow::Registry;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::image_store::ImageStore;
use crate::services::mailer::Mailer;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub mailer: Arc<dyn Mailer>,
  pub images: Arc<dyn ImageStore>,
}

impl AppState {
  /// Builds the state and registers every business pipeline on a fresh registry.
  pub fn new(
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
    mailer: Arc<dyn Mailer>,
    images: Arc<dyn ImageStore>,
  ) -> Self {
    let flows = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    Self {
      store,
      flows,
      config,
      mailer,
      images,
    }
  }

  pub fn payment_window(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.config.payment_window_minutes)
  }
}
