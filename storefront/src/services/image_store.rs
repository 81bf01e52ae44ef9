use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::AppError;

#[async_trait]
pub trait ImageStore: Send + Sync {
  /// Persists one upload and returns the public path stored on the product, e.g. `images/3f2c….jpg`.
  async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, AppError>;
}

/// Writes uploads under a local directory with random file names.
pub struct FsImageStore {
  dir: PathBuf,
}

impl FsImageStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }
}

/// Keeps a short alphanumeric extension from the uploaded name; anything else becomes `bin`.
pub fn file_extension(original_name: Option<&str>) -> String {
  original_name
    .and_then(|name| name.rsplit_once('.'))
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .unwrap_or_else(|| "bin".to_string())
}

#[async_trait]
impl ImageStore for FsImageStore {
  #[instrument(name = "FsImageStore::save", skip(self, bytes), fields(size = bytes.len()), err(Display))]
  async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
    let file_name = format!("{}.{}", Uuid::new_v4().simple(), file_extension(original_name));
    tokio::fs::create_dir_all(&self.dir).await?;
    tokio::fs::write(self.dir.join(&file_name), bytes).await?;
    debug!(file = %file_name, "Image stored.");
    Ok(format!("images/{file_name}"))
  }
}
