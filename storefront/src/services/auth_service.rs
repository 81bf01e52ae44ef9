//! Argon2 password hashing.
//!
//! Both functions are CPU-bound; async callers go through [`hash_password_async`]
//! and [`verify_password_async`], which move the work onto the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::{debug, error, instrument};

use crate::errors::AppError;

#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("password hashing failed: {e}"))
    })
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash is malformed.");
    AppError::Internal(format!("invalid stored password hash: {e}"))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password mismatch.");
      Ok(false)
    }
    Err(e) => Err(AppError::Internal(format!("password verification failed: {e}"))),
  }
}

pub async fn hash_password_async(password: String) -> Result<String, AppError> {
  tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

pub async fn verify_password_async(stored_hash: String, provided_password: String) -> Result<bool, AppError> {
  tokio::task::spawn_blocking(move || verify_password(&stored_hash, &provided_password))
    .await
    .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
}
