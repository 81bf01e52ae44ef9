use shopflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{event, info, warn, Level};

use crate::errors::AppError;
use crate::models::{NewUser, Role};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;

pub fn register_signup_pipeline(flows: &Registry<AppError>) {
  let mut p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("ensure_username_free", false, None),
    ("hash_password", false, None),
    ("create_user_record", false, None),
  ]);

  p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      event!(Level::DEBUG, username = %guard.username, "Validating registration form.");
      if guard.username.trim().is_empty() || guard.password.is_empty() {
        return Err(AppError::form("Username and password are required.", "/register"));
      }
      if guard.password != guard.confirm_password {
        warn!(username = %guard.username, "Registration rejected: passwords differ.");
        return Err(AppError::form(
          "The two passwords do not match. Please try again.",
          "/register",
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("ensure_username_free", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (username, store) = {
        let guard = ctx_data.read();
        (guard.username.trim().to_string(), guard.app_state.store.clone())
      };
      if store.find_user_by_username(&username).await?.is_some() {
        warn!(%username, "Registration rejected: username taken.");
        return Err(crate::store::duplicate_username(&username));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("hash_password", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let password = ctx_data.read().password.clone();
      let hash = auth_service::hash_password_async(password).await?;
      ctx_data.write().password_hash = Some(hash);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_user_record", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (new_user, store) = {
        let guard = ctx_data.read();
        let password_hash = guard
          .password_hash
          .clone()
          .ok_or_else(|| AppError::Internal("password hash missing at user creation".to_string()))?;
        let new_user = NewUser {
          username: guard.username.trim().to_string(),
          password_hash,
          email: guard.email.clone(),
          address: guard.address.clone(),
          phone: guard.phone.clone(),
          payment_method: guard.payment_method.clone(),
          role: Role::User,
        };
        (new_user, guard.app_state.store.clone())
      };

      // The store enforces uniqueness again for concurrent registrations.
      let user = store.create_user(new_user).await?;
      info!(user_id = %user.id, username = %user.username, "User registered.");
      ctx_data.write().created_user = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
}
