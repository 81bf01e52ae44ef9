use shopflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;

const BAD_CREDENTIALS: &str = "Invalid username or password.";

pub fn register_signin_pipeline(flows: &Registry<AppError>) {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_for_signin", false, None),
    ("verify_password_signin", false, None),
  ]);

  p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.username.trim().is_empty() || guard.password.is_empty() {
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_user_for_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (username, store) = {
        let guard = ctx_data.read();
        (guard.username.trim().to_string(), guard.app_state.store.clone())
      };
      let Some(user) = store.find_user_by_username(&username).await? else {
        warn!(%username, "Signin for unknown username.");
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      };
      ctx_data.write().candidate = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("verify_password_signin", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (user, provided) = {
        let mut guard = ctx_data.write();
        let user = guard
          .candidate
          .take()
          .ok_or_else(|| AppError::Internal("signin candidate missing".to_string()))?;
        (user, guard.password.clone())
      };

      if !auth_service::verify_password_async(user.password_hash.clone(), provided).await? {
        warn!(user_id = %user.id, "Signin with wrong password.");
        return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
      }
      info!(user_id = %user.id, role = ?user.role, "User signed in.");
      ctx_data.write().authenticated = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
}
