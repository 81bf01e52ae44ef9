//! Restores the session user from a valid `remember_user` cookie.

use actix_session::SessionExt;
use actix_web::body::MessageBody;
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::models::SessionUser;
use crate::services::remember::{self, REMEMBER_COOKIE};
use crate::state::AppState;
use crate::web::session;

pub fn remember_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
  Cookie::build(REMEMBER_COOKIE, token)
    .path("/")
    .http_only(true)
    .secure(config.secure_cookies)
    .same_site(SameSite::Lax)
    .max_age(time::Duration::days(config.remember_me_days))
    .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
  let mut cookie = Cookie::build(REMEMBER_COOKIE, "").path("/").finish();
  cookie.make_removal();
  cookie
}

pub async fn restore_remembered_user(
  req: ServiceRequest,
  next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
  let token = req.cookie(REMEMBER_COOKIE).map(|c| c.value().to_string());
  let state = req.app_data::<web::Data<AppState>>().cloned();

  if let (Some(token), Some(state)) = (token, state) {
    let session = req.get_session();
    if matches!(session::current_user(&session), Ok(None)) {
      restore(&session, &state, &token).await;
    }
  }

  next.call(req).await
}

async fn restore(session: &actix_session::Session, state: &AppState, token: &str) {
  let user_id = match remember::verify(token, state.config.session_secret.as_bytes(), Utc::now()) {
    Ok(user_id) => user_id,
    Err(e) => {
      debug!(reason = %e, "Ignoring remember-me cookie.");
      return;
    }
  };

  match state.store.find_user(user_id).await {
    Ok(Some(user)) => match session::store_user(session, &SessionUser::from(&user)) {
      Ok(()) => info!(%user_id, "Session restored from remember-me cookie."),
      Err(e) => warn!(error = %e, "Could not write restored user to session."),
    },
    Ok(None) => debug!(%user_id, "Remember-me cookie names an unknown user."),
    Err(e) => warn!(error = %e, "User lookup for remember-me cookie failed."),
  }
}
