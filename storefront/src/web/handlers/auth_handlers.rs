use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::user::VISA_CARD;
use crate::models::{Role, SessionUser};
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::remember;
use crate::state::AppState;
use crate::web::remember_me::{remember_cookie, removal_cookie};
use crate::web::responses::{notice, redirect};
use crate::web::session;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
  pub username: String,
  pub password: String,
  pub confirm_password: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub address: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub payment_method: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginForm {
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub remember: Option<String>,
}

impl LoginForm {
  fn wants_remember(&self) -> bool {
    matches!(self.remember.as_deref(), Some("on" | "true" | "1" | "yes"))
  }
}

pub async fn register_form_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "form": "register",
    "paymentMethods": [VISA_CARD, "Cash on Delivery"],
  }))
}

#[instrument(name = "handler::register", skip(app_state, form), fields(username = %form.username))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  form: web::Form<RegisterForm>,
) -> Result<HttpResponse, AppError> {
  let form = form.into_inner();
  let ctx_data = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    username: form.username,
    password: form.password,
    confirm_password: form.confirm_password,
    email: form.email,
    address: form.address,
    phone: form.phone,
    payment_method: form.payment_method,
    password_hash: None,
    created_user: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let user_id = ctx_data
        .read()
        .created_user
        .as_ref()
        .map(|u| u.id)
        .ok_or_else(|| AppError::Internal("signup completed without a user".to_string()))?;
      info!(%user_id, "Registration complete.");
      Ok(notice("Registration successful! Please log in.", "/login"))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Signup pipeline stopped without an error.");
      Err(AppError::Internal("Registration was halted.".to_string()))
    }
    Err(e) => Err(e),
  }
}

pub async fn login_form_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "form": "login", "error": null }))
}

#[instrument(name = "handler::login", skip(app_state, session, form), fields(username = %form.username))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  session: Session,
  form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
  let form = form.into_inner();
  let wants_remember = form.wants_remember();
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    username: form.username,
    password: form.password,
    candidate: None,
    authenticated: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {}
    PipelineResult::Stopped => {
      return Err(AppError::Auth("Authentication was unexpectedly halted.".to_string()));
    }
  }

  let user = ctx_data
    .read()
    .authenticated
    .as_ref()
    .map(SessionUser::from)
    .ok_or_else(|| AppError::Internal("signin completed without a user".to_string()))?;

  session.renew();
  session::store_user(&session, &user)?;

  let destination = if user.role == Role::Admin { "/admin" } else { "/" };
  let mut response = redirect(destination);
  if wants_remember {
    let config = &app_state.config;
    let token = remember::issue(
      user.id,
      config.session_secret.as_bytes(),
      Utc::now(),
      Duration::days(config.remember_me_days),
    )
    .map_err(|e| AppError::Internal(format!("remember-me token: {e}")))?;
    response
      .add_cookie(&remember_cookie(config, token))
      .map_err(|e| AppError::Internal(format!("remember-me cookie: {e}")))?;
  }
  Ok(response)
}

#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(session: Session) -> Result<HttpResponse, AppError> {
  if let Ok(Some(user)) = session::current_user(&session) {
    info!(user_id = %user.id, "User logged out.");
  }
  session.purge();
  let mut response = redirect("/");
  response
    .add_cookie(&removal_cookie())
    .map_err(|e| AppError::Internal(format!("remember-me cookie: {e}")))?;
  Ok(response)
}
