use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::instrument;

use crate::errors::AppError;
use crate::pipelines::contexts::FeedbackCtxData;
use crate::state::AppState;
use crate::web::guards::MaybeUser;
use crate::web::responses::notice;
use crate::web::session;

#[derive(Deserialize, Debug)]
pub struct FeedbackForm {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub message: String,
}

pub async fn feedback_form_handler(user: MaybeUser, session: Session) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "user": user.0,
    "cartCount": session::load_cart(&session).item_count(),
  }))
}

#[instrument(name = "handler::feedback", skip(app_state, form), fields(subject = %form.subject))]
pub async fn feedback_handler(
  app_state: web::Data<AppState>,
  form: web::Form<FeedbackForm>,
) -> Result<HttpResponse, AppError> {
  let form = form.into_inner();
  let ctx_data = ContextData::new(FeedbackCtxData {
    app_state: app_state.get_ref().clone(),
    name: form.name,
    email: form.email,
    subject: form.subject,
    message: form.message,
    mail: None,
    sent: false,
  });

  match app_state.flows.run(ctx_data).await? {
    PipelineResult::Completed => Ok(notice(
      "Thank you for your feedback! We will get back to you soon.",
      "/",
    )),
    PipelineResult::Stopped => Err(AppError::Internal("Feedback was halted.".to_string())),
  }
}
