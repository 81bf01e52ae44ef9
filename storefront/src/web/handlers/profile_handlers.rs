use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::ProfileUpdate;
use crate::state::AppState;
use crate::web::guards::CurrentUser;
use crate::web::responses::redirect;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldForm {
  pub field: String,
  #[serde(default)]
  pub value: String,
  #[serde(default)]
  pub card_number: Option<String>,
}

#[instrument(name = "handler::profile", skip(app_state), fields(user_id = %user.0.id))]
pub async fn profile_handler(app_state: web::Data<AppState>, user: CurrentUser) -> Result<HttpResponse, AppError> {
  let store = &app_state.store;
  let account = store
    .find_user(user.0.id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
  let orders = store.orders_for_user(account.id).await?;
  let collections = store.list_collections().await?;

  Ok(HttpResponse::Ok().json(json!({
    "user": {
      "id": account.id,
      "username": account.username,
      "email": account.email,
      "address": account.address,
      "phone": account.phone,
      "paymentMethod": account.payment_method,
      "cardNumber": account.masked_card_number(),
      "role": account.role,
    },
    "orders": orders,
    "collections": collections,
  })))
}

#[instrument(name = "handler::update_profile_field", skip(app_state, form), fields(user_id = %user.0.id, field = %form.field))]
pub async fn update_field_handler(
  app_state: web::Data<AppState>,
  user: CurrentUser,
  form: web::Form<UpdateFieldForm>,
) -> Result<HttpResponse, AppError> {
  let form = form.into_inner();
  let update = ProfileUpdate::parse(&form.field, form.value, form.card_number)?;
  app_state.store.update_profile(user.0.id, update).await?;
  info!("Profile field updated.");
  Ok(redirect("/profile"))
}
