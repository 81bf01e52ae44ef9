use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::models::ProductId;
use crate::state::AppState;
use crate::web::guards::MaybeUser;
use crate::web::session;

#[instrument(name = "handler::home", skip_all)]
pub async fn home_handler(
  app_state: web::Data<AppState>,
  user: MaybeUser,
  session: Session,
) -> Result<HttpResponse, AppError> {
  let collections = app_state.store.catalog().await?;
  Ok(HttpResponse::Ok().json(json!({
    "username": user.0.map(|u| u.username),
    "cartCount": session::load_cart(&session).item_count(),
    "collections": collections,
  })))
}

#[instrument(name = "handler::product_detail", skip(app_state, session))]
pub async fn product_detail_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  session: Session,
) -> Result<HttpResponse, AppError> {
  let product_id = ProductId(path.into_inner());
  let product = app_state
    .store
    .find_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "product": product,
    "cartCount": session::load_cart(&session).item_count(),
  })))
}

pub async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}
