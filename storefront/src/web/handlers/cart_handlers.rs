use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{debug, info, instrument};

use crate::errors::AppError;
use crate::models::cart::{normalize_size, parse_quantity};
use crate::models::{CartAction, ProductId};
use crate::pipelines::contexts::{CheckoutHalt, PlaceOrderCtxData};
use crate::state::AppState;
use crate::web::guards::CurrentUser;
use crate::web::responses::{halted, redirect};
use crate::web::session;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartForm {
  pub product_id: i64,
  #[serde(default)]
  pub quantity: Option<String>,
  #[serde(default)]
  pub size: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartForm {
  pub product_id: i64,
  #[serde(default)]
  pub size: Option<String>,
  pub action: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartForm {
  pub product_id: i64,
  #[serde(default)]
  pub size: Option<String>,
}

#[instrument(name = "handler::view_cart", skip_all)]
pub async fn view_cart_handler(app_state: web::Data<AppState>, session: Session) -> Result<HttpResponse, AppError> {
  let cart = session::load_cart(&session);
  let products = app_state.store.products_by_ids(&cart.product_ids()).await?;
  let view = cart.price(&products);
  Ok(HttpResponse::Ok().json(json!({
    "cartCount": view.item_count,
    "items": view.items,
    "totalCents": view.total_cents,
  })))
}

#[instrument(name = "handler::add_to_cart", skip(session))]
pub async fn add_to_cart_handler(session: Session, form: web::Form<AddToCartForm>) -> Result<HttpResponse, AppError> {
  let form = form.into_inner();
  let quantity = parse_quantity(form.quantity.as_deref());
  let size = normalize_size(form.size.as_deref());
  let cart = session::load_cart(&session).add(ProductId(form.product_id), quantity, size);
  debug!(lines = cart.lines().len(), "Cart updated.");
  session::store_cart(&session, &cart)?;
  Ok(redirect("/cart"))
}

#[instrument(name = "handler::update_cart", skip(session))]
pub async fn update_cart_handler(session: Session, form: web::Form<UpdateCartForm>) -> Result<HttpResponse, AppError> {
  let Some(action) = CartAction::parse(&form.action) else {
    debug!(action = %form.action, "Ignoring unknown cart action.");
    return Ok(redirect("/cart"));
  };
  let size = normalize_size(form.size.as_deref());
  let cart = session::load_cart(&session).update(ProductId(form.product_id), size.as_deref(), action);
  session::store_cart(&session, &cart)?;
  Ok(redirect("/cart"))
}

#[instrument(name = "handler::remove_from_cart", skip(session))]
pub async fn remove_from_cart_handler(
  session: Session,
  form: web::Form<RemoveFromCartForm>,
) -> Result<HttpResponse, AppError> {
  let size = normalize_size(form.size.as_deref());
  let cart = session::load_cart(&session).remove(ProductId(form.product_id), size.as_deref());
  session::store_cart(&session, &cart)?;
  Ok(redirect("/cart"))
}

/// Writes the session cart as one order. The cart is cleared only after the write commits.
#[instrument(name = "handler::cart_checkout", skip(app_state, session), fields(user_id = %user.0.id))]
pub async fn cart_checkout_handler(
  app_state: web::Data<AppState>,
  session: Session,
  user: CurrentUser,
) -> Result<HttpResponse, AppError> {
  let cart = session::load_cart(&session);
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(app_state.get_ref().clone(), Some(user.0.id), cart));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let order_id = ctx_data
        .read()
        .placed_order
        .as_ref()
        .map(|o| o.id)
        .ok_or_else(|| AppError::Internal("checkout completed without an order".to_string()))?;
      session::clear_cart(&session);
      info!(%order_id, "Cart checked out.");
      Ok(HttpResponse::Ok().json(json!({
        "message": "Checkout complete! Your order has been saved.",
        "orderId": order_id,
        "link": "/profile",
      })))
    }
    PipelineResult::Stopped => {
      let halt = ctx_data.read().halt.unwrap_or(CheckoutHalt::EmptyCart);
      Ok(halted(halt))
    }
  }
}

