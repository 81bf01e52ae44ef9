use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::cart::parse_quantity;
use crate::models::{Cart, PaymentSnapshot, ProductId, User};
use crate::pipelines::contexts::{CheckoutHalt, ConfirmPaymentCtxData, PlaceOrderCtxData};
use crate::state::AppState;
use crate::web::guards::CurrentUser;
use crate::web::responses::{halted, notice};
use crate::web::session;

#[derive(Deserialize, Debug)]
pub struct DirectOrderForm {
  #[serde(default)]
  pub quantity: Option<String>,
}

async fn load_customer(app_state: &AppState, user: &CurrentUser) -> Result<User, AppError> {
  app_state
    .store
    .find_user(user.0.id)
    .await?
    .ok_or_else(|| AppError::Internal(format!("user {} missing from store", user.0.id)))
}

#[instrument(name = "handler::checkout_view", skip(app_state, session), fields(user_id = %user.0.id))]
pub async fn checkout_view_handler(
  app_state: web::Data<AppState>,
  session: Session,
  user: CurrentUser,
) -> Result<HttpResponse, AppError> {
  let cart = session::load_cart(&session);
  if cart.is_empty() {
    return Ok(halted(CheckoutHalt::EmptyCart));
  }
  let customer = load_customer(&app_state, &user).await?;
  let products = app_state.store.products_by_ids(&cart.product_ids()).await?;
  let view = cart.price(&products);

  Ok(HttpResponse::Ok().json(json!({
    "cartCount": view.item_count,
    "items": view.items,
    "totalCents": view.total_cents,
    "delivery": {
      "username": customer.username,
      "email": customer.email,
      "address": customer.address,
      "phone": customer.phone,
      "paymentMethod": customer.payment_method,
      "cardNumber": customer.masked_card_number(),
    },
  })))
}

/// Prices the cart once and starts the payment window.
#[instrument(name = "handler::payment_view", skip(app_state, session), fields(user_id = %user.0.id))]
pub async fn payment_view_handler(
  app_state: web::Data<AppState>,
  session: Session,
  user: CurrentUser,
) -> Result<HttpResponse, AppError> {
  let cart = session::load_cart(&session);
  let products = app_state.store.products_by_ids(&cart.product_ids()).await?;
  let cart = cart.retain_known(&products);
  let view = cart.price(&products);
  if view.items.is_empty() {
    return Ok(notice("There is nothing to pay for.", "/"));
  }
  session::store_cart(&session, &cart)?;

  let snapshot = PaymentSnapshot::from_view(&view, app_state.config.shipping_cents, Utc::now());
  session::store_payment_snapshot(&session, &snapshot)?;
  info!(grand_total_cents = snapshot.grand_total_cents, "Payment window opened.");

  Ok(HttpResponse::Ok().json(json!({
    "payment": snapshot,
    "windowMinutes": app_state.config.payment_window_minutes,
  })))
}

#[instrument(name = "handler::order_confirm", skip(app_state, session), fields(user_id = %user.0.id))]
pub async fn order_confirm_handler(
  app_state: web::Data<AppState>,
  session: Session,
  user: CurrentUser,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(ConfirmPaymentCtxData::new(
    app_state.get_ref().clone(),
    Some(user.0.id),
    session::load_cart(&session),
    session::payment_snapshot(&session),
    Utc::now(),
  ));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let order_id = ctx_data
        .read()
        .placed_order
        .as_ref()
        .map(|o| o.id)
        .ok_or_else(|| AppError::Internal("payment completed without an order".to_string()))?;
      session::clear_cart(&session);
      session::clear_payment_snapshot(&session);
      Ok(HttpResponse::Ok().json(json!({
        "message": "Payment received, your order is confirmed.",
        "orderId": order_id,
        "link": "/profile",
      })))
    }
    PipelineResult::Stopped => {
      let halt = ctx_data.read().halt.unwrap_or(CheckoutHalt::PaymentExpired);
      if halt != CheckoutHalt::EmptyCart {
        session::clear_payment_snapshot(&session);
      }
      Ok(halted(halt))
    }
  }
}

/// Orders one product straight from its page. The session cart is not touched.
#[instrument(name = "handler::direct_order", skip(app_state, form), fields(user_id = %user.0.id))]
pub async fn direct_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  user: CurrentUser,
  form: web::Form<DirectOrderForm>,
) -> Result<HttpResponse, AppError> {
  let product_id = ProductId(path.into_inner());
  if app_state.store.find_product(product_id).await?.is_none() {
    return Err(AppError::NotFound("Product not found".to_string()));
  }

  let quantity = parse_quantity(form.quantity.as_deref());
  let cart = Cart::default().add(product_id, quantity, None);
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(app_state.get_ref().clone(), Some(user.0.id), cart));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let order_id = ctx_data.read().placed_order.as_ref().map(|o| o.id);
      Ok(HttpResponse::Ok().json(json!({
        "message": "Order placed!",
        "orderId": order_id,
        "link": "/profile",
      })))
    }
    PipelineResult::Stopped => Ok(halted(ctx_data.read().halt.unwrap_or(CheckoutHalt::EmptyCart))),
  }
}
