//! The order writer for cart checkout and direct orders.
//!
//! Lines are passed without a name or price, so the store resolves each product's
//! current values inside the transaction that writes the order.

use shopflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{NewOrder, NewOrderLine, OrderStatus};
use crate::pipelines::contexts::{CheckoutHalt, PlaceOrderCtxData};

pub fn register_checkout_pipeline(flows: &Registry<AppError>) {
  let mut p = Pipeline::<PlaceOrderCtxData, AppError>::new(&[
    ("ensure_cart_has_lines", false, None),
    ("ensure_customer", false, None),
    ("compose_order_lines", false, None),
    ("persist_order", false, None),
  ]);

  p.on_root("ensure_cart_has_lines", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      if guard.cart.is_empty() {
        info!("Checkout requested with an empty cart.");
        guard.halt = Some(CheckoutHalt::EmptyCart);
        return Ok(PipelineControl::Stop);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("ensure_customer", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      if ctx_data.read().customer.is_none() {
        return Err(AppError::Unauthenticated);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("compose_order_lines", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move { compose_order_lines(&ctx_data) })
  });

  p.on_root("persist_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (new_order, store) = {
        let mut guard = ctx_data.write();
        let new_order = guard
          .new_order
          .take()
          .ok_or_else(|| AppError::Internal("order not composed before persisting".to_string()))?;
        (new_order, guard.app_state.store.clone())
      };

      let user_id = new_order.user_id;
      match store.place_order(new_order).await {
        Ok(order) => {
          ctx_data.write().placed_order = Some(order);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        Err(e) => {
          warn!(%user_id, error = %e, "Order write rolled back.");
          Err(e)
        }
      }
    })
  });

  p.after_root("persist_order", |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      if let Some(order) = ctx_data.read().placed_order.as_ref() {
        info!(
          order_id = %order.id,
          user_id = %order.user_id,
          lines = order.lines.len(),
          total_cents = order.total_cents,
          "Order placed."
        );
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
}

#[instrument(level = "debug", skip_all)]
fn compose_order_lines(ctx_data: &ContextData<PlaceOrderCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let user_id = guard.customer.ok_or(AppError::Unauthenticated)?;
  let lines = guard
    .cart
    .lines()
    .iter()
    .map(|line| NewOrderLine {
      product_id: line.product_id,
      size: line.size.clone(),
      quantity: line.quantity,
      product_name: None,
      unit_price_cents: None,
    })
    .collect();
  guard.new_order = Some(NewOrder {
    user_id,
    status: OrderStatus::Placed,
    shipping_cents: 0,
    lines,
  });
  Ok(PipelineControl::Continue)
}
