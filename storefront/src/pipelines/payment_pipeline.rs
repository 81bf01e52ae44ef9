use shopflow::{ContextData, Pipeline, PipelineControl, Registry};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{NewOrder, NewOrderLine, OrderStatus};
use crate::pipelines::contexts::{CheckoutHalt, ConfirmPaymentCtxData};

pub fn register_payment_pipeline(flows: &Registry<AppError>) {
  let mut p = Pipeline::<ConfirmPaymentCtxData, AppError>::new(&[
    ("ensure_cart_has_lines", false, None),
    ("check_payment_window", false, None),
    ("ensure_cart_matches_snapshot", false, None),
    ("ensure_customer", false, None),
    ("compose_paid_order", false, None),
    ("persist_order", false, None),
  ]);

  p.on_root("ensure_cart_has_lines", |ctx_data: ContextData<ConfirmPaymentCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      if guard.cart.is_empty() {
        guard.halt = Some(CheckoutHalt::EmptyCart);
        return Ok(PipelineControl::Stop);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_payment_window", |ctx_data: ContextData<ConfirmPaymentCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let window = guard.app_state.payment_window();
      let expired = match guard.snapshot.as_ref() {
        None => true,
        Some(snapshot) => snapshot.is_expired(guard.now, window),
      };
      if expired {
        warn!(
          has_snapshot = guard.snapshot.is_some(),
          window_minutes = window.num_minutes(),
          "Payment confirmation outside the payment window."
        );
        guard.halt = Some(CheckoutHalt::PaymentExpired);
        return Ok(PipelineControl::Stop);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("ensure_cart_matches_snapshot", |ctx_data: ContextData<ConfirmPaymentCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let matches = guard.snapshot.as_ref().is_some_and(|s| s.matches_cart(&guard.cart));
      if !matches {
        warn!(cart_lines = guard.cart.lines().len(), "Cart changed since the payment page.");
        guard.halt = Some(CheckoutHalt::CartChanged);
        return Ok(PipelineControl::Stop);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("ensure_customer", |ctx_data: ContextData<ConfirmPaymentCtxData>| {
    Box::pin(async move {
      if ctx_data.read().customer.is_none() {
        return Err(AppError::Unauthenticated);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("compose_paid_order", |ctx_data: ContextData<ConfirmPaymentCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let user_id = guard.customer.ok_or(AppError::Unauthenticated)?;
      let snapshot = guard
        .snapshot
        .as_ref()
        .ok_or_else(|| AppError::Internal("payment snapshot vanished".to_string()))?;
      let new_order = NewOrder {
        user_id,
        status: OrderStatus::Paid,
        shipping_cents: snapshot.shipping_cents,
        lines: snapshot
          .lines
          .iter()
          .map(|line| NewOrderLine {
            product_id: line.product_id,
            size: line.size.clone(),
            quantity: line.quantity,
            product_name: Some(line.product_name.clone()),
            unit_price_cents: Some(line.unit_price_cents),
          })
          .collect(),
      };
      guard.new_order = Some(new_order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_order", |ctx_data: ContextData<ConfirmPaymentCtxData>| {
    Box::pin(async move {
      let (new_order, store) = {
        let mut guard = ctx_data.write();
        let new_order = guard
          .new_order
          .take()
          .ok_or_else(|| AppError::Internal("paid order not composed".to_string()))?;
        (new_order, guard.app_state.store.clone())
      };
      let order = store.place_order(new_order).await?;
      info!(order_id = %order.id, total_cents = order.total_cents, "Payment confirmed.");
      ctx_data.write().placed_order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
}
