use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Cart, CartView, ProductId};

/// A cart line with the name and unit price it had when payment started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
  pub product_id: ProductId,
  pub product_name: String,
  pub size: Option<String>,
  pub quantity: u32,
  pub unit_price_cents: i64,
}

/// Prices fixed at `/payment`, kept in the session until the order is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSnapshot {
  pub started_at: DateTime<Utc>,
  pub lines: Vec<PricedLine>,
  pub subtotal_cents: i64,
  pub shipping_cents: i64,
  pub grand_total_cents: i64,
}

impl PaymentSnapshot {
  pub fn from_view(view: &CartView, shipping_cents: i64, started_at: DateTime<Utc>) -> Self {
    let lines = view
      .items
      .iter()
      .map(|item| PricedLine {
        product_id: item.product.id,
        product_name: item.product.name.clone(),
        size: item.size.clone(),
        quantity: item.quantity,
        unit_price_cents: item.product.price_cents,
      })
      .collect();

    PaymentSnapshot {
      started_at,
      lines,
      subtotal_cents: view.total_cents,
      shipping_cents,
      grand_total_cents: view.total_cents.saturating_add(shipping_cents),
    }
  }

  /// True when `cart` holds exactly the priced lines, in the same order.
  pub fn matches_cart(&self, cart: &Cart) -> bool {
    self.lines.len() == cart.lines().len()
      && self
        .lines
        .iter()
        .zip(cart.lines())
        .all(|(priced, line)| {
          priced.product_id == line.product_id && priced.size == line.size && priced.quantity == line.quantity
        })
  }

  /// True once strictly more than `window` has passed since `started_at`.
  pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(self.started_at) > window
  }
}
