use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

use super::{OrderId, ProductId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  /// Written by cart checkout or a direct order.
  Placed,
  /// Written by payment confirmation.
  Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  /// `None` once the product has been deleted.
  pub product_id: Option<ProductId>,
  pub product_name: String,
  pub size: Option<String>,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

impl OrderLine {
  pub fn line_total_cents(&self) -> i64 {
    self.unit_price_cents.saturating_mul(i64::from(self.quantity))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: OrderId,
  pub user_id: UserId,
  pub status: OrderStatus,
  pub lines: Vec<OrderLine>,
  pub shipping_cents: i64,
  pub total_cents: i64,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
  pub product_id: ProductId,
  pub size: Option<String>,
  pub quantity: u32,
  /// Name and price already shown to the customer. `None` takes the product's
  /// current value inside the writing transaction.
  pub product_name: Option<String>,
  pub unit_price_cents: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: UserId,
  pub status: OrderStatus,
  pub shipping_cents: i64,
  pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CustomerContact {
  pub username: String,
  pub email: String,
  pub address: String,
  pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminOrderView {
  #[serde(flatten)]
  pub order: Order,
  pub customer: CustomerContact,
}

/// Subtotal plus shipping.
pub fn order_total_cents(lines: &[OrderLine], shipping_cents: i64) -> i64 {
  lines
    .iter()
    .map(OrderLine::line_total_cents)
    .fold(shipping_cents, i64::saturating_add)
}
