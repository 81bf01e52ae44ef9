//! The session cart as a plain value.
//!
//! Handlers load the cart from the session, apply one of the transformations
//! below and store the result back. Nothing here touches the database; pricing
//! takes the product rows as input.

use serde::{Deserialize, Serialize};

use super::{Product, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: ProductId,
  /// Always at least 1 while the line exists.
  pub quantity: u32,
  pub size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
  Increase,
  Decrease,
}

impl CartAction {
  /// Unknown actions map to `None` and are ignored by the caller.
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "increase" => Some(CartAction::Increase),
      "decrease" => Some(CartAction::Decrease),
      _ => None,
    }
  }
}

/// Blank sizes mean "no size".
pub fn normalize_size(size: Option<&str>) -> Option<String> {
  size.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Largest quantity a line can hold; order lines store it as a 32-bit signed integer.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// Missing, non-numeric or non-positive quantities count as 1.
pub fn parse_quantity(raw: Option<&str>) -> u32 {
  raw
    .and_then(|q| q.trim().parse::<u32>().ok())
    .filter(|q| *q >= 1)
    .unwrap_or(1)
    .min(MAX_LINE_QUANTITY)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
  lines: Vec<CartLine>,
}

impl Cart {
  pub fn lines(&self) -> &[CartLine] {
    &self.lines
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Sum of quantities, shown as the cart badge.
  pub fn item_count(&self) -> u32 {
    self.lines.iter().map(|l| l.quantity).sum()
  }

  pub fn product_ids(&self) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = self.lines.iter().map(|l| l.product_id).collect();
    ids.sort();
    ids.dedup();
    ids
  }

  pub fn add(mut self, product_id: ProductId, quantity: u32, size: Option<String>) -> Self {
    let quantity = quantity.clamp(1, MAX_LINE_QUANTITY);
    match self.line_mut(product_id, size.as_deref()) {
      Some(line) => line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY),
      None => self.lines.push(CartLine {
        product_id,
        quantity,
        size,
      }),
    }
    self
  }

  pub fn update(mut self, product_id: ProductId, size: Option<&str>, action: CartAction) -> Self {
    let Some(index) = self.position(product_id, size) else {
      return self;
    };
    match action {
      CartAction::Increase => {
        let line = &mut self.lines[index];
        line.quantity = line.quantity.saturating_add(1).min(MAX_LINE_QUANTITY);
      }
      CartAction::Decrease => {
        if self.lines[index].quantity <= 1 {
          self.lines.remove(index);
        } else {
          self.lines[index].quantity -= 1;
        }
      }
    }
    self
  }

  /// Without a size every line of the product goes; with one, only that line.
  pub fn remove(mut self, product_id: ProductId, size: Option<&str>) -> Self {
    self.lines.retain(|line| {
      let same_product = line.product_id == product_id;
      match size {
        None => !same_product,
        Some(size) => !(same_product && line.size.as_deref() == Some(size)),
      }
    });
    self
  }

  /// Drops lines whose product is not among `products`.
  pub fn retain_known(mut self, products: &[Product]) -> Self {
    self.lines.retain(|line| products.iter().any(|p| p.id == line.product_id));
    self
  }

  /// Joins lines to their products. Lines whose product is gone are left out.
  pub fn price(&self, products: &[Product]) -> CartView {
    let items: Vec<CartViewItem> = self
      .lines
      .iter()
      .filter_map(|line| {
        let product = products.iter().find(|p| p.id == line.product_id)?;
        Some(CartViewItem {
          line_total_cents: product.price_cents.saturating_mul(i64::from(line.quantity)),
          product: product.clone(),
          quantity: line.quantity,
          size: line.size.clone(),
        })
      })
      .collect();
    let total_cents = items.iter().fold(0i64, |sum, i| sum.saturating_add(i.line_total_cents));

    CartView {
      items,
      total_cents,
      item_count: self.item_count(),
    }
  }

  fn position(&self, product_id: ProductId, size: Option<&str>) -> Option<usize> {
    self
      .lines
      .iter()
      .position(|l| l.product_id == product_id && l.size.as_deref() == size)
  }

  fn line_mut(&mut self, product_id: ProductId, size: Option<&str>) -> Option<&mut CartLine> {
    let index = self.position(product_id, size)?;
    self.lines.get_mut(index)
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartViewItem {
  pub product: Product,
  pub quantity: u32,
  pub size: Option<String>,
  pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
  pub items: Vec<CartViewItem>,
  pub total_cents: i64,
  pub item_count: u32,
}
