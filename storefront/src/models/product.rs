use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

use super::{CollectionId, ProductId};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "product_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
  Available,
  SoldOut,
}

impl ProductStatus {
  pub fn toggled(self) -> Self {
    match self {
      ProductStatus::Available => ProductStatus::SoldOut,
      ProductStatus::SoldOut => ProductStatus::Available,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: ProductId,
  pub name: String,
  pub collection_id: Option<CollectionId>,
  pub quantity: i32,
  pub price_cents: i64,
  pub image: Option<String>,
  pub image2: Option<String>,
  pub image3: Option<String>,
  pub image4: Option<String>,
  pub status: ProductStatus,
}

/// Stored image paths in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductImages(pub [Option<String>; 4]);

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub name: String,
  pub collection_id: Option<CollectionId>,
  pub quantity: i32,
  pub price_cents: i64,
  pub images: ProductImages,
}

/// Parses a decimal price such as `25`, `25.5` or `25.00` into cents.
pub fn parse_price_cents(raw: &str) -> Result<i64, AppError> {
  let invalid = || AppError::Validation(format!("Invalid price: '{raw}'"));
  let raw_trimmed = raw.trim();
  let (whole, fraction) = raw_trimmed.split_once('.').unwrap_or((raw_trimmed, ""));

  if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
    return Err(invalid());
  }
  if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
    return Err(invalid());
  }

  let whole: i64 = whole.parse().map_err(|_| invalid())?;
  let fraction_cents = match fraction.len() {
    0 => 0,
    1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
    _ => fraction.parse::<i64>().map_err(|_| invalid())?,
  };
  whole
    .checked_mul(100)
    .and_then(|cents| cents.checked_add(fraction_cents))
    .ok_or_else(invalid)
}
