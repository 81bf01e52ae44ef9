use serde::Serialize;
use sqlx::FromRow;

use super::{CollectionId, Product};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Collection {
  pub id: CollectionId,
  pub name: String,
}

/// A collection with its products, as listed on the home page.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionShelf {
  pub id: CollectionId,
  pub name: String,
  pub products: Vec<Product>,
}
