//! Persistence behind one async trait, with a PostgreSQL and an in-memory backend.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{
  AdminOrderView, Collection, CollectionShelf, NewOrder, NewProduct, NewUser, Order, OrderId, Product, ProductId,
  ProductStatus, ProfileUpdate, User, UserId,
};

pub type StoreResult<T> = Result<T, AppError>;

#[async_trait]
pub trait Store: Send + Sync {
  // --- users ---

  async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

  /// Fails with a form error when the username is taken.
  async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

  async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<()>;

  // --- catalog ---

  async fn list_collections(&self) -> StoreResult<Vec<Collection>>;

  /// Collections with their products. Products without a collection are not listed.
  async fn catalog(&self) -> StoreResult<Vec<CollectionShelf>>;

  async fn list_products(&self) -> StoreResult<Vec<Product>>;

  async fn find_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

  async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;

  // --- admin ---

  /// Returns the collection named `name`, creating it when absent. Safe under concurrency.
  async fn find_or_create_collection(&self, name: &str) -> StoreResult<Collection>;

  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product>;

  /// Returns whether a row was deleted.
  async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

  /// Flips the status in one atomic step and returns the new value, or `None` for an unknown id.
  async fn toggle_product_status(&self, id: ProductId) -> StoreResult<Option<ProductStatus>>;

  // --- orders ---

  /// Writes the order and all of its lines atomically.
  async fn place_order(&self, new_order: NewOrder) -> StoreResult<Order>;

  /// Newest first.
  async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>>;

  /// Newest first.
  async fn list_orders(&self) -> StoreResult<Vec<AdminOrderView>>;

  async fn find_order(&self, id: OrderId) -> StoreResult<Option<AdminOrderView>>;
}

pub(crate) fn duplicate_username(username: &str) -> AppError {
  AppError::form(format!("Username '{username}' is already taken."), "/register")
}

/// Groups products under their collections, keeping collection order.
pub(crate) fn shelve(collections: Vec<Collection>, products: Vec<Product>) -> Vec<CollectionShelf> {
  collections
    .into_iter()
    .map(|collection| CollectionShelf {
      products: products
        .iter()
        .filter(|p| p.collection_id == Some(collection.id))
        .cloned()
        .collect(),
      id: collection.id,
      name: collection.name,
    })
    .collect()
}
