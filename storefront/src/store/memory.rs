//! Process-local store used by tests and `STORE_BACKEND=memory`.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::warn;

use super::{duplicate_username, shelve, Store, StoreResult};
use crate::errors::AppError;
use crate::models::{
  AdminOrderView, Collection, CollectionId, CollectionShelf, CustomerContact, NewOrder, NewProduct, NewUser, Order,
  OrderId, OrderLine, Product, ProductId, ProductStatus, ProfileUpdate, User, UserId,
};

#[derive(Default)]
struct Tables {
  users: Vec<User>,
  collections: Vec<Collection>,
  products: Vec<Product>,
  orders: Vec<Order>,
  last_id: i64,
  /// Line index at which the next order write fails.
  fail_order_at_line: Option<usize>,
}

impl Tables {
  fn next_id(&mut self) -> i64 {
    self.last_id += 1;
    self.last_id
  }

  fn contact_for(&self, user_id: UserId) -> Option<CustomerContact> {
    self.users.iter().find(|u| u.id == user_id).map(|u| CustomerContact {
      username: u.username.clone(),
      email: u.email.clone(),
      address: u.address.clone(),
      phone: u.phone.clone(),
    })
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes the next `place_order` fail while writing line `line_index`.
  pub fn fail_next_order_at_line(&self, line_index: usize) {
    self.tables.write().fail_order_at_line = Some(line_index);
  }

  pub fn order_count(&self) -> usize {
    self.tables.read().orders.len()
  }

  pub fn user_count(&self) -> usize {
    self.tables.read().users.len()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
  }

  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    Ok(self.tables.read().users.iter().find(|u| u.username == username).cloned())
  }

  async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
    let mut tables = self.tables.write();
    if tables.users.iter().any(|u| u.username == new_user.username) {
      return Err(duplicate_username(&new_user.username));
    }
    let user = User {
      id: UserId(tables.next_id()),
      username: new_user.username,
      password_hash: new_user.password_hash,
      email: new_user.email,
      address: new_user.address,
      phone: new_user.phone,
      payment_method: new_user.payment_method,
      card_number: None,
      role: new_user.role,
    };
    tables.users.push(user.clone());
    Ok(user)
  }

  async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<()> {
    let mut tables = self.tables.write();
    let user = tables
      .users
      .iter_mut()
      .find(|u| u.id == id)
      .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;
    match update {
      ProfileUpdate::Email(value) => user.email = value,
      ProfileUpdate::Address(value) => user.address = value,
      ProfileUpdate::Phone(value) => user.phone = value,
      ProfileUpdate::PaymentMethod { method, card_number } => {
        user.payment_method = method;
        user.card_number = card_number;
      }
    }
    Ok(())
  }

  async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
    Ok(self.tables.read().collections.clone())
  }

  async fn catalog(&self) -> StoreResult<Vec<CollectionShelf>> {
    let tables = self.tables.read();
    Ok(shelve(tables.collections.clone(), tables.products.clone()))
  }

  async fn list_products(&self) -> StoreResult<Vec<Product>> {
    Ok(self.tables.read().products.clone())
  }

  async fn find_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
    Ok(self.tables.read().products.iter().find(|p| p.id == id).cloned())
  }

  async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
    Ok(
      self
        .tables
        .read()
        .products
        .iter()
        .filter(|p| ids.contains(&p.id))
        .cloned()
        .collect(),
    )
  }

  async fn find_or_create_collection(&self, name: &str) -> StoreResult<Collection> {
    let mut tables = self.tables.write();
    if let Some(existing) = tables.collections.iter().find(|c| c.name == name) {
      return Ok(existing.clone());
    }
    let collection = Collection {
      id: CollectionId(tables.next_id()),
      name: name.to_string(),
    };
    tables.collections.push(collection.clone());
    Ok(collection)
  }

  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product> {
    let mut tables = self.tables.write();
    let [image, image2, image3, image4] = new_product.images.0;
    let product = Product {
      id: ProductId(tables.next_id()),
      name: new_product.name,
      collection_id: new_product.collection_id,
      quantity: new_product.quantity,
      price_cents: new_product.price_cents,
      image,
      image2,
      image3,
      image4,
      status: ProductStatus::Available,
    };
    tables.products.push(product.clone());
    Ok(product)
  }

  async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
    let mut tables = self.tables.write();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != id);
    let deleted = tables.products.len() < before;
    if deleted {
      for line in tables.orders.iter_mut().flat_map(|o| o.lines.iter_mut()) {
        if line.product_id == Some(id) {
          line.product_id = None;
        }
      }
    }
    Ok(deleted)
  }

  async fn toggle_product_status(&self, id: ProductId) -> StoreResult<Option<ProductStatus>> {
    let mut tables = self.tables.write();
    Ok(tables.products.iter_mut().find(|p| p.id == id).map(|p| {
      p.status = p.status.toggled();
      p.status
    }))
  }

  async fn place_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    let mut tables = self.tables.write();
    let fail_at = tables.fail_order_at_line.take();

    let mut lines = Vec::with_capacity(new_order.lines.len());
    for (index, line) in new_order.lines.iter().enumerate() {
      if fail_at == Some(index) {
        warn!(line = index, "Injected order write failure.");
        return Err(AppError::Internal(format!("injected failure writing order line {index}")));
      }
      let product = tables
        .products
        .iter()
        .find(|p| p.id == line.product_id)
        .ok_or_else(|| AppError::Internal(format!("product {} disappeared during checkout", line.product_id)))?;
      let quantity = i32::try_from(line.quantity)
        .map_err(|_| AppError::Validation(format!("Quantity {} is too large.", line.quantity)))?;
      lines.push(OrderLine {
        product_id: Some(product.id),
        product_name: line.product_name.clone().unwrap_or_else(|| product.name.clone()),
        size: line.size.clone(),
        quantity,
        unit_price_cents: line.unit_price_cents.unwrap_or(product.price_cents),
      });
    }

    let order = Order {
      id: OrderId(tables.next_id()),
      user_id: new_order.user_id,
      status: new_order.status,
      total_cents: crate::models::order::order_total_cents(&lines, new_order.shipping_cents),
      lines,
      shipping_cents: new_order.shipping_cents,
      created_at: Utc::now(),
    };
    tables.orders.push(order.clone());
    Ok(order)
  }

  async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
    Ok(
      self
        .tables
        .read()
        .orders
        .iter()
        .rev()
        .filter(|o| o.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_orders(&self) -> StoreResult<Vec<AdminOrderView>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .iter()
        .rev()
        .filter_map(|order| {
          Some(AdminOrderView {
            customer: tables.contact_for(order.user_id)?,
            order: order.clone(),
          })
        })
        .collect(),
    )
  }

  async fn find_order(&self, id: OrderId) -> StoreResult<Option<AdminOrderView>> {
    let tables = self.tables.read();
    Ok(tables.orders.iter().find(|o| o.id == id).and_then(|order| {
      Some(AdminOrderView {
        customer: tables.contact_for(order.user_id)?,
        order: order.clone(),
      })
    }))
  }
}
