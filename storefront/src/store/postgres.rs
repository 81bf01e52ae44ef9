use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{info, instrument, warn};

use super::{duplicate_username, shelve, Store, StoreResult};
use crate::errors::AppError;
use crate::models::{
  AdminOrderView, Collection, CollectionShelf, CustomerContact, NewOrder, NewProduct, NewUser, Order, OrderId,
  OrderLine, OrderStatus, Product, ProductId, ProductStatus, ProfileUpdate, User, UserId,
};

const PRODUCT_COLUMNS: &str = "id, name, collection_id, quantity, price_cents, image, image2, image3, image4, status";

#[derive(FromRow)]
struct OrderRow {
  id: OrderId,
  user_id: UserId,
  status: OrderStatus,
  shipping_cents: i64,
  total_cents: i64,
  created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AdminOrderRow {
  #[sqlx(flatten)]
  order: OrderRow,
  #[sqlx(flatten)]
  customer: CustomerContact,
}

#[derive(FromRow)]
struct LineRow {
  order_id: OrderId,
  #[sqlx(flatten)]
  line: OrderLine,
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn lines_for(&self, order_ids: &[OrderId]) -> StoreResult<HashMap<OrderId, Vec<OrderLine>>> {
    let ids: Vec<i64> = order_ids.iter().map(|id| id.0).collect();
    let rows = sqlx::query_as::<_, LineRow>(
      "SELECT order_id, product_id, product_name, size, quantity, unit_price_cents
       FROM order_lines WHERE order_id = ANY($1) ORDER BY order_id, line_no",
    )
    .bind(&ids[..])
    .fetch_all(&self.pool)
    .await?;

    let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    for row in rows {
      grouped.entry(row.order_id).or_default().push(row.line);
    }
    Ok(grouped)
  }

  async fn admin_views(&self, rows: Vec<AdminOrderRow>) -> StoreResult<Vec<AdminOrderView>> {
    let ids: Vec<OrderId> = rows.iter().map(|r| r.order.id).collect();
    let mut lines = self.lines_for(&ids).await?;
    Ok(
      rows
        .into_iter()
        .map(|row| {
          let order_lines = lines.remove(&row.order.id).unwrap_or_default();
          AdminOrderView {
            order: into_order(row.order, order_lines),
            customer: row.customer,
          }
        })
        .collect(),
    )
  }
}

fn into_order(row: OrderRow, lines: Vec<OrderLine>) -> Order {
  Order {
    id: row.id,
    user_id: row.user_id,
    status: row.status,
    lines,
    shipping_cents: row.shipping_cents,
    total_cents: row.total_cents,
    created_at: row.created_at,
  }
}

/// Inserts the order header and every line on `tx`. The caller commits or rolls back.
async fn write_order(tx: &mut Transaction<'_, Postgres>, new_order: &NewOrder) -> StoreResult<Order> {
  let (order_id, created_at): (OrderId, DateTime<Utc>) = sqlx::query_as(
    "INSERT INTO orders (user_id, status, shipping_cents, total_cents)
     VALUES ($1, $2, $3, 0) RETURNING id, created_at",
  )
  .bind(new_order.user_id)
  .bind(new_order.status)
  .bind(new_order.shipping_cents)
  .fetch_one(&mut **tx)
  .await?;

  let mut lines = Vec::with_capacity(new_order.lines.len());
  for (line_no, line) in new_order.lines.iter().enumerate() {
    let (current_name, current_price): (String, i64) =
      sqlx::query_as("SELECT name, price_cents FROM products WHERE id = $1")
        .bind(line.product_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::Internal(format!("product {} disappeared during checkout", line.product_id)))?;

    let quantity = i32::try_from(line.quantity)
      .map_err(|_| AppError::Validation(format!("Quantity {} is too large.", line.quantity)))?;
    let product_name = line.product_name.clone().unwrap_or(current_name);
    let unit_price_cents = line.unit_price_cents.unwrap_or(current_price);

    sqlx::query(
      "INSERT INTO order_lines (order_id, line_no, product_id, product_name, size, quantity, unit_price_cents)
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(order_id)
    .bind(line_no as i32)
    .bind(line.product_id)
    .bind(&product_name)
    .bind(&line.size)
    .bind(quantity)
    .bind(unit_price_cents)
    .execute(&mut **tx)
    .await?;

    lines.push(OrderLine {
      product_id: Some(line.product_id),
      product_name,
      size: line.size.clone(),
      quantity,
      unit_price_cents,
    });
  }

  let total_cents = crate::models::order::order_total_cents(&lines, new_order.shipping_cents);
  sqlx::query("UPDATE orders SET total_cents = $2 WHERE id = $1")
    .bind(order_id)
    .bind(total_cents)
    .execute(&mut **tx)
    .await?;

  Ok(Order {
    id: order_id,
    user_id: new_order.user_id,
    status: new_order.status,
    lines,
    shipping_cents: new_order.shipping_cents,
    total_cents,
    created_at,
  })
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "PgStore::find_user", skip(self), err(Display))]
  async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, username, password_hash, email, address, phone, payment_method, card_number, role
       FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }

  #[instrument(name = "PgStore::find_user_by_username", skip(self), err(Display))]
  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, username, password_hash, email, address, phone, payment_method, card_number, role
       FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }

  #[instrument(name = "PgStore::create_user", skip_all, fields(username = %new_user.username), err(Display))]
  async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
    let inserted = sqlx::query_as::<_, User>(
      "INSERT INTO users (username, password_hash, email, address, phone, payment_method, role)
       VALUES ($1, $2, $3, $4, $5, $6, $7)
       RETURNING id, username, password_hash, email, address, phone, payment_method, card_number, role",
    )
    .bind(&new_user.username)
    .bind(&new_user.password_hash)
    .bind(&new_user.email)
    .bind(&new_user.address)
    .bind(&new_user.phone)
    .bind(&new_user.payment_method)
    .bind(new_user.role)
    .fetch_one(&self.pool)
    .await;

    match inserted {
      Ok(user) => Ok(user),
      Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(duplicate_username(&new_user.username)),
      Err(e) => Err(e.into()),
    }
  }

  #[instrument(name = "PgStore::update_profile", skip(self, update), err(Display))]
  async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> StoreResult<()> {
    let query = match update {
      ProfileUpdate::Email(value) => sqlx::query("UPDATE users SET email = $2 WHERE id = $1").bind(id).bind(value),
      ProfileUpdate::Address(value) => sqlx::query("UPDATE users SET address = $2 WHERE id = $1").bind(id).bind(value),
      ProfileUpdate::Phone(value) => sqlx::query("UPDATE users SET phone = $2 WHERE id = $1").bind(id).bind(value),
      ProfileUpdate::PaymentMethod { method, card_number } => {
        sqlx::query("UPDATE users SET payment_method = $2, card_number = $3 WHERE id = $1")
          .bind(id)
          .bind(method)
          .bind(card_number)
      }
    };
    let result = query.execute(&self.pool).await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("User {id} not found")));
    }
    Ok(())
  }

  async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
    let collections = sqlx::query_as::<_, Collection>("SELECT id, name FROM collections ORDER BY id")
      .fetch_all(&self.pool)
      .await?;
    Ok(collections)
  }

  #[instrument(name = "PgStore::catalog", skip(self), err(Display))]
  async fn catalog(&self) -> StoreResult<Vec<CollectionShelf>> {
    let collections = self.list_collections().await?;
    let products = sqlx::query_as::<_, Product>(&format!(
      "SELECT {PRODUCT_COLUMNS} FROM products WHERE collection_id IS NOT NULL ORDER BY id"
    ))
    .fetch_all(&self.pool)
    .await?;
    Ok(shelve(collections, products))
  }

  async fn list_products(&self) -> StoreResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }

  async fn find_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
    let raw_ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
    let products =
      sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id"))
        .bind(&raw_ids[..])
        .fetch_all(&self.pool)
        .await?;
    Ok(products)
  }

  #[instrument(name = "PgStore::find_or_create_collection", skip(self), err(Display))]
  async fn find_or_create_collection(&self, name: &str) -> StoreResult<Collection> {
    let collection = sqlx::query_as::<_, Collection>(
      "INSERT INTO collections (name) VALUES ($1)
       ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
       RETURNING id, name",
    )
    .bind(name)
    .fetch_one(&self.pool)
    .await?;
    Ok(collection)
  }

  #[instrument(name = "PgStore::create_product", skip_all, fields(name = %new_product.name), err(Display))]
  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product> {
    let [image, image2, image3, image4] = new_product.images.0;
    let product = sqlx::query_as::<_, Product>(&format!(
      "INSERT INTO products (name, collection_id, quantity, price_cents, image, image2, image3, image4, status)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'available')
       RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&new_product.name)
    .bind(new_product.collection_id)
    .bind(new_product.quantity)
    .bind(new_product.price_cents)
    .bind(image)
    .bind(image2)
    .bind(image3)
    .bind(image4)
    .fetch_one(&self.pool)
    .await?;
    Ok(product)
  }

  #[instrument(name = "PgStore::delete_product", skip(self), err(Display))]
  async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(name = "PgStore::toggle_product_status", skip(self), err(Display))]
  async fn toggle_product_status(&self, id: ProductId) -> StoreResult<Option<ProductStatus>> {
    let status = sqlx::query_scalar::<_, ProductStatus>(
      "UPDATE products
       SET status = CASE WHEN status = 'available' THEN 'soldout'::product_status
                         ELSE 'available'::product_status END
       WHERE id = $1
       RETURNING status",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(status)
  }

  #[instrument(
    name = "PgStore::place_order",
    skip_all,
    fields(user_id = %new_order.user_id, lines = new_order.lines.len()),
    err(Display)
  )]
  async fn place_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;
    match write_order(&mut tx, &new_order).await {
      Ok(order) => {
        tx.commit().await?;
        info!(order_id = %order.id, total_cents = order.total_cents, "Order committed.");
        Ok(order)
      }
      Err(e) => {
        if let Err(rollback_err) = tx.rollback().await {
          warn!(error = %rollback_err, "Rollback after failed order write also failed.");
        }
        Err(e)
      }
    }
  }

  async fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
      "SELECT id, user_id, status, shipping_cents, total_cents, created_at
       FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
    let mut lines = self.lines_for(&ids).await?;
    Ok(
      rows
        .into_iter()
        .map(|row| {
          let order_lines = lines.remove(&row.id).unwrap_or_default();
          into_order(row, order_lines)
        })
        .collect(),
    )
  }

  async fn list_orders(&self) -> StoreResult<Vec<AdminOrderView>> {
    let rows = sqlx::query_as::<_, AdminOrderRow>(
      "SELECT o.id, o.user_id, o.status, o.shipping_cents, o.total_cents, o.created_at,
              u.username, u.email, u.address, u.phone
       FROM orders o JOIN users u ON u.id = o.user_id
       ORDER BY o.created_at DESC, o.id DESC",
    )
    .fetch_all(&self.pool)
    .await?;
    self.admin_views(rows).await
  }

  async fn find_order(&self, id: OrderId) -> StoreResult<Option<AdminOrderView>> {
    let rows = sqlx::query_as::<_, AdminOrderRow>(
      "SELECT o.id, o.user_id, o.status, o.shipping_cents, o.total_cents, o.created_at,
              u.username, u.email, u.address, u.phone
       FROM orders o JOIN users u ON u.id = o.user_id
       WHERE o.id = $1",
    )
    .bind(id)
    .fetch_all(&self.pool)
    .await?;
    Ok(self.admin_views(rows).await?.into_iter().next())
  }
}
