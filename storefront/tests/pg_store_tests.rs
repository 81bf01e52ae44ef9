//! Runs against a real Postgres when `DATABASE_URL` is set; otherwise each test returns early.

mod common;

use common::setup_tracing;
use serial_test::serial;
use storefront::models::{
  NewOrder, NewOrderLine, NewProduct, NewUser, OrderStatus, Product, ProductId, ProductImages, ProductStatus, Role,
  User,
};
use storefront::store::{PgStore, Store};
use uuid::Uuid;

async fn pg_store() -> Option<PgStore> {
  setup_tracing();
  let Ok(url) = std::env::var("DATABASE_URL") else {
    eprintln!("DATABASE_URL not set, skipping Postgres store test");
    return None;
  };
  let store = PgStore::connect(&url).await.expect("connect to DATABASE_URL");
  store.migrate().await.expect("apply migrations");
  Some(store)
}

fn unique(prefix: &str) -> String {
  format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn seed_user(store: &PgStore) -> User {
  let username = unique("pg-user");
  store
    .create_user(NewUser {
      email: format!("{username}@example.com"),
      username,
      password_hash: "not-a-real-hash".to_string(),
      address: "1 Market Street".to_string(),
      phone: "555-0100".to_string(),
      payment_method: "Cash on Delivery".to_string(),
      role: Role::User,
    })
    .await
    .unwrap()
}

async fn seed_product(store: &PgStore, name: &str, price_cents: i64) -> Product {
  store
    .create_product(NewProduct {
      name: name.to_string(),
      collection_id: None,
      quantity: 5,
      price_cents,
      images: ProductImages::default(),
    })
    .await
    .unwrap()
}

fn line(product_id: ProductId, quantity: u32) -> NewOrderLine {
  NewOrderLine {
    product_id,
    size: None,
    quantity,
    product_name: None,
    unit_price_cents: None,
  }
}

#[tokio::test]
#[serial]
async fn missing_product_rolls_back_the_whole_order() {
  let Some(store) = pg_store().await else { return };
  let user = seed_user(&store).await;
  let shirt = seed_product(&store, "Shirt", 2500).await;
  let gone = seed_product(&store, "Gone", 900).await;
  assert!(store.delete_product(gone.id).await.unwrap());

  let result = store
    .place_order(NewOrder {
      user_id: user.id,
      status: OrderStatus::Placed,
      shipping_cents: 0,
      lines: vec![line(shirt.id, 2), line(gone.id, 1)],
    })
    .await;
  assert!(result.is_err());
  assert!(store.orders_for_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn committed_order_keeps_lines_after_product_delete() {
  let Some(store) = pg_store().await else { return };
  let user = seed_user(&store).await;
  let shirt = seed_product(&store, "Shirt", 2500).await;
  let cap = seed_product(&store, "Cap", 1200).await;

  let mut paid_line = line(cap.id, 3);
  paid_line.product_name = Some("Cap (as shown)".to_string());
  paid_line.unit_price_cents = Some(1000);
  let order = store
    .place_order(NewOrder {
      user_id: user.id,
      status: OrderStatus::Paid,
      shipping_cents: 1000,
      lines: vec![line(shirt.id, 2), paid_line],
    })
    .await
    .unwrap();
  assert_eq!(order.total_cents, 2 * 2500 + 3 * 1000 + 1000);
  assert_eq!(order.lines[1].product_name, "Cap (as shown)");

  assert!(store.delete_product(shirt.id).await.unwrap());
  let orders = store.orders_for_user(user.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].status, OrderStatus::Paid);
  assert_eq!(orders[0].lines.len(), 2);
  assert_eq!(orders[0].lines[0].product_id, None);
  assert_eq!(orders[0].lines[0].product_name, "Shirt");
  assert_eq!(orders[0].lines[0].unit_price_cents, 2500);
  assert_eq!(orders[0].lines[1].product_id, Some(cap.id));

  let view = store.find_order(order.id).await.unwrap().unwrap();
  assert_eq!(view.customer.username, user.username);
}

#[tokio::test]
#[serial]
async fn toggling_twice_restores_the_status() {
  let Some(store) = pg_store().await else { return };
  let product = seed_product(&store, "Scarf", 1500).await;
  assert_eq!(product.status, ProductStatus::Available);

  assert_eq!(
    store.toggle_product_status(product.id).await.unwrap(),
    Some(ProductStatus::SoldOut)
  );
  let reloaded = store.find_product(product.id).await.unwrap().unwrap();
  assert_eq!(reloaded.status, ProductStatus::SoldOut);

  assert_eq!(
    store.toggle_product_status(product.id).await.unwrap(),
    Some(ProductStatus::Available)
  );
  assert_eq!(store.toggle_product_status(ProductId(i64::MAX)).await.unwrap(), None);
}

#[tokio::test]
#[serial]
async fn concurrent_find_or_create_yields_one_collection() {
  let Some(store) = pg_store().await else { return };
  let name = unique("collection");

  let (first, second) = tokio::join!(
    store.find_or_create_collection(&name),
    store.find_or_create_collection(&name)
  );
  let (first, second) = (first.unwrap(), second.unwrap());
  assert_eq!(first.id, second.id);

  let matching = store
    .list_collections()
    .await
    .unwrap()
    .into_iter()
    .filter(|c| c.name == name)
    .count();
  assert_eq!(matching, 1);
}

#[tokio::test]
#[serial]
async fn duplicate_username_is_rejected_as_a_form_error() {
  let Some(store) = pg_store().await else { return };
  let user = seed_user(&store).await;

  let err = store
    .create_user(NewUser {
      username: user.username.clone(),
      password_hash: "x".to_string(),
      email: "dup@example.com".to_string(),
      address: String::new(),
      phone: String::new(),
      payment_method: String::new(),
      role: Role::User,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, storefront::errors::AppError::Form { retry: "/register", .. }));
}
