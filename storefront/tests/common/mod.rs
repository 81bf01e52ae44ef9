#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::Level;

use storefront::config::{AppConfig, StoreBackend};
use storefront::errors::AppError;
use storefront::models::{NewProduct, NewUser, Product, ProductImages, Role, User};
use storefront::services::auth_service;
use storefront::services::image_store::ImageStore;
use storefront::services::mailer::{Mailer, OutgoingMail};
use storefront::state::AppState;
use storefront::store::{MemoryStore, Store};
use storefront::web::session::SESSION_COOKIE;
use storefront::web::MemorySessionStore;

pub const PASSWORD: &str = "correct horse battery staple";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    store_backend: StoreBackend::Memory,
    database_url: None,
    session_secret: "test-secret-test-secret-test-secret-test-secret-0123456789abcdef".to_string(),
    session_ttl_minutes: 60,
    remember_me_days: 30,
    secure_cookies: false,
    image_dir: PathBuf::from("target/test-images"),
    payment_window_minutes: 10,
    shipping_cents: 1000,
    smtp: None,
    mail_from: "shop@example.com".to_string(),
    feedback_inbox: "inbox@example.com".to_string(),
    admin_bootstrap: None,
    json_logs: false,
  }
}

/// Keeps every mail instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
  pub sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
    self.sent.lock().push(mail);
    Ok(())
  }
}

/// Records uploads and hands out predictable paths.
#[derive(Default)]
pub struct RecordingImageStore {
  pub saved: Mutex<Vec<(Option<String>, usize)>>,
}

#[async_trait]
impl ImageStore for RecordingImageStore {
  async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
    let mut saved = self.saved.lock();
    saved.push((original_name.map(str::to_string), bytes.len()));
    Ok(format!("images/upload-{}.png", saved.len()))
  }
}

pub struct TestContext {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub mailer: Arc<RecordingMailer>,
  pub images: Arc<RecordingImageStore>,
  pub sessions: MemorySessionStore,
}

pub fn test_context() -> TestContext {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let mailer = Arc::new(RecordingMailer::default());
  let images = Arc::new(RecordingImageStore::default());
  let state = AppState::new(store.clone(), Arc::new(test_config()), mailer.clone(), images.clone());
  TestContext {
    state,
    store,
    mailer,
    images,
    sessions: MemorySessionStore::new(),
  }
}

/// Builds the full application, middleware included, around a `TestContext`.
#[macro_export]
macro_rules! init_app {
  ($ctx:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($ctx.state.clone()))
        .configure(storefront::web::configure_app_routes)
        .wrap(actix_web::middleware::from_fn(storefront::web::restore_remembered_user))
        .wrap(storefront::web::session_middleware(&$ctx.state.config, $ctx.sessions.clone())),
    )
    .await
  };
}

/// Replaces `jar` with the session cookie a response sets, if any.
pub fn carry_session<B>(resp: &ServiceResponse<B>, jar: &mut Option<Cookie<'static>>) {
  if let Some(cookie) = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE) {
    *jar = Some(cookie.into_owned());
  }
}

pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
  resp.response().cookies().find(|c| c.name() == name).map(|c| c.into_owned())
}

pub fn location<B>(resp: &ServiceResponse<B>) -> Option<String> {
  resp
    .headers()
    .get(actix_web::http::header::LOCATION)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string)
}

pub async fn seed_user(store: &MemoryStore, username: &str, role: Role) -> User {
  store
    .create_user(NewUser {
      username: username.to_string(),
      password_hash: auth_service::hash_password(PASSWORD).unwrap(),
      email: format!("{username}@example.com"),
      address: "1 Market Street".to_string(),
      phone: "555-0100".to_string(),
      payment_method: "Cash on Delivery".to_string(),
      role,
    })
    .await
    .unwrap()
}

pub async fn seed_product(store: &MemoryStore, name: &str, price_cents: i64, collection: Option<&str>) -> Product {
  let collection_id = match collection {
    Some(name) => Some(store.find_or_create_collection(name).await.unwrap().id),
    None => None,
  };
  store
    .create_product(NewProduct {
      name: name.to_string(),
      collection_id,
      quantity: 10,
      price_cents,
      images: ProductImages::default(),
    })
    .await
    .unwrap()
}

pub async fn read_json<B>(resp: ServiceResponse<B>) -> serde_json::Value
where
  B: actix_web::body::MessageBody,
{
  actix_web::test::read_body_json(resp).await
}

/// Signs `$username` in with `PASSWORD` and yields the session cookie.
#[macro_export]
macro_rules! login {
  ($app:expr, $username:expr) => {{
    let req = actix_web::test::TestRequest::post()
      .uri("/login")
      .set_form(serde_json::json!({ "username": $username, "password": common::PASSWORD }))
      .to_request();
    let resp = actix_web::test::call_service(&$app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER, "login should redirect");
    let mut jar = None;
    common::carry_session(&resp, &mut jar);
    jar.expect("login sets a session cookie")
  }};
}

/// Adds one product to the cart of the session in `$jar`, updating the jar.
#[macro_export]
macro_rules! add_to_cart {
  ($app:expr, $jar:expr, $product_id:expr, $quantity:expr, $size:expr) => {{
    let req = actix_web::test::TestRequest::post()
      .uri("/cart/add")
      .cookie($jar.clone())
      .set_form(serde_json::json!({ "productId": $product_id, "quantity": $quantity, "size": $size }))
      .to_request();
    let resp = actix_web::test::call_service(&$app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER);
    let mut next = Some($jar.clone());
    common::carry_session(&resp, &mut next);
    if let Some(cookie) = next {
      $jar = cookie;
    }
  }};
}
