//! Context data for every registered pipeline. Handlers receive these wrapped in
//! `shopflow::ContextData`.

use actix_web::web::Bytes;
use chrono::{DateTime, Utc};

use crate::models::{
  Cart, CollectionId, NewOrder, Order, PaymentSnapshot, Product, ProductImages, User, UserId,
};
use crate::services::mailer::OutgoingMail;
use crate::state::AppState;

// --- Accounts ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub username: String,
  pub password: String,
  pub confirm_password: String,
  pub email: String,
  pub address: String,
  pub phone: String,
  pub payment_method: String,
  pub password_hash: Option<String>,
  pub created_user: Option<User>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub username: String,
  pub password: String,
  pub candidate: Option<User>,
  pub authenticated: Option<User>,
}

// --- Orders ---

/// Why an order flow stopped without writing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutHalt {
  EmptyCart,
  PaymentExpired,
  /// The cart no longer holds exactly what was priced at `/payment`.
  CartChanged,
}

/// Cart checkout and direct orders: the cart's lines become one `placed` order.
#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub app_state: AppState,
  pub customer: Option<UserId>,
  pub cart: Cart,
  pub new_order: Option<NewOrder>,
  pub placed_order: Option<Order>,
  pub halt: Option<CheckoutHalt>,
}

impl PlaceOrderCtxData {
  pub fn new(app_state: AppState, customer: Option<UserId>, cart: Cart) -> Self {
    Self {
      app_state,
      customer,
      cart,
      new_order: None,
      placed_order: None,
      halt: None,
    }
  }
}

/// `/order-confirm`: the session's payment snapshot becomes one `paid` order.
#[derive(Clone)]
pub struct ConfirmPaymentCtxData {
  pub app_state: AppState,
  pub customer: Option<UserId>,
  pub cart: Cart,
  pub snapshot: Option<PaymentSnapshot>,
  pub now: DateTime<Utc>,
  pub new_order: Option<NewOrder>,
  pub placed_order: Option<Order>,
  pub halt: Option<CheckoutHalt>,
}

impl ConfirmPaymentCtxData {
  pub fn new(
    app_state: AppState,
    customer: Option<UserId>,
    cart: Cart,
    snapshot: Option<PaymentSnapshot>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      app_state,
      customer,
      cart,
      snapshot,
      now,
      new_order: None,
      placed_order: None,
      halt: None,
    }
  }
}

// --- Admin ---

#[derive(Debug, Clone)]
pub struct ImageUpload {
  /// 0 for `image` up to 3 for `image4`.
  pub slot: usize,
  pub file_name: Option<String>,
  pub bytes: Bytes,
}

#[derive(Clone)]
pub struct AddProductCtxData {
  pub app_state: AppState,
  pub product_name: String,
  pub collection_name: Option<String>,
  /// `/admin/add-product` insists on a collection, `/admin/add` does not.
  pub collection_required: bool,
  pub quantity: String,
  pub price: String,
  pub uploads: Vec<ImageUpload>,
  pub parsed_quantity: i32,
  pub price_cents: i64,
  pub images: ProductImages,
  pub collection_id: Option<CollectionId>,
  pub created_product: Option<Product>,
}

impl AddProductCtxData {
  pub fn new(
    app_state: AppState,
    product_name: String,
    collection_name: Option<String>,
    collection_required: bool,
    quantity: String,
    price: String,
    uploads: Vec<ImageUpload>,
  ) -> Self {
    Self {
      app_state,
      product_name,
      collection_name,
      collection_required,
      quantity,
      price,
      uploads,
      parsed_quantity: 0,
      price_cents: 0,
      images: ProductImages::default(),
      collection_id: None,
      created_product: None,
    }
  }
}

// --- Feedback ---

#[derive(Clone)]
pub struct FeedbackCtxData {
  pub app_state: AppState,
  pub name: String,
  pub email: String,
  pub subject: String,
  pub message: String,
  pub mail: Option<OutgoingMail>,
  pub sent: bool,
}
