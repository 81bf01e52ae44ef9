//! Domain types: persisted entities, the session cart and the payment snapshot.

pub mod cart;
pub mod collection;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

pub use cart::{Cart, CartAction, CartLine, CartView, CartViewItem};
pub use collection::{Collection, CollectionShelf};
pub use order::{AdminOrderView, CustomerContact, NewOrder, NewOrderLine, Order, OrderLine, OrderStatus};
pub use payment::{PaymentSnapshot, PricedLine};
pub use product::{NewProduct, Product, ProductImages, ProductStatus};
pub use user::{NewUser, ProfileUpdate, Role, SessionUser, User};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize, sqlx::Type,
    )]
    #[serde(transparent)]
    #[sqlx(transparent)]
    pub struct $name(pub i64);

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
      }
    }
  };
}

id_type!(UserId);
id_type!(CollectionId);
id_type!(ProductId);
id_type!(OrderId);
