use actix_web::http::header;
use actix_web::HttpResponse;
use serde_json::json;

use crate::pipelines::contexts::CheckoutHalt;

/// 303 See Other, so a form POST is followed by a GET.
pub fn redirect(location: &str) -> HttpResponse {
  HttpResponse::SeeOther()
    .insert_header((header::LOCATION, location))
    .finish()
}

pub fn notice(message: &str, link: &str) -> HttpResponse {
  HttpResponse::Ok().json(json!({ "message": message, "link": link }))
}

/// An order flow that stopped before writing anything.
pub fn halted(halt: CheckoutHalt) -> HttpResponse {
  let (code, message, link) = match halt {
    CheckoutHalt::EmptyCart => ("empty_cart", "Your cart is empty, add something first.", "/"),
    CheckoutHalt::PaymentExpired => (
      "payment_expired",
      "Payment timed out and the order was not placed. Please restart checkout.",
      "/checkout",
    ),
    CheckoutHalt::CartChanged => (
      "cart_changed",
      "Your cart changed after payment started and the order was not placed. Please review it and pay again.",
      "/checkout",
    ),
  };
  HttpResponse::Ok().json(json!({ "halt": code, "message": message, "link": link }))
}
