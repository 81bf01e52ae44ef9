mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use storefront::models::{Cart, OrderStatus, PaymentSnapshot, ProductId, Role};
use storefront::pipelines::contexts::{CheckoutHalt, ConfirmPaymentCtxData, PlaceOrderCtxData};
use storefront::store::Store;

#[actix_web::test]
async fn checkout_writes_one_order_and_empties_the_cart() {
  let ctx = test_context();
  let alice = seed_user(&ctx.store, "alice", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, Some("Summer")).await;
  let cap = seed_product(&ctx.store, "Cap", 1200, Some("Summer")).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "alice");
  add_to_cart!(app, jar, shirt.id.0, "2", "M");
  add_to_cart!(app, jar, cap.id.0, "1", "");

  let req = test::TestRequest::post().uri("/cart/checkout").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let mut next = Some(jar.clone());
  carry_session(&resp, &mut next);
  jar = next.unwrap();
  let body = read_json(resp).await;
  assert!(body["orderId"].is_number());

  let orders = ctx.store.orders_for_user(alice.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  let order = &orders[0];
  assert_eq!(order.status, OrderStatus::Placed);
  assert_eq!(order.lines.len(), 2);
  assert_eq!(order.lines[0].product_name, "Shirt");
  assert_eq!(order.lines[0].size.as_deref(), Some("M"));
  assert_eq!(order.total_cents, 2 * 2500 + 1200);

  let req = test::TestRequest::get().uri("/cart").cookie(jar).to_request();
  let cart = read_json(test::call_service(&app, req).await).await;
  assert_eq!(cart["cartCount"], 0);
}

#[actix_web::test]
async fn empty_cart_checkout_writes_nothing() {
  let ctx = test_context();
  seed_user(&ctx.store, "bob", Role::User).await;
  let app = init_app!(ctx);
  let jar = login!(app, "bob");

  let req = test::TestRequest::post().uri("/cart/checkout").cookie(jar).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = read_json(resp).await;
  assert_eq!(body["halt"], "empty_cart");
  assert_eq!(ctx.store.order_count(), 0);
}

#[actix_web::test]
async fn checkout_requires_login() {
  let ctx = test_context();
  let app = init_app!(ctx);

  let req = test::TestRequest::post().uri("/cart/checkout").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&resp).as_deref(), Some("/login"));
}

#[actix_web::test]
async fn failed_write_keeps_cart_and_leaves_no_order() {
  let ctx = test_context();
  seed_user(&ctx.store, "carol", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let cap = seed_product(&ctx.store, "Cap", 1200, None).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "carol");
  add_to_cart!(app, jar, shirt.id.0, "1", "");
  add_to_cart!(app, jar, cap.id.0, "3", "");

  ctx.store.fail_next_order_at_line(1);
  let req = test::TestRequest::post().uri("/cart/checkout").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(ctx.store.order_count(), 0);

  let req = test::TestRequest::get().uri("/cart").cookie(jar).to_request();
  let cart = read_json(test::call_service(&app, req).await).await;
  assert_eq!(cart["items"].as_array().unwrap().len(), 2);
  assert_eq!(cart["cartCount"], 4);
}

#[actix_web::test]
async fn product_deleted_after_carting_rolls_back() {
  let ctx = test_context();
  seed_user(&ctx.store, "dave", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "dave");
  add_to_cart!(app, jar, shirt.id.0, "1", "");
  assert!(ctx.store.delete_product(shirt.id).await.unwrap());

  let req = test::TestRequest::post().uri("/cart/checkout").cookie(jar).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(ctx.store.order_count(), 0);
}

#[actix_web::test]
async fn direct_order_leaves_the_cart_alone() {
  let ctx = test_context();
  let erin = seed_user(&ctx.store, "erin", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let cap = seed_product(&ctx.store, "Cap", 1200, None).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "erin");
  add_to_cart!(app, jar, shirt.id.0, "1", "S");

  let req = test::TestRequest::post()
    .uri(&format!("/order/{}", cap.id.0))
    .cookie(jar.clone())
    .set_form(json!({ "quantity": "3" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let orders = ctx.store.orders_for_user(erin.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].lines.len(), 1);
  assert_eq!(orders[0].lines[0].quantity, 3);
  assert_eq!(orders[0].total_cents, 3600);

  let req = test::TestRequest::get().uri("/cart").cookie(jar).to_request();
  let cart = read_json(test::call_service(&app, req).await).await;
  assert_eq!(cart["cartCount"], 1);
}

#[actix_web::test]
async fn direct_order_for_unknown_product_is_not_found() {
  let ctx = test_context();
  seed_user(&ctx.store, "finn", Role::User).await;
  let app = init_app!(ctx);
  let jar = login!(app, "finn");

  let req = test::TestRequest::post()
    .uri("/order/9999")
    .cookie(jar)
    .set_form(json!({}))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn payment_flow_writes_a_paid_order_with_shipping() {
  let ctx = test_context();
  let gina = seed_user(&ctx.store, "gina", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "gina");
  add_to_cart!(app, jar, shirt.id.0, "2", "L");

  let req = test::TestRequest::get().uri("/payment").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let mut next = Some(jar.clone());
  carry_session(&resp, &mut next);
  jar = next.unwrap();
  let body = read_json(resp).await;
  assert_eq!(body["payment"]["subtotalCents"], 5000);
  assert_eq!(body["payment"]["grandTotalCents"], 6000);

  let req = test::TestRequest::post().uri("/order-confirm").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = read_json(resp).await;
  assert!(body["orderId"].is_number());

  let orders = ctx.store.orders_for_user(gina.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].status, OrderStatus::Paid);
  assert_eq!(orders[0].shipping_cents, 1000);
  assert_eq!(orders[0].total_cents, 6000);
}

#[actix_web::test]
async fn lines_added_after_payment_page_block_confirmation() {
  let ctx = test_context();
  let kim = seed_user(&ctx.store, "kim", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let cap = seed_product(&ctx.store, "Cap", 1200, None).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "kim");
  add_to_cart!(app, jar, shirt.id.0, "1", "");

  let req = test::TestRequest::get().uri("/payment").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  let mut next = Some(jar.clone());
  carry_session(&resp, &mut next);
  jar = next.unwrap();

  add_to_cart!(app, jar, cap.id.0, "3", "");

  let req = test::TestRequest::post().uri("/order-confirm").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let mut next = Some(jar.clone());
  carry_session(&resp, &mut next);
  jar = next.unwrap();
  let body = read_json(resp).await;
  assert_eq!(body["halt"], "cart_changed");
  assert_eq!(ctx.store.order_count(), 0);

  // Both lines are still in the cart.
  let req = test::TestRequest::get().uri("/cart").cookie(jar.clone()).to_request();
  let cart = read_json(test::call_service(&app, req).await).await;
  assert_eq!(cart["items"].as_array().unwrap().len(), 2);
  assert_eq!(cart["cartCount"], 4);

  // The stale snapshot is gone, so confirming again asks for a fresh payment page.
  let req = test::TestRequest::post().uri("/order-confirm").cookie(jar.clone()).to_request();
  let body = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["halt"], "payment_expired");

  let req = test::TestRequest::get().uri("/payment").cookie(jar.clone()).to_request();
  let resp = test::call_service(&app, req).await;
  let mut next = Some(jar.clone());
  carry_session(&resp, &mut next);
  jar = next.unwrap();
  assert_eq!(read_json(resp).await["payment"]["grandTotalCents"], 2500 + 3 * 1200 + 1000);

  let req = test::TestRequest::post().uri("/order-confirm").cookie(jar).to_request();
  let body = read_json(test::call_service(&app, req).await).await;
  assert!(body["orderId"].is_number());

  let orders = ctx.store.orders_for_user(kim.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].lines.len(), 2);
  assert_eq!(orders[0].lines[1].product_name, "Cap");
  assert_eq!(orders[0].lines[1].quantity, 3);
}

#[actix_web::test]
async fn order_confirm_without_payment_page_is_expired() {
  let ctx = test_context();
  seed_user(&ctx.store, "hank", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let app = init_app!(ctx);

  let mut jar = login!(app, "hank");
  add_to_cart!(app, jar, shirt.id.0, "1", "");

  let req = test::TestRequest::post().uri("/order-confirm").cookie(jar).to_request();
  let body = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["halt"], "payment_expired");
  assert_eq!(ctx.store.order_count(), 0);
}

#[actix_web::test]
async fn confirming_after_the_window_writes_nothing() {
  let ctx = test_context();
  let ivy = seed_user(&ctx.store, "ivy", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;

  let cart = Cart::default().add(shirt.id, 1, None);
  let view = cart.price(std::slice::from_ref(&shirt));
  let started_at = Utc::now();
  let snapshot = PaymentSnapshot::from_view(&view, 1000, started_at);

  let late = ContextData::new(ConfirmPaymentCtxData::new(
    ctx.state.clone(),
    Some(ivy.id),
    cart.clone(),
    Some(snapshot.clone()),
    started_at + Duration::minutes(11),
  ));
  let result = ctx.state.flows.run(late.clone()).await.unwrap();
  assert_eq!(result, PipelineResult::Stopped);
  assert_eq!(late.read().halt, Some(CheckoutHalt::PaymentExpired));
  assert_eq!(ctx.store.order_count(), 0);

  let on_time = ContextData::new(ConfirmPaymentCtxData::new(
    ctx.state.clone(),
    Some(ivy.id),
    cart,
    Some(snapshot),
    started_at + Duration::minutes(10),
  ));
  let result = ctx.state.flows.run(on_time.clone()).await.unwrap();
  assert_eq!(result, PipelineResult::Completed);
  assert_eq!(ctx.store.order_count(), 1);
}

#[actix_web::test]
async fn payment_checks_run_in_order() {
  let ctx = test_context();

  // Empty cart wins over a missing snapshot and a missing user.
  let empty = ContextData::new(ConfirmPaymentCtxData::new(
    ctx.state.clone(),
    None,
    Cart::default(),
    None,
    Utc::now(),
  ));
  assert_eq!(ctx.state.flows.run(empty.clone()).await.unwrap(), PipelineResult::Stopped);
  assert_eq!(empty.read().halt, Some(CheckoutHalt::EmptyCart));

  // A missing snapshot wins over a missing user.
  let one_line = Cart::default().add(ProductId(1), 1, None);
  let stale = ContextData::new(ConfirmPaymentCtxData::new(
    ctx.state.clone(),
    None,
    one_line,
    None,
    Utc::now(),
  ));
  assert_eq!(ctx.state.flows.run(stale.clone()).await.unwrap(), PipelineResult::Stopped);
  assert_eq!(stale.read().halt, Some(CheckoutHalt::PaymentExpired));

  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;
  let cart = Cart::default().add(shirt.id, 1, None);
  let snapshot = PaymentSnapshot::from_view(&cart.price(std::slice::from_ref(&shirt)), 1000, Utc::now());

  // A cart that differs from the snapshot wins over a missing user.
  let grown = ContextData::new(ConfirmPaymentCtxData::new(
    ctx.state.clone(),
    None,
    cart.clone().add(shirt.id, 1, None),
    Some(snapshot.clone()),
    Utc::now(),
  ));
  assert_eq!(ctx.state.flows.run(grown.clone()).await.unwrap(), PipelineResult::Stopped);
  assert_eq!(grown.read().halt, Some(CheckoutHalt::CartChanged));

  let anonymous = ContextData::new(ConfirmPaymentCtxData::new(
    ctx.state.clone(),
    None,
    cart,
    Some(snapshot),
    Utc::now(),
  ));
  let err = ctx.state.flows.run(anonymous).await.unwrap_err();
  assert!(matches!(err, storefront::errors::AppError::Unauthenticated));
  assert_eq!(ctx.store.order_count(), 0);
}

#[actix_web::test]
async fn order_writer_captures_price_at_commit() {
  let ctx = test_context();
  let jo = seed_user(&ctx.store, "jo", Role::User).await;
  let shirt = seed_product(&ctx.store, "Shirt", 2500, None).await;

  let cart = Cart::default().add(shirt.id, 2, Some("M".to_string()));
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(ctx.state.clone(), Some(jo.id), cart));
  assert_eq!(ctx.state.flows.run(ctx_data.clone()).await.unwrap(), PipelineResult::Completed);

  let guard = ctx_data.read();
  let order = guard.placed_order.as_ref().unwrap();
  assert_eq!(order.lines[0].unit_price_cents, 2500);
  assert_eq!(order.lines[0].product_id, Some(ProductId(shirt.id.0)));
  assert_eq!(order.total_cents, 5000);
}
