mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::*;
use serde_json::json;

#[actix_web::test]
async fn same_product_and_size_merge_into_one_line() {
  let ctx = test_context();
  let product = seed_product(&ctx.store, "Linen Shirt", 2500, Some("Summer")).await;
  let app = init_app!(ctx);
  let mut jar = None;

  for quantity in ["1", "1"] {
    let mut req = test::TestRequest::post()
      .uri("/cart/add")
      .set_form(json!({ "productId": product.id.0, "quantity": quantity, "size": "M" }));
    if let Some(cookie) = jar.clone() {
      req = req.cookie(cookie);
    }
    let resp = test::call_service(&app, req.to_request()).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/cart"));
    carry_session(&resp, &mut jar);
  }

  let req = test::TestRequest::get().uri("/cart").cookie(jar.clone().unwrap()).to_request();
  let body = read_json(test::call_service(&app, req).await).await;

  let items = body["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["quantity"], 2);
  assert_eq!(items[0]["size"], "M");
  assert_eq!(items[0]["lineTotalCents"], 5000);
  assert_eq!(body["totalCents"], 5000);
  assert_eq!(body["cartCount"], 2);
}

#[actix_web::test]
async fn bad_quantity_and_blank_size_fall_back_to_defaults() {
  let ctx = test_context();
  let product = seed_product(&ctx.store, "Cap", 1200, None).await;
  let app = init_app!(ctx);

  let req = test::TestRequest::post()
    .uri("/cart/add")
    .set_form(json!({ "productId": product.id.0, "quantity": "lots", "size": "  " }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  let mut jar = None;
  carry_session(&resp, &mut jar);

  let req = test::TestRequest::get().uri("/cart").cookie(jar.unwrap()).to_request();
  let body = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["items"][0]["quantity"], 1);
  assert!(body["items"][0]["size"].is_null());
}

#[actix_web::test]
async fn decreasing_a_single_item_removes_the_line() {
  let ctx = test_context();
  let shirt = seed_product(&ctx.store, "Shirt", 2000, None).await;
  let socks = seed_product(&ctx.store, "Socks", 500, None).await;
  let app = init_app!(ctx);
  let mut jar = None;

  for (id, size) in [(shirt.id.0, "L"), (socks.id.0, "")] {
    let mut req = test::TestRequest::post()
      .uri("/cart/add")
      .set_form(json!({ "productId": id, "size": size }));
    if let Some(cookie) = jar.clone() {
      req = req.cookie(cookie);
    }
    let resp = test::call_service(&app, req.to_request()).await;
    carry_session(&resp, &mut jar);
  }

  let req = test::TestRequest::post()
    .uri("/cart/update")
    .cookie(jar.clone().unwrap())
    .set_form(json!({ "productId": shirt.id.0, "size": "L", "action": "decrease" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::SEE_OTHER);
  carry_session(&resp, &mut jar);

  let req = test::TestRequest::get().uri("/cart").cookie(jar.unwrap()).to_request();
  let body = read_json(test::call_service(&app, req).await).await;
  let items = body["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["product"]["name"], "Socks");
}

#[actix_web::test]
async fn remove_without_size_drops_every_size_of_the_product() {
  let ctx = test_context();
  let shirt = seed_product(&ctx.store, "Shirt", 2000, None).await;
  let app = init_app!(ctx);
  let mut jar = None;

  for size in ["S", "M"] {
    let mut req = test::TestRequest::post()
      .uri("/cart/add")
      .set_form(json!({ "productId": shirt.id.0, "size": size }));
    if let Some(cookie) = jar.clone() {
      req = req.cookie(cookie);
    }
    let resp = test::call_service(&app, req.to_request()).await;
    carry_session(&resp, &mut jar);
  }

  let req = test::TestRequest::post()
    .uri("/cart/remove")
    .cookie(jar.clone().unwrap())
    .set_form(json!({ "productId": shirt.id.0 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  carry_session(&resp, &mut jar);

  let req = test::TestRequest::get().uri("/cart").cookie(jar.unwrap()).to_request();
  let body = read_json(test::call_service(&app, req).await).await;
  assert!(body["items"].as_array().unwrap().is_empty());
  assert_eq!(body["cartCount"], 0);
}

#[actix_web::test]
async fn cart_without_session_is_empty() {
  let ctx = test_context();
  let app = init_app!(ctx);

  let req = test::TestRequest::get().uri("/cart").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = read_json(resp).await;
  assert_eq!(body["cartCount"], 0);
  assert_eq!(body["totalCents"], 0);
}
