use actix_multipart::form::MultipartFormConfig;
use actix_web::web;

use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, catalog_handlers, checkout_handlers, feedback_handlers,
  profile_handlers,
};

/// Up to four product images per upload.
const UPLOAD_LIMIT_BYTES: usize = 32 * 1024 * 1024;

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      MultipartFormConfig::default()
        .total_limit(UPLOAD_LIMIT_BYTES)
        .memory_limit(UPLOAD_LIMIT_BYTES),
    )
    // Catalog
    .route("/", web::get().to(catalog_handlers::home_handler))
    .route("/health", web::get().to(catalog_handlers::health_check_handler))
    .route("/product/{id}", web::get().to(catalog_handlers::product_detail_handler))
    // Accounts
    .service(
      web::resource("/register")
        .route(web::get().to(auth_handlers::register_form_handler))
        .route(web::post().to(auth_handlers::register_handler)),
    )
    .service(
      web::resource("/login")
        .route(web::get().to(auth_handlers::login_form_handler))
        .route(web::post().to(auth_handlers::login_handler)),
    )
    .route("/logout", web::get().to(auth_handlers::logout_handler))
    .route("/profile", web::get().to(profile_handlers::profile_handler))
    .route("/profile/updateField", web::post().to(profile_handlers::update_field_handler))
    // Cart
    .route("/cart", web::get().to(cart_handlers::view_cart_handler))
    .route("/cart/add", web::post().to(cart_handlers::add_to_cart_handler))
    .route("/cart/update", web::post().to(cart_handlers::update_cart_handler))
    .route("/cart/remove", web::post().to(cart_handlers::remove_from_cart_handler))
    .route("/cart/checkout", web::post().to(cart_handlers::cart_checkout_handler))
    // Checkout and payment
    .route("/checkout", web::get().to(checkout_handlers::checkout_view_handler))
    .route("/payment", web::get().to(checkout_handlers::payment_view_handler))
    .route("/order-confirm", web::post().to(checkout_handlers::order_confirm_handler))
    .route("/order/{product_id}", web::post().to(checkout_handlers::direct_order_handler))
    // Feedback
    .service(
      web::resource("/feedback")
        .route(web::get().to(feedback_handlers::feedback_form_handler))
        .route(web::post().to(feedback_handlers::feedback_handler)),
    )
    // Admin
    .service(
      web::scope("/admin")
        .route("", web::get().to(admin_handlers::admin_home_handler))
        .service(
          web::resource("/add")
            .route(web::get().to(admin_handlers::add_product_form_handler))
            .route(web::post().to(admin_handlers::quick_add_product_handler)),
        )
        .service(
          web::resource("/add-product")
            .route(web::get().to(admin_handlers::add_product_form_handler))
            .route(web::post().to(admin_handlers::add_product_handler)),
        )
        .route("/delete/{id}", web::post().to(admin_handlers::delete_product_handler))
        .route("/toggle-status/{id}", web::post().to(admin_handlers::toggle_status_handler))
        .route("/orders", web::get().to(admin_handlers::orders_handler))
        .route("/orders/{id}/print", web::get().to(admin_handlers::print_order_handler))
        .route("/collections/add", web::post().to(admin_handlers::add_collection_handler)),
    );
}
