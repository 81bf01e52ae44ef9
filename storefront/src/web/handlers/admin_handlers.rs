use actix_multipart::form::bytes::Bytes as UploadedFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{OrderId, ProductId};
use crate::pipelines::contexts::{AddProductCtxData, ImageUpload};
use crate::state::AppState;
use crate::web::guards::AdminUser;
use crate::web::responses::{notice, redirect};

#[derive(MultipartForm)]
pub struct ProductUploadForm {
  #[multipart(rename = "productName")]
  pub product_name: Option<Text<String>>,
  #[multipart(rename = "collectionName")]
  pub collection_name: Option<Text<String>>,
  pub quantity: Option<Text<String>>,
  pub price: Option<Text<String>>,
  pub image: Option<UploadedFile>,
  pub image2: Option<UploadedFile>,
  pub image3: Option<UploadedFile>,
  pub image4: Option<UploadedFile>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddCollectionForm {
  #[serde(default)]
  pub collection_name: String,
}

fn text(field: Option<Text<String>>) -> String {
  field.map(Text::into_inner).unwrap_or_default()
}

impl ProductUploadForm {
  /// Files in slot order; parts a browser sends for an empty file input are dropped.
  fn uploads(&mut self) -> Vec<ImageUpload> {
    [
      self.image.take(),
      self.image2.take(),
      self.image3.take(),
      self.image4.take(),
    ]
    .into_iter()
    .enumerate()
    .filter_map(|(slot, file)| {
      let file = file?;
      if file.data.is_empty() {
        return None;
      }
      Some(ImageUpload {
        slot,
        file_name: file.file_name,
        bytes: file.data,
      })
    })
    .collect()
  }
}

#[instrument(name = "handler::admin_home", skip(app_state), fields(admin = %admin.0.username))]
pub async fn admin_home_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_products().await?;
  let collections = app_state.store.list_collections().await?;
  Ok(HttpResponse::Ok().json(json!({
    "username": admin.0.username,
    "products": products,
    "collections": collections,
  })))
}

pub async fn add_product_form_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let collections = app_state.store.list_collections().await?;
  Ok(HttpResponse::Ok().json(json!({ "collections": collections })))
}

async fn run_add_product(
  app_state: &web::Data<AppState>,
  mut form: ProductUploadForm,
  collection_required: bool,
) -> Result<(), AppError> {
  let uploads = form.uploads();
  let ctx_data = ContextData::new(AddProductCtxData::new(
    app_state.get_ref().clone(),
    text(form.product_name),
    form.collection_name.map(Text::into_inner),
    collection_required,
    text(form.quantity),
    text(form.price),
    uploads,
  ));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!("Add-product pipeline stopped without an error.");
      Err(AppError::Internal("Adding the product was halted.".to_string()))
    }
  }
}

/// `/admin/add-product`: the collection is required and the admin returns to the product list.
#[instrument(name = "handler::add_product", skip_all, fields(admin = %admin.0.username))]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  MultipartForm(form): MultipartForm<ProductUploadForm>,
) -> Result<HttpResponse, AppError> {
  run_add_product(&app_state, form, true).await?;
  Ok(redirect("/admin"))
}

/// `/admin/add`: the collection is optional.
#[instrument(name = "handler::quick_add_product", skip_all, fields(admin = %admin.0.username))]
pub async fn quick_add_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  MultipartForm(form): MultipartForm<ProductUploadForm>,
) -> Result<HttpResponse, AppError> {
  run_add_product(&app_state, form, false).await?;
  Ok(notice("Product added successfully!", "/admin"))
}

#[instrument(name = "handler::delete_product", skip(app_state), fields(admin = %admin.0.username))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = ProductId(path.into_inner());
  if app_state.store.delete_product(product_id).await? {
    info!(%product_id, "Product deleted.");
  }
  Ok(redirect("/admin"))
}

#[instrument(name = "handler::toggle_product_status", skip(app_state), fields(admin = %admin.0.username))]
pub async fn toggle_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product_id = ProductId(path.into_inner());
  let status = app_state
    .store
    .toggle_product_status(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  info!(%product_id, ?status, "Product status toggled.");
  Ok(redirect("/admin"))
}

#[instrument(name = "handler::admin_orders", skip_all)]
pub async fn orders_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.list_orders().await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::print_order", skip(app_state, _admin))]
pub async fn print_order_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .store
    .find_order(OrderId(path.into_inner()))
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::add_collection", skip(app_state, form), fields(admin = %admin.0.username))]
pub async fn add_collection_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  form: web::Form<AddCollectionForm>,
) -> Result<HttpResponse, AppError> {
  let name = form.collection_name.trim();
  if name.is_empty() {
    return Err(AppError::form("Collection name is required.", "/admin"));
  }
  let collection = app_state.store.find_or_create_collection(name).await?;
  info!(collection_id = %collection.id, name = %collection.name, "Collection ensured.");
  Ok(redirect("/admin"))
}
