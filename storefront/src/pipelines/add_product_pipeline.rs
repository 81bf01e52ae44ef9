use std::sync::Arc;

use shopflow::{ContextData, Pipeline, PipelineControl, Registry, SkipCondition};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::product::parse_price_cents;
use crate::models::NewProduct;
use crate::pipelines::contexts::AddProductCtxData;

fn retry_link(ctx: &AddProductCtxData) -> &'static str {
  if ctx.collection_required {
    "/admin/add-product"
  } else {
    "/admin/add"
  }
}

fn collection_name(ctx: &AddProductCtxData) -> Option<String> {
  ctx
    .collection_name
    .as_deref()
    .map(str::trim)
    .filter(|name| !name.is_empty())
    .map(str::to_string)
}

pub fn register_add_product_pipeline(flows: &Registry<AppError>) {
  let no_uploads: SkipCondition<AddProductCtxData> =
    Arc::new(|ctx_data: ContextData<AddProductCtxData>| ctx_data.read().uploads.is_empty());
  let no_collection: SkipCondition<AddProductCtxData> =
    Arc::new(|ctx_data: ContextData<AddProductCtxData>| collection_name(&ctx_data.read()).is_none());

  let mut p = Pipeline::<AddProductCtxData, AppError>::new(&[
    ("validate_product_form", false, None),
    ("store_product_images", false, Some(no_uploads)),
    ("resolve_collection", false, Some(no_collection)),
    ("insert_product", false, None),
  ]);

  p.on_root("validate_product_form", |ctx_data: ContextData<AddProductCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let retry = retry_link(&guard);

      if guard.product_name.trim().is_empty() {
        return Err(AppError::form("Product name is required.", retry));
      }
      if guard.collection_required && collection_name(&guard).is_none() {
        return Err(AppError::form("Collection name is required.", retry));
      }
      let quantity = guard
        .quantity
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|q| *q >= 0)
        .ok_or_else(|| AppError::form("Quantity must be a whole number of zero or more.", retry))?;
      let price_cents =
        parse_price_cents(&guard.price).map_err(|_| AppError::form("Price must look like 25 or 25.50.", retry))?;

      guard.parsed_quantity = quantity;
      guard.price_cents = price_cents;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("store_product_images", |ctx_data: ContextData<AddProductCtxData>| {
    Box::pin(async move {
      let (uploads, images) = {
        let mut guard = ctx_data.write();
        (std::mem::take(&mut guard.uploads), guard.app_state.images.clone())
      };

      for upload in uploads {
        let path = images.save(upload.file_name.as_deref(), &upload.bytes).await?;
        debug!(slot = upload.slot, %path, "Product image saved.");
        {
          let mut guard = ctx_data.write();
          if let Some(slot) = guard.images.0.get_mut(upload.slot) {
            *slot = Some(path);
          }
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("resolve_collection", |ctx_data: ContextData<AddProductCtxData>| {
    Box::pin(async move {
      let (name, store) = {
        let guard = ctx_data.read();
        (collection_name(&guard), guard.app_state.store.clone())
      };
      if let Some(name) = name {
        let collection = store.find_or_create_collection(&name).await?;
        ctx_data.write().collection_id = Some(collection.id);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("insert_product", |ctx_data: ContextData<AddProductCtxData>| {
    Box::pin(async move {
      let (new_product, store) = {
        let guard = ctx_data.read();
        let new_product = NewProduct {
          name: guard.product_name.trim().to_string(),
          collection_id: guard.collection_id,
          quantity: guard.parsed_quantity,
          price_cents: guard.price_cents,
          images: guard.images.clone(),
        };
        (new_product, guard.app_state.store.clone())
      };
      let product = store.create_product(new_product).await?;
      info!(product_id = %product.id, name = %product.name, "Product added.");
      ctx_data.write().created_product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
}
