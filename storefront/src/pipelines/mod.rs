//! Business flows registered with the `shopflow` registry at startup.
//!
//! Handlers build the matching context, run it through `AppState::flows` and read
//! the outcome back from the context.

use shopflow::Registry;

use crate::errors::AppError;

pub mod contexts;

pub mod add_product_pipeline;
pub mod checkout_pipeline;
pub mod feedback_pipeline;
pub mod payment_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

pub fn register_all_pipelines(flows: &Registry<AppError>) {
  signup_pipeline::register_signup_pipeline(flows);
  signin_pipeline::register_signin_pipeline(flows);
  checkout_pipeline::register_checkout_pipeline(flows);
  payment_pipeline::register_payment_pipeline(flows);
  add_product_pipeline::register_add_product_pipeline(flows);
  feedback_pipeline::register_feedback_pipeline(flows);
  tracing::info!("Storefront pipelines registered.");
}
