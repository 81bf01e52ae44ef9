pub mod auth_service;
pub mod image_store;
pub mod mailer;
pub mod remember;
