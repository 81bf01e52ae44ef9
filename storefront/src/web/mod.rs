pub mod guards;
pub mod handlers;
pub mod remember_me;
pub mod responses;
pub mod routes;
pub mod session;

pub use remember_me::restore_remembered_user;
pub use routes::configure_app_routes;
pub use session::{session_middleware, MemorySessionStore};
