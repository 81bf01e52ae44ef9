use std::sync::Arc;

use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront::config::{AdminBootstrap, AppConfig, StoreBackend};
use storefront::errors::AppError;
use storefront::models::{NewUser, Role};
use storefront::services::auth_service;
use storefront::services::image_store::FsImageStore;
use storefront::services::mailer::{ConsoleMailer, Mailer, SmtpMailer};
use storefront::state::AppState;
use storefront::store::{MemoryStore, PgStore, Store};
use storefront::web::{self as storefront_web, MemorySessionStore};

fn init_tracing(json: bool) {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, AppError> {
  match config.store_backend {
    StoreBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let store = PgStore::connect(url).await?;
      store.migrate().await?;
      tracing::info!("Connected to PostgreSQL and applied migrations.");
      Ok(Arc::new(store))
    }
    StoreBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on restart.");
      Ok(Arc::new(MemoryStore::new()))
    }
  }
}

async fn ensure_admin(store: &dyn Store, bootstrap: &AdminBootstrap) -> Result<(), AppError> {
  if store.find_user_by_username(&bootstrap.username).await?.is_some() {
    return Ok(());
  }
  let password_hash = auth_service::hash_password_async(bootstrap.password.clone()).await?;
  let admin = store
    .create_user(NewUser {
      username: bootstrap.username.clone(),
      password_hash,
      email: String::new(),
      address: String::new(),
      phone: String::new(),
      payment_method: String::new(),
      role: Role::Admin,
    })
    .await?;
  tracing::info!(user_id = %admin.id, username = %admin.username, "Bootstrap admin created.");
  Ok(())
}

async fn build_state(config: Arc<AppConfig>) -> Result<AppState, AppError> {
  let store = open_store(&config).await?;
  if let Some(bootstrap) = config.admin_bootstrap.as_ref() {
    ensure_admin(store.as_ref(), bootstrap).await?;
  }

  let mailer: Arc<dyn Mailer> = match config.smtp.as_ref() {
    Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
    None => {
      tracing::warn!("SMTP not configured; feedback mail is only logged.");
      Arc::new(ConsoleMailer)
    }
  };
  let images = Arc::new(FsImageStore::new(config.image_dir.clone()));

  Ok(AppState::new(store, config, mailer, images))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let config = match AppConfig::from_env() {
    Ok(config) => Arc::new(config),
    Err(e) => {
      init_tracing(false);
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };
  init_tracing(config.json_logs);
  tracing::info!(?config, "Starting storefront server...");

  let app_state = build_state(config.clone()).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to initialise application state.");
    std::io::Error::other(e.to_string())
  })?;
  let sessions = MemorySessionStore::new();

  let server_address = config.bind_address();
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .configure(storefront_web::configure_app_routes)
      .wrap(from_fn(storefront_web::restore_remembered_user))
      .wrap(storefront_web::session_middleware(&app_state.config, sessions.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
  })
  .bind(&server_address)?
  .run()
  .await
}
