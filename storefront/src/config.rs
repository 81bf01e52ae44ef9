use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  /// Process-local store; data is lost on restart.
  Memory,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
  pub host: String,
  pub port: u16,
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
  pub username: String,
  pub password: String,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store_backend: StoreBackend,
  pub database_url: Option<String>,

  /// Signs session cookies and remember-me tokens. At least 32 bytes.
  pub session_secret: String,
  pub session_ttl_minutes: i64,
  pub remember_me_days: i64,
  pub secure_cookies: bool,

  pub image_dir: PathBuf,
  pub payment_window_minutes: i64,
  pub shipping_cents: i64,

  pub smtp: Option<SmtpConfig>,
  pub mail_from: String,
  pub feedback_inbox: String,

  pub admin_bootstrap: Option<AdminBootstrap>,
  pub json_logs: bool,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("store_backend", &self.store_backend)
      .field("session_ttl_minutes", &self.session_ttl_minutes)
      .field("remember_me_days", &self.remember_me_days)
      .field("secure_cookies", &self.secure_cookies)
      .field("image_dir", &self.image_dir)
      .field("payment_window_minutes", &self.payment_window_minutes)
      .field("shipping_cents", &self.shipping_cents)
      .field("smtp_configured", &self.smtp.is_some())
      .field("feedback_inbox", &self.feedback_inbox)
      .finish_non_exhaustive()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any key lookup. `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let required = |name: &str| get(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{name}'")));

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or("SERVER_PORT", get("SERVER_PORT").or_else(|| get("PORT")), 8080u16)?;

    let store_backend = match get("STORE_BACKEND").as_deref() {
      None | Some("postgres") => StoreBackend::Postgres,
      Some("memory") => StoreBackend::Memory,
      Some(other) => return Err(AppError::Config(format!("Invalid STORE_BACKEND '{other}'"))),
    };
    let database_url = match store_backend {
      StoreBackend::Postgres => Some(required("DATABASE_URL")?),
      StoreBackend::Memory => get("DATABASE_URL"),
    };

    let session_secret = required("SESSION_SECRET")?;
    if session_secret.len() < 32 {
      return Err(AppError::Config("SESSION_SECRET must be at least 32 bytes".to_string()));
    }

    let smtp = match get("SMTP_HOST") {
      Some(host) => Some(SmtpConfig {
        host,
        port: parse_or("SMTP_PORT", get("SMTP_PORT"), 587u16)?,
        username: required("SMTP_USERNAME")?,
        password: required("SMTP_PASSWORD")?,
      }),
      None => None,
    };
    let mail_from = get("MAIL_FROM")
      .or_else(|| smtp.as_ref().map(|s| s.username.clone()))
      .unwrap_or_else(|| "noreply@storefront.local".to_string());
    let feedback_inbox = get("FEEDBACK_INBOX").unwrap_or_else(|| mail_from.clone());

    let admin_bootstrap = match (get("ADMIN_USERNAME"), get("ADMIN_PASSWORD")) {
      (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
      (None, None) => None,
      _ => {
        return Err(AppError::Config(
          "ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string(),
        ))
      }
    };

    let config = Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      session_secret,
      session_ttl_minutes: parse_or("SESSION_TTL_MINUTES", get("SESSION_TTL_MINUTES"), 24 * 60)?,
      remember_me_days: parse_or("REMEMBER_ME_DAYS", get("REMEMBER_ME_DAYS"), 30)?,
      secure_cookies: parse_or("SECURE_COOKIES", get("SECURE_COOKIES"), false)?,
      image_dir: get("IMAGE_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("public/images")),
      payment_window_minutes: parse_or("PAYMENT_WINDOW_MINUTES", get("PAYMENT_WINDOW_MINUTES"), 10)?,
      shipping_cents: parse_or("SHIPPING_CENTS", get("SHIPPING_CENTS"), 1000)?,
      smtp,
      mail_from,
      feedback_inbox,
      admin_bootstrap,
      json_logs: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
    };

    tracing::info!("Application configuration loaded successfully.");
    Ok(config)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {name} '{value}': {e}"))),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  const SECRET: &str = "0123456789abcdef0123456789abcdef-test";

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_apply_for_memory_backend() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory"), ("SESSION_SECRET", SECRET)])).unwrap();
    assert_eq!(cfg.server_port, 8080);
    assert_eq!(cfg.payment_window_minutes, 10);
    assert_eq!(cfg.shipping_cents, 1000);
    assert!(cfg.smtp.is_none());
    assert!(cfg.database_url.is_none());
  }

  #[test]
  fn postgres_backend_requires_database_url() {
    let err = AppConfig::from_lookup(lookup_from(&[("SESSION_SECRET", SECRET)])).unwrap_err();
    assert!(err.to_string().contains("DATABASE_URL"));
  }

  #[test]
  fn port_falls_back_to_port_variable() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
      ("STORE_BACKEND", "memory"),
      ("SESSION_SECRET", SECRET),
      ("PORT", "3000"),
    ]))
    .unwrap();
    assert_eq!(cfg.bind_address(), "127.0.0.1:3000");
  }

  #[test]
  fn short_session_secret_is_rejected() {
    let err =
      AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory"), ("SESSION_SECRET", "short")])).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
  }

  #[test]
  fn half_configured_admin_is_rejected() {
    let err = AppConfig::from_lookup(lookup_from(&[
      ("STORE_BACKEND", "memory"),
      ("SESSION_SECRET", SECRET),
      ("ADMIN_USERNAME", "root"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("ADMIN_PASSWORD"));
  }
}
