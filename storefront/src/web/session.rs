//! Server-side sessions: a process-local `actix_session` store plus typed access to
//! the cart, the signed-in user and the payment snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_session::config::PersistentSession;
use actix_session::storage::{LoadError, SaveError, SessionKey, SessionStore, UpdateError};
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::{time, Key, SameSite};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{Cart, PaymentSnapshot, SessionUser};

pub const SESSION_COOKIE: &str = "storefront_session";

const CART_KEY: &str = "cart";
const USER_KEY: &str = "user";
const PAYMENT_KEY: &str = "payment";

/// Every this many new sessions, expired ones are swept out.
const SWEEP_EVERY: usize = 64;

type SessionState = HashMap<String, String>;

struct StoredSession {
  state: SessionState,
  expires_at: DateTime<Utc>,
}

/// Sessions kept in process memory. Expired entries are dropped when loaded and
/// swept periodically as new sessions are created.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
  sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
  saves: Arc<AtomicUsize>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Removes every expired session and returns how many were dropped.
  pub fn purge_expired(&self) -> usize {
    let now = Utc::now();
    let mut sessions = self.sessions.write();
    let before = sessions.len();
    sessions.retain(|_, stored| stored.expires_at > now);
    let dropped = before - sessions.len();
    if dropped > 0 {
      debug!(dropped, remaining = sessions.len(), "Swept expired sessions.");
    }
    dropped
  }

  fn expiry(ttl: &time::Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(ttl.whole_seconds())
  }
}

impl SessionStore for MemorySessionStore {
  async fn load(&self, session_key: &SessionKey) -> Result<Option<SessionState>, LoadError> {
    let key = session_key.as_ref();
    let now = Utc::now();
    match self.sessions.read().get(key) {
      None => return Ok(None),
      Some(stored) if stored.expires_at > now => return Ok(Some(stored.state.clone())),
      Some(_) => {}
    }
    debug!("Dropping expired session.");
    self.sessions.write().remove(key);
    Ok(None)
  }

  async fn save(&self, session_state: SessionState, ttl: &time::Duration) -> Result<SessionKey, SaveError> {
    let raw_key = Uuid::new_v4().simple().to_string();
    let session_key: SessionKey = raw_key
      .clone()
      .try_into()
      .map_err(|e| SaveError::Other(anyhow::anyhow!("invalid session key: {e:?}")))?;
    if self.saves.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
      self.purge_expired();
    }
    self.sessions.write().insert(
      raw_key,
      StoredSession {
        state: session_state,
        expires_at: Self::expiry(ttl),
      },
    );
    Ok(session_key)
  }

  async fn update(
    &self,
    session_key: SessionKey,
    session_state: SessionState,
    ttl: &time::Duration,
  ) -> Result<SessionKey, UpdateError> {
    let refreshed = {
      let mut sessions = self.sessions.write();
      match sessions.get_mut(session_key.as_ref()) {
        Some(stored) => {
          stored.state = session_state.clone();
          stored.expires_at = Self::expiry(ttl);
          true
        }
        None => false,
      }
    };
    if refreshed {
      return Ok(session_key);
    }
    self
      .save(session_state, ttl)
      .await
      .map_err(|e| UpdateError::Other(anyhow::anyhow!("could not re-create session: {e}")))
  }

  async fn update_ttl(&self, session_key: &SessionKey, ttl: &time::Duration) -> Result<(), anyhow::Error> {
    if let Some(stored) = self.sessions.write().get_mut(session_key.as_ref()) {
      stored.expires_at = Self::expiry(ttl);
    }
    Ok(())
  }

  async fn delete(&self, session_key: &SessionKey) -> Result<(), anyhow::Error> {
    self.sessions.write().remove(session_key.as_ref());
    Ok(())
  }
}

pub fn session_middleware(config: &AppConfig, store: MemorySessionStore) -> SessionMiddleware<MemorySessionStore> {
  SessionMiddleware::builder(store, Key::derive_from(config.session_secret.as_bytes()))
    .cookie_name(SESSION_COOKIE.to_string())
    .cookie_secure(config.secure_cookies)
    .cookie_http_only(true)
    .cookie_same_site(SameSite::Lax)
    .session_lifecycle(PersistentSession::default().session_ttl(time::Duration::minutes(config.session_ttl_minutes)))
    .build()
}

fn session_err(e: impl std::fmt::Display) -> AppError {
  AppError::Session(e.to_string())
}

/// A missing or unreadable cart is an empty cart.
pub fn load_cart(session: &Session) -> Cart {
  match session.get::<Cart>(CART_KEY) {
    Ok(cart) => cart.unwrap_or_default(),
    Err(e) => {
      tracing::warn!(error = %e, "Discarding unreadable session cart.");
      Cart::default()
    }
  }
}

pub fn store_cart(session: &Session, cart: &Cart) -> Result<(), AppError> {
  session.insert(CART_KEY, cart).map_err(session_err)
}

pub fn clear_cart(session: &Session) {
  session.remove(CART_KEY);
}

pub fn current_user(session: &Session) -> Result<Option<SessionUser>, AppError> {
  session.get::<SessionUser>(USER_KEY).map_err(session_err)
}

pub fn store_user(session: &Session, user: &SessionUser) -> Result<(), AppError> {
  session.insert(USER_KEY, user).map_err(session_err)
}

pub fn payment_snapshot(session: &Session) -> Option<PaymentSnapshot> {
  session.get::<PaymentSnapshot>(PAYMENT_KEY).ok().flatten()
}

pub fn store_payment_snapshot(session: &Session, snapshot: &PaymentSnapshot) -> Result<(), AppError> {
  session.insert(PAYMENT_KEY, snapshot).map_err(session_err)
}

pub fn clear_payment_snapshot(session: &Session) {
  session.remove(PAYMENT_KEY);
}
