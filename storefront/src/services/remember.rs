//! Remember-me tokens: `user_id.expires_at.nonce.signature`, where the signature is
//! a hex HMAC-SHA256 over the first three fields keyed with the session secret.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserId;

type HmacSha256 = Hmac<Sha256>;

pub const REMEMBER_COOKIE: &str = "remember_user";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RememberError {
  #[error("token is malformed")]
  Malformed,
  #[error("token signature does not match")]
  BadSignature,
  #[error("token has expired")]
  Expired,
  #[error("signing key rejected")]
  InvalidKey,
}

fn mac_for(secret: &[u8], payload: &str) -> Result<HmacSha256, RememberError> {
  let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| RememberError::InvalidKey)?;
  mac.update(payload.as_bytes());
  Ok(mac)
}

pub fn issue(user_id: UserId, secret: &[u8], now: DateTime<Utc>, ttl: Duration) -> Result<String, RememberError> {
  let expires_at = (now + ttl).timestamp();
  let payload = format!("{}.{}.{}", user_id, expires_at, Uuid::new_v4().simple());
  let signature = hex::encode(mac_for(secret, &payload)?.finalize().into_bytes());
  Ok(format!("{payload}.{signature}"))
}

/// Returns the user id carried by a valid, unexpired token.
pub fn verify(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<UserId, RememberError> {
  let (payload, signature_hex) = token.rsplit_once('.').ok_or(RememberError::Malformed)?;
  let mut fields = payload.split('.');
  let (Some(user_id), Some(expires_at), Some(_nonce), None) = (fields.next(), fields.next(), fields.next(), fields.next())
  else {
    return Err(RememberError::Malformed);
  };

  let signature = hex::decode(signature_hex).map_err(|_| RememberError::Malformed)?;
  mac_for(secret, payload)?
    .verify_slice(&signature)
    .map_err(|_| RememberError::BadSignature)?;

  let expires_at: i64 = expires_at.parse().map_err(|_| RememberError::Malformed)?;
  if now.timestamp() >= expires_at {
    return Err(RememberError::Expired);
  }
  user_id.parse::<i64>().map(UserId).map_err(|_| RememberError::Malformed)
}
