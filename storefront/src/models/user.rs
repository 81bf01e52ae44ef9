use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};

use super::UserId;
use crate::errors::AppError;

/// Payment method label that carries a card number.
pub const VISA_CARD: &str = "VISA Card";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: UserId,
  pub username: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub email: String,
  pub address: String,
  pub phone: String,
  pub payment_method: String,
  #[serde(skip_serializing)]
  pub card_number: Option<String>,
  pub role: Role,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }

  /// Last four digits only, e.g. `**** 4242`.
  pub fn masked_card_number(&self) -> Option<String> {
    let digits: Vec<char> = self.card_number.as_deref()?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
      return None;
    }
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    Some(format!("**** {tail}"))
  }
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub password_hash: String,
  pub email: String,
  pub address: String,
  pub phone: String,
  pub payment_method: String,
  pub role: Role,
}

/// The signed-in identity kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id: UserId,
  pub username: String,
  pub role: Role,
}

impl From<&User> for SessionUser {
  fn from(user: &User) -> Self {
    SessionUser {
      id: user.id,
      username: user.username.clone(),
      role: user.role,
    }
  }
}

/// One editable profile field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
  Email(String),
  Address(String),
  Phone(String),
  /// A VISA card keeps its number; every other method clears it.
  PaymentMethod { method: String, card_number: Option<String> },
}

impl ProfileUpdate {
  pub fn parse(field: &str, value: String, card_number: Option<String>) -> Result<Self, AppError> {
    match field {
      "email" => Ok(ProfileUpdate::Email(value)),
      "address" => Ok(ProfileUpdate::Address(value)),
      "phone" => Ok(ProfileUpdate::Phone(value)),
      "paymentmethod" => {
        let card_number = if value == VISA_CARD {
          Some(card_number.unwrap_or_default())
        } else {
          None
        };
        Ok(ProfileUpdate::PaymentMethod {
          method: value,
          card_number,
        })
      }
      other => Err(AppError::Validation(format!("Invalid field: {other}"))),
    }
  }
}
