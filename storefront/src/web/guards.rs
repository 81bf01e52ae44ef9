//! Request guards for protected routes.

use futures_util::future::{ready, Ready};

use actix_session::SessionExt;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::errors::AppError;
use crate::models::{Role, SessionUser};
use crate::web::session;

fn session_user(req: &HttpRequest) -> Result<Option<SessionUser>, AppError> {
  session::current_user(&req.get_session())
}

/// Any signed-in user; otherwise a 303 to `/login`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

impl FromRequest for CurrentUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(session_user(req).and_then(|user| user.map(CurrentUser).ok_or(AppError::Unauthenticated)))
  }
}

/// A signed-in admin. Anonymous callers are sent to `/login`, other roles get a 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(session_user(req).and_then(|user| match user {
      None => Err(AppError::Unauthenticated),
      Some(user) if user.role == Role::Admin => Ok(AdminUser(user)),
      Some(user) => {
        tracing::warn!(user_id = %user.id, path = %req.path(), "Admin route refused.");
        Err(AppError::Forbidden)
      }
    }))
  }
}

/// The signed-in user when there is one; never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<SessionUser>);

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Ok(MaybeUser(session_user(req).unwrap_or(None))))
  }
}
