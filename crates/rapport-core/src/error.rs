//! Error types for `rapport-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or missing input, e.g. empty text.
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Forbidden(String),

  /// Duplicate friend request, or the pair is already friends.
  #[error("{0}")]
  Conflict(String),

  #[error("cannot send a friend request to yourself")]
  InvalidTarget,

  #[error("no incoming friend request from {0}")]
  NoSuchRequest(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
