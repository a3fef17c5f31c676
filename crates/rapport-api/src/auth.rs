//! Bearer-token extractor.
//!
//! Tokens are issued elsewhere; only their SHA-256 digest is stored. A request
//! is authenticated when the digest of its bearer token maps to an identity.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AppState, Store, error::ApiError};

/// The identity making the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Uuid);

/// Hex-encoded SHA-256 of a bearer token, as stored by the credential store.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// A fresh random bearer token (32 bytes, hex-encoded).
pub fn issue_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<AppState<S>> for Viewer
where
  S: Store,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let digest = token_digest(token);
    state
      .store
      .viewer_for_token(&digest)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .map(Viewer)
      .ok_or(ApiError::Unauthorized)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn digest_is_stable_hex() {
    let d = token_digest("secret");
    assert_eq!(d.len(), 64);
    assert_eq!(d, token_digest("secret"));
    assert_ne!(d, token_digest("Secret"));
  }

  #[test]
  fn issued_tokens_differ() {
    let a = issue_token();
    assert_eq!(a.len(), 64);
    assert_ne!(a, issue_token());
  }

  #[test]
  fn bearer_parsing() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert_eq!(bearer(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert_eq!(bearer(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert_eq!(bearer(&headers), Some("abc"));
  }
}
