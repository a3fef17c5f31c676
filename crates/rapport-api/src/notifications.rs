//! Handlers for `/notifications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications` | Merged feed, newest first |
//! | `GET`  | `/notifications/counts` | `{messages, comments}` |
//! | `POST` | `/notifications/resolve` | Body: `{"type":"message","sender":"..."}` or `{"type":"comment","note":"..."}` |

use axum::{Json, extract::State};
use rapport_core::notify::{FeedItem, FeedTarget, UnreadCounts};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Store, auth::Viewer, body::JsonBody, error::ApiError};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveKind {
  Message,
  Comment,
}

/// Which feed group to mark read. Exactly the id matching `type` is allowed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveBody {
  #[serde(rename = "type")]
  pub kind:   ResolveKind,
  pub sender: Option<Uuid>,
  pub note:   Option<Uuid>,
}

impl ResolveBody {
  fn target(self) -> Result<FeedTarget, ApiError> {
    match (self.kind, self.sender, self.note) {
      (ResolveKind::Message, Some(sender), None) => Ok(FeedTarget::Message { sender }),
      (ResolveKind::Comment, None, Some(note)) => Ok(FeedTarget::Comment { note }),
      (ResolveKind::Message, ..) => Err(ApiError::BadRequest("sender is required".into())),
      (ResolveKind::Comment, ..) => Err(ApiError::BadRequest("note is required".into())),
    }
  }
}

/// `GET /notifications`
pub async fn feed<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<FeedItem>>, ApiError> {
  Ok(Json(state.notifications.feed(viewer).await?))
}

/// `GET /notifications/counts`
pub async fn counts<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<UnreadCounts>, ApiError> {
  Ok(Json(state.notifications.counts(viewer).await?))
}

/// `POST /notifications/resolve`
pub async fn resolve<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<ResolveBody>,
) -> Result<Json<UnreadCounts>, ApiError> {
  Ok(Json(state.notifications.resolve(viewer, body.target()?).await?))
}
