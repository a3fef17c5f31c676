//! Handlers for `/friends` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/friends/request` | Body: `{"email":"..."}` or `{"id":"..."}` |
//! | `GET`  | `/friends` | Viewer's friends |
//! | `GET`  | `/friends/requests/incoming` | Pending requests to the viewer |
//! | `GET`  | `/friends/requests/outgoing` | Pending requests by the viewer |
//! | `POST` | `/friends/requests/:id/accept` | |
//! | `POST` | `/friends/requests/:id/reject` | |
//! | `GET`  | `/friends/:id/notes` | 403 unless self or friend |

use axum::{
  Json,
  extract::State,
};
use rapport_core::{identity::UserSummary, note::Note, social::Target};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState, Store,
  auth::Viewer,
  body::{IdPath, JsonBody},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestBody {
  pub email: Option<String>,
  pub id:    Option<Uuid>,
}

impl RequestBody {
  fn target(self) -> Result<Target, ApiError> {
    match (self.email, self.id) {
      (Some(email), None) if !email.trim().is_empty() => Ok(Target::Email(email)),
      (None, Some(id)) => Ok(Target::Id(id)),
      _ => Err(ApiError::BadRequest("Email is required".into())),
    }
  }
}

/// `POST /friends/request`
pub async fn request<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<RequestBody>,
) -> Result<Json<Value>, ApiError> {
  let outcome = state.graph.request(viewer, &body.target()?).await?;
  Ok(Json(json!({ "message": outcome.message() })))
}

/// `GET /friends`
pub async fn list<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
  Ok(Json(state.graph.list_friends(viewer).await?))
}

/// `GET /friends/requests/incoming`
pub async fn incoming<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
  Ok(Json(state.graph.list_incoming(viewer).await?))
}

/// `GET /friends/requests/outgoing`
pub async fn outgoing<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
  Ok(Json(state.graph.list_outgoing(viewer).await?))
}

/// `POST /friends/requests/:id/accept`
pub async fn accept<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(requester): IdPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
  state.graph.accept(viewer, requester).await?;
  Ok(Json(json!({ "message": "Friend request accepted" })))
}

/// `POST /friends/requests/:id/reject`
pub async fn reject<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(requester): IdPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
  state.graph.reject(viewer, requester).await?;
  Ok(Json(json!({ "message": "Friend request rejected" })))
}

/// `GET /friends/:id/notes`
pub async fn notes<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(owner): IdPath<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
  Ok(Json(state.graph.notes_of(viewer, owner).await?))
}
