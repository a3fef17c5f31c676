//! Handlers for `/comments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/comments/note/:noteId` | Body: `{"text":"..."}`; 201 |
//! | `GET`  | `/comments/note/:noteId` | Oldest first, with author info |
//! | `PUT`  | `/comments/:commentId` | Body: `{"text":"..."}`; author only |
//! | `POST` | `/comments/note/:noteId/mark-read` | Note owner only |
//! | `GET`  | `/comments/unread/list` | Per-note digest |
//! | `GET`  | `/comments/unread/count` | `{unread}` |
//! | `GET`  | `/comments/counts` | `?noteIds=a,b` |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use rapport_core::{comment::CommentView, comments::CommentDigest, note::NoteCommentCount};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState, Store,
  auth::Viewer,
  body::{IdPath, JsonBody, QueryParams},
  error::ApiError,
};

/// The only field of a comment a caller may set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextBody {
  #[serde(default)]
  pub text: String,
}

/// `POST /comments/note/:noteId`: 201 with the stored comment.
pub async fn add<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(note): IdPath<Uuid>,
  JsonBody(body): JsonBody<TextBody>,
) -> Result<impl IntoResponse, ApiError> {
  let comment = state.comments.add(note, viewer, body.text).await?;
  Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /comments/note/:noteId`
pub async fn list<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(_viewer): Viewer,
  IdPath(note): IdPath<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
  Ok(Json(state.comments.list_for_note(note).await?))
}

/// `PUT /comments/:commentId`
pub async fn edit<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(comment): IdPath<Uuid>,
  JsonBody(body): JsonBody<TextBody>,
) -> Result<Json<CommentView>, ApiError> {
  Ok(Json(state.comments.edit(comment, viewer, body.text).await?))
}

/// `POST /comments/note/:noteId/mark-read`
pub async fn mark_read<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(note): IdPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
  let unread = state.comments.mark_read_for_note(viewer, note).await?;
  Ok(Json(json!({ "message": "Marked as read", "unread": unread })))
}

/// `GET /comments/unread/list`
pub async fn unread_list<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<CommentDigest>>, ApiError> {
  Ok(Json(state.comments.unread_digest(viewer).await?))
}

/// `GET /comments/unread/count`
pub async fn unread_count<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Value>, ApiError> {
  let unread = state.comments.unread_count(viewer).await?;
  Ok(Json(json!({ "unread": unread })))
}

#[derive(Debug, Deserialize)]
pub struct CountsParams {
  /// Comma-separated note ids.
  #[serde(rename = "noteIds")]
  pub note_ids: Option<String>,
}

fn parse_note_ids(raw: &str) -> Result<Vec<Uuid>, ApiError> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      Uuid::parse_str(s).map_err(|_| ApiError::BadRequest(format!("invalid note id: {s}")))
    })
    .collect()
}

/// `GET /comments/counts?noteIds=a,b`
pub async fn counts<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(_viewer): Viewer,
  QueryParams(params): QueryParams<CountsParams>,
) -> Result<Json<Vec<NoteCommentCount>>, ApiError> {
  let raw = params
    .note_ids
    .ok_or_else(|| ApiError::BadRequest("noteIds query param required".into()))?;
  let ids = parse_note_ids(&raw)?;
  Ok(Json(state.comments.counts_for_notes(ids).await?))
}
