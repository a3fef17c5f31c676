//! Handlers for `/messages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/messages/send` | Body: `{"recipientId":"...","text":"..."}`; 201 |
//! | `GET`  | `/messages/conversations` | Latest message per partner |
//! | `GET`  | `/messages/conversation/:userId` | Oldest first |
//! | `POST` | `/messages/conversation/:userId/mark-read` | `{message, unread}` |
//! | `GET`  | `/messages/unread/count` | `{unread}` |
//! | `GET`  | `/messages/unread/by-sender` | `[{sender, count}]` |
//! | `GET`  | `/messages/unread/list` | `[{sender, count, lastMessage, senderInfo}]` |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use rapport_core::{
  mailbox::{ConversationSummary, MessageDigest, SenderCount},
  message::Message,
};
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
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendBody {
  pub recipient_id: Uuid,
  #[serde(default)]
  pub text:         String,
}

/// `POST /messages/send`: 201 with the stored [`Message`].
pub async fn send<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  JsonBody(body): JsonBody<SendBody>,
) -> Result<impl IntoResponse, ApiError> {
  let message = state
    .mailbox
    .send(viewer, body.recipient_id, body.text)
    .await?;
  Ok((StatusCode::CREATED, Json(message)))
}

/// `GET /messages/conversations`
pub async fn conversations<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
  Ok(Json(state.mailbox.conversations(viewer).await?))
}

/// `GET /messages/conversation/:userId`
pub async fn conversation<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(partner): IdPath<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
  Ok(Json(state.mailbox.conversation(viewer, partner).await?))
}

/// `POST /messages/conversation/:userId/mark-read`
pub async fn mark_read<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  IdPath(partner): IdPath<Uuid>,
) -> Result<Json<Value>, ApiError> {
  let unread = state.mailbox.mark_read(viewer, partner).await?;
  Ok(Json(json!({ "message": "Marked as read", "unread": unread })))
}

/// `GET /messages/unread/count`
pub async fn unread_count<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Value>, ApiError> {
  let unread = state.mailbox.unread_count(viewer).await?;
  Ok(Json(json!({ "unread": unread })))
}

/// `GET /messages/unread/by-sender`
pub async fn unread_by_sender<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<SenderCount>>, ApiError> {
  Ok(Json(state.mailbox.unread_by_sender(viewer).await?))
}

/// `GET /messages/unread/list`
pub async fn unread_list<S: Store>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Json<Vec<MessageDigest>>, ApiError> {
  Ok(Json(state.mailbox.unread_digest(viewer).await?))
}
