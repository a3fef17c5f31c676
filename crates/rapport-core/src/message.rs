//! Direct messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed message. Everything but `read` is immutable; `read` only ever
/// goes from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id:         Uuid,
  pub sender:     Uuid,
  pub recipient:  Uuid,
  pub text:       String,
  pub read:       bool,
  /// Server-assigned.
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::MailboxStore::insert_message`].
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub sender:    Uuid,
  pub recipient: Uuid,
  pub text:      String,
}
