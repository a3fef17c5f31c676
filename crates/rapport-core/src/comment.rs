//! Comments on notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::UserSummary;

/// A comment on a note.
///
/// `read_by_owner` starts out `true` when the note owner wrote the comment,
/// so an owner's own comments are never unread to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id:            Uuid,
  pub note:          Uuid,
  pub author:        Uuid,
  pub text:          String,
  pub read_by_owner: bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::CommentStore::insert_comment`].
#[derive(Debug, Clone)]
pub struct NewComment {
  pub note:          Uuid,
  pub author:        Uuid,
  pub text:          String,
  pub read_by_owner: bool,
}

/// A comment with its author's display info attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
  #[serde(flatten)]
  pub comment:     Comment,
  /// `None` if the author record has since disappeared.
  pub author_info: Option<UserSummary>,
}
