//! Notes are owned by an external collaborator; the social layer only reads
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The minimum the social layer needs to know about a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
  pub id:    Uuid,
  pub owner: Uuid,
  pub title: String,
}

/// A full note, returned by the friend-notes query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
  pub id:         Uuid,
  pub owner:      Uuid,
  pub title:      String,
  pub content:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Note {
  pub fn to_ref(&self) -> NoteRef {
    NoteRef { id: self.id, owner: self.owner, title: self.title.clone() }
  }
}

/// Total comment count for one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCommentCount {
  pub note:  Uuid,
  pub count: u64,
}
