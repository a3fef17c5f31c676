//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use rapport_core::{
  comment::Comment,
  identity::Profile,
  message::Message,
  note::{Note, NoteRef},
  relation::RelationSet,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// The current time, truncated to what [`encode_dt`] keeps, so values handed
/// back to callers equal what a later read returns.
pub fn now() -> DateTime<Utc> {
  let now = Utc::now();
  decode_dt(&encode_dt(now)).unwrap_or(now)
}

// ─── RelationSet ──────────────────────────────────────────────────────────────

pub fn encode_relation_set(set: RelationSet) -> &'static str {
  match set {
    RelationSet::Friends => "friends",
    RelationSet::Incoming => "incoming",
    RelationSet::Outgoing => "outgoing",
  }
}

pub fn decode_relation_set(s: &str) -> Result<RelationSet> {
  match s {
    "friends" => Ok(RelationSet::Friends),
    "incoming" => Ok(RelationSet::Incoming),
    "outgoing" => Ok(RelationSet::Outgoing),
    other => Err(Error::UnknownRelation(other.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:     String,
  pub email:       String,
  pub first_name:  Option<String>,
  pub middle_name: Option<String>,
  pub last_name:   Option<String>,
  pub avatar:      String,
  pub created_at:  String,
}

pub const USER_COLUMNS: &str =
  "user_id, email, first_name, middle_name, last_name, avatar, created_at";

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      email:       row.get(1)?,
      first_name:  row.get(2)?,
      middle_name: row.get(3)?,
      last_name:   row.get(4)?,
      avatar:      row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:     decode_uuid(&self.user_id)?,
      email:       self.email,
      first_name:  self.first_name,
      middle_name: self.middle_name,
      last_name:   self.last_name,
      avatar:      self.avatar,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `notes` row.
pub struct RawNote {
  pub note_id:    String,
  pub owner_id:   String,
  pub title:      String,
  pub content:    String,
  pub created_at: String,
  pub updated_at: String,
}

pub const NOTE_COLUMNS: &str =
  "note_id, owner_id, title, content, created_at, updated_at";

impl RawNote {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      note_id:    row.get(0)?,
      owner_id:   row.get(1)?,
      title:      row.get(2)?,
      content:    row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_note(self) -> Result<Note> {
    Ok(Note {
      id:         decode_uuid(&self.note_id)?,
      owner:      decode_uuid(&self.owner_id)?,
      title:      self.title,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }

  pub fn into_ref(self) -> Result<NoteRef> {
    Ok(NoteRef {
      id:    decode_uuid(&self.note_id)?,
      owner: decode_uuid(&self.owner_id)?,
      title: self.title,
    })
  }
}

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:   String,
  pub sender_id:    String,
  pub recipient_id: String,
  pub text:         String,
  pub read:         bool,
  pub created_at:   String,
}

pub const MESSAGE_COLUMNS: &str =
  "message_id, sender_id, recipient_id, text, read, created_at";

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:   row.get(0)?,
      sender_id:    row.get(1)?,
      recipient_id: row.get(2)?,
      text:         row.get(3)?,
      read:         row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      id:         decode_uuid(&self.message_id)?,
      sender:     decode_uuid(&self.sender_id)?,
      recipient:  decode_uuid(&self.recipient_id)?,
      text:       self.text,
      read:       self.read,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `comments` row.
pub struct RawComment {
  pub comment_id:    String,
  pub note_id:       String,
  pub author_id:     String,
  pub text:          String,
  pub read_by_owner: bool,
  pub created_at:    String,
  pub updated_at:    String,
}

pub const COMMENT_COLUMNS: &str =
  "c.comment_id, c.note_id, c.author_id, c.text, c.read_by_owner, c.created_at, c.updated_at";

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:    row.get(0)?,
      note_id:       row.get(1)?,
      author_id:     row.get(2)?,
      text:          row.get(3)?,
      read_by_owner: row.get(4)?,
      created_at:    row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      id:            decode_uuid(&self.comment_id)?,
      note:          decode_uuid(&self.note_id)?,
      author:        decode_uuid(&self.author_id)?,
      text:          self.text,
      read_by_owner: self.read_by_owner,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}
