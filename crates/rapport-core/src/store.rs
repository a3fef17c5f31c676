//! Storage traits consumed by the services.
//!
//! Backends (e.g. `rapport-store-sqlite`) implement these; the services in
//! this crate depend only on the abstraction. Every method is a single
//! bounded round-trip against the backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  comment::{Comment, NewComment},
  identity::{Profile, UserSummary},
  message::{Message, NewMessage},
  note::{Note, NoteCommentCount, NoteRef},
  relation::{Relation, RelationSet},
};

/// Shared error type for every storage trait a backend implements.
pub trait Backend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

/// Outcome of a conditional bulk mark-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRead {
  /// Records flipped from unread to read by this call.
  pub marked: u64,
  /// Unread records left in the viewer's scope after the update.
  pub unread: u64,
}

// ─── Identities ──────────────────────────────────────────────────────────────

/// Read-only access to the external identity records.
pub trait Directory: Backend {
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Case-insensitive lookup by email.
  fn find_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + 'a;

  /// Display summaries for `ids`, in the same order. Unknown ids are skipped.
  fn summaries(
    &self,
    ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<UserSummary>, Self::Error>> + Send + '_;
}

/// Maps a bearer-token digest to the identity it was issued to.
pub trait CredentialStore: Backend {
  fn viewer_for_token<'a>(
    &'a self,
    token_digest: &'a str,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + 'a;
}

// ─── Notes ───────────────────────────────────────────────────────────────────

/// Read-only access to the external note collection.
pub trait NoteCatalog: Backend {
  fn get_note(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<NoteRef>, Self::Error>> + Send + '_;

  /// All notes owned by `owner`, newest first.
  fn notes_by_owner(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send + '_;
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// Per-identity friend / incoming / outgoing sets.
///
/// Writes go through [`RelationStore::transition`] only, which updates both
/// sides of a pair as one atomic unit.
pub trait RelationStore: Backend {
  /// The relation of `other` to `viewer`, from `viewer`'s side.
  fn relation(
    &self,
    viewer: Uuid,
    other: Uuid,
  ) -> impl Future<Output = Result<Relation, Self::Error>> + Send + '_;

  /// Members of one of `viewer`'s sets, oldest membership first.
  fn members(
    &self,
    viewer: Uuid,
    set: RelationSet,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Compare-and-swap the pair's relation.
  ///
  /// Atomically: if the relation of `other` to `viewer` is still `expected`,
  /// write `next` on `viewer`'s side and `next.mirror()` on `other`'s side
  /// and return `true`. Otherwise write nothing and return `false`.
  fn transition(
    &self,
    viewer: Uuid,
    other: Uuid,
    expected: Relation,
    next: Relation,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Messages ────────────────────────────────────────────────────────────────

/// Append-only message log with a monotonic read flag.
pub trait MailboxStore: Backend {
  /// Persist a new unread message. `id` and `created_at` are set here.
  fn insert_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Messages between `a` and `b` in either direction, oldest first.
  fn conversation(
    &self,
    a: Uuid,
    b: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Every message sent or received by `viewer`, oldest first.
  fn messages_involving(
    &self,
    viewer: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Unread messages addressed to `viewer`, oldest first.
  fn unread_for(
    &self,
    viewer: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  fn count_unread(
    &self,
    viewer: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Mark every message from `partner` to `viewer` that is still unread at
  /// execution time as read, then count `viewer`'s remaining unread.
  fn mark_read_from(
    &self,
    viewer: Uuid,
    partner: Uuid,
  ) -> impl Future<Output = Result<MarkRead, Self::Error>> + Send + '_;
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// Per-note comment log with a monotonic "seen by note owner" flag.
pub trait CommentStore: Backend {
  /// Persist a new comment. `id`, `created_at` and `updated_at` are set here.
  fn insert_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// Replace the text and bump `updated_at`. Returns `None` if the comment
  /// does not exist.
  fn update_comment_text(
    &self,
    id: Uuid,
    text: String,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// All comments on `note`, oldest first.
  fn comments_for_note(
    &self,
    note: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Unread comments on notes owned by `owner`, excluding comments `owner`
  /// wrote, oldest first.
  fn unread_for_owner(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Count of [`CommentStore::unread_for_owner`].
  fn count_unread_for_owner(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Mark every still-unread comment on `note` as read, then count the
  /// unread comments left across all of `owner`'s notes.
  fn mark_read_for_note(
    &self,
    owner: Uuid,
    note: Uuid,
  ) -> impl Future<Output = Result<MarkRead, Self::Error>> + Send + '_;

  /// Total comment count per note. Notes without comments are omitted.
  fn counts_for_notes(
    &self,
    notes: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<NoteCommentCount>, Self::Error>> + Send + '_;
}
