//! Comments on notes and the note owner's unread view of them.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  comment::{Comment, CommentView, NewComment},
  digest::group_latest,
  identity::UserSummary,
  note::{NoteCommentCount, NoteRef},
  store::{CommentStore, Directory, NoteCatalog},
};

/// Unread comments on one of the viewer's notes, with the newest one as
/// representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDigest {
  pub note:         Uuid,
  pub note_title:   String,
  pub count:        u64,
  pub last_comment: Comment,
  /// Author of `last_comment`.
  pub author_info:  Option<UserSummary>,
}

pub struct CommentService<S> {
  store: Arc<S>,
}

impl<S> Clone for CommentService<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

fn require_text(text: &str) -> Result<()> {
  if text.trim().is_empty() {
    return Err(Error::Validation("text is required".into()));
  }
  Ok(())
}

impl<S> CommentService<S>
where
  S: CommentStore + Directory + NoteCatalog,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn note(&self, id: Uuid) -> Result<NoteRef> {
    self
      .store
      .get_note(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Note not found".into()))
  }

  pub async fn add(
    &self,
    note: Uuid,
    author: Uuid,
    text: String,
  ) -> Result<CommentView> {
    require_text(&text)?;
    let note = self.note(note).await?;

    let comment = self
      .store
      .insert_comment(NewComment {
        note: note.id,
        author,
        text,
        read_by_owner: author == note.owner,
      })
      .await
      .map_err(Error::store)?;
    info!(note = %note.id, %author, id = %comment.id, "comment added");
    self.attach_author(comment).await
  }

  /// Replace the text of a comment. Only its author may do so.
  pub async fn edit(
    &self,
    comment: Uuid,
    author: Uuid,
    text: String,
  ) -> Result<CommentView> {
    require_text(&text)?;
    let existing = self
      .store
      .get_comment(comment)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Comment not found".into()))?;

    if existing.author != author {
      return Err(Error::Forbidden("Not allowed".into()));
    }

    let updated = self
      .store
      .update_comment_text(comment, text)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Comment not found".into()))?;
    debug!(%comment, "comment edited");
    self.attach_author(updated).await
  }

  /// All comments on `note`, oldest first.
  pub async fn list_for_note(&self, note: Uuid) -> Result<Vec<CommentView>> {
    let comments = self
      .store
      .comments_for_note(note)
      .await
      .map_err(Error::store)?;
    let mut seen = HashSet::new();
    let authors = comments
      .iter()
      .map(|c| c.author)
      .filter(|a| seen.insert(*a))
      .collect();
    let info = self.summaries(authors).await?;

    Ok(
      comments
        .into_iter()
        .map(|comment| CommentView {
          author_info: info.get(&comment.author).cloned(),
          comment,
        })
        .collect(),
    )
  }

  /// Mark all of `note`'s comments as seen and return the owner's remaining
  /// unread count across all their notes.
  pub async fn mark_read_for_note(&self, viewer: Uuid, note: Uuid) -> Result<u64> {
    let note = self.note(note).await?;
    if note.owner != viewer {
      return Err(Error::Forbidden("Not allowed".into()));
    }
    let outcome = self
      .store
      .mark_read_for_note(viewer, note.id)
      .await
      .map_err(Error::store)?;
    debug!(%viewer, note = %note.id, marked = outcome.marked, unread = outcome.unread, "comments marked read");
    Ok(outcome.unread)
  }

  /// Unread comments by others across all of `viewer`'s notes.
  pub async fn unread_count(&self, viewer: Uuid) -> Result<u64> {
    self
      .store
      .count_unread_for_owner(viewer)
      .await
      .map_err(Error::store)
  }

  /// Unread comments by others on `viewer`'s notes, grouped by note, newest
  /// group first.
  pub async fn unread_digest(&self, viewer: Uuid) -> Result<Vec<CommentDigest>> {
    let unread = self
      .store
      .unread_for_owner(viewer)
      .await
      .map_err(Error::store)?;
    if unread.is_empty() {
      return Ok(Vec::new());
    }

    let titles: HashMap<Uuid, String> = self
      .store
      .notes_by_owner(viewer)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|n| (n.id, n.title))
      .collect();

    let groups = group_latest(unread, |c| c.note, |c| c.created_at);
    let info = self
      .summaries(groups.iter().map(|g| g.latest.author).collect())
      .await?;

    Ok(
      groups
        .into_iter()
        .map(|g| CommentDigest {
          note:         g.key,
          note_title:   titles.get(&g.key).cloned().unwrap_or_default(),
          count:        g.count,
          author_info:  info.get(&g.latest.author).cloned(),
          last_comment: g.latest,
        })
        .collect(),
    )
  }

  /// Total comments per requested note, in request order. Notes without
  /// comments report zero.
  pub async fn counts_for_notes(
    &self,
    notes: Vec<Uuid>,
  ) -> Result<Vec<NoteCommentCount>> {
    let counts: HashMap<Uuid, u64> = self
      .store
      .counts_for_notes(notes.clone())
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|c| (c.note, c.count))
      .collect();

    Ok(
      notes
        .into_iter()
        .map(|note| NoteCommentCount {
          note,
          count: counts.get(&note).copied().unwrap_or(0),
        })
        .collect(),
    )
  }

  async fn attach_author(&self, comment: Comment) -> Result<CommentView> {
    let author_info = self
      .store
      .summaries(vec![comment.author])
      .await
      .map_err(Error::store)?
      .into_iter()
      .next();
    Ok(CommentView { comment, author_info })
  }

  async fn summaries(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, UserSummary>> {
    let summaries = self.store.summaries(ids).await.map_err(Error::store)?;
    Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
  }
}
