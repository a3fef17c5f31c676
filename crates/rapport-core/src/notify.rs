//! The unified notification feed.
//!
//! Merges the mailbox's per-sender digest and the comment service's per-note
//! digest into one list ordered by recency. Holds no state of its own;
//! consumers poll [`Notifications::feed`] and may lag the stores by up to one
//! polling interval.

use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  comments::{CommentDigest, CommentService},
  digest::preview,
  identity::UserSummary,
  mailbox::{Mailbox, MessageDigest},
  store::{CommentStore, Directory, MailboxStore, NoteCatalog},
};

/// The representative item of a feed entry, cut for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
  pub id:         Uuid,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

/// One entry of the feed. Carries everything needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FeedItem {
  Message {
    sender:      Uuid,
    count:       u64,
    last:        Preview,
    sender_info: Option<UserSummary>,
  },
  Comment {
    note:        Uuid,
    note_title:  String,
    count:       u64,
    last:        Preview,
    author_info: Option<UserSummary>,
  },
}

impl FeedItem {
  pub fn last(&self) -> &Preview {
    match self {
      Self::Message { last, .. } | Self::Comment { last, .. } => last,
    }
  }

  pub fn count(&self) -> u64 {
    match self {
      Self::Message { count, .. } | Self::Comment { count, .. } => *count,
    }
  }

  /// What [`Notifications::resolve`] needs to clear this entry.
  pub fn target(&self) -> FeedTarget {
    match self {
      Self::Message { sender, .. } => FeedTarget::Message { sender: *sender },
      Self::Comment { note, .. } => FeedTarget::Comment { note: *note },
    }
  }

  /// Newest first; equal timestamps fall back to the group key.
  fn recency_cmp(&self, other: &Self) -> Ordering {
    other
      .last()
      .created_at
      .cmp(&self.last().created_at)
      .then_with(|| self.target().cmp(&other.target()))
  }
}

impl From<MessageDigest> for FeedItem {
  fn from(d: MessageDigest) -> Self {
    Self::Message {
      sender:      d.sender,
      count:       d.count,
      last:        Preview {
        id:         d.last_message.id,
        text:       preview(&d.last_message.text),
        created_at: d.last_message.created_at,
      },
      sender_info: d.sender_info,
    }
  }
}

impl From<CommentDigest> for FeedItem {
  fn from(d: CommentDigest) -> Self {
    Self::Comment {
      note:        d.note,
      note_title:  d.note_title,
      count:       d.count,
      last:        Preview {
        id:         d.last_comment.id,
        text:       preview(&d.last_comment.text),
        created_at: d.last_comment.created_at,
      },
      author_info: d.author_info,
    }
  }
}

/// Identifies a feed entry's group for mark-read dispatch.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedTarget {
  Message { sender: Uuid },
  Comment { note: Uuid },
}

/// Unread totals for both sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnreadCounts {
  pub messages: u64,
  pub comments: u64,
}

/// Merge both digests into one feed, newest first.
pub fn merge_feed(
  messages: Vec<MessageDigest>,
  comments: Vec<CommentDigest>,
) -> Vec<FeedItem> {
  let mut feed: Vec<FeedItem> = messages
    .into_iter()
    .map(FeedItem::from)
    .chain(comments.into_iter().map(FeedItem::from))
    .collect();
  feed.sort_by(FeedItem::recency_cmp);
  feed
}

pub struct Notifications<S> {
  mailbox:  Mailbox<S>,
  comments: CommentService<S>,
}

impl<S> Clone for Notifications<S> {
  fn clone(&self) -> Self {
    Self { mailbox: self.mailbox.clone(), comments: self.comments.clone() }
  }
}

impl<S> Notifications<S>
where
  S: Directory + MailboxStore + CommentStore + NoteCatalog,
{
  pub fn new(store: Arc<S>) -> Self {
    Self {
      mailbox:  Mailbox::new(store.clone()),
      comments: CommentService::new(store),
    }
  }

  pub async fn feed(&self, viewer: Uuid) -> Result<Vec<FeedItem>> {
    let messages = self.mailbox.unread_digest(viewer).await?;
    let comments = self.comments.unread_digest(viewer).await?;
    let feed = merge_feed(messages, comments);
    debug!(%viewer, entries = feed.len(), "notification feed");
    Ok(feed)
  }

  /// Mark the group behind a feed entry as read and return fresh totals.
  pub async fn resolve(&self, viewer: Uuid, target: FeedTarget) -> Result<UnreadCounts> {
    match target {
      FeedTarget::Message { sender } => {
        let messages = self.mailbox.mark_read(viewer, sender).await?;
        let comments = self.comments.unread_count(viewer).await?;
        Ok(UnreadCounts { messages, comments })
      }
      FeedTarget::Comment { note } => {
        let comments = self.comments.mark_read_for_note(viewer, note).await?;
        let messages = self.mailbox.unread_count(viewer).await?;
        Ok(UnreadCounts { messages, comments })
      }
    }
  }

  pub async fn counts(&self, viewer: Uuid) -> Result<UnreadCounts> {
    Ok(UnreadCounts {
      messages: self.mailbox.unread_count(viewer).await?,
      comments: self.comments.unread_count(viewer).await?,
    })
  }
}
