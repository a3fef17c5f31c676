//! Direct messages between identities.
//!
//! Messaging is not gated on friendship. Unread counts and digests are always
//! derived from the stored read flags; no counters are kept.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  digest::group_latest,
  identity::UserSummary,
  message::{Message, NewMessage},
  store::{Directory, MailboxStore},
};

/// Unread messages from one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderCount {
  pub sender: Uuid,
  pub count:  u64,
}

/// Unread messages from one sender, with the newest one as representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDigest {
  pub sender:       Uuid,
  pub count:        u64,
  pub last_message: Message,
  pub sender_info:  Option<UserSummary>,
}

/// The latest message exchanged with one partner, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
  pub partner:      Uuid,
  pub partner_info: Option<UserSummary>,
  pub last_message: Message,
}

pub struct Mailbox<S> {
  store: Arc<S>,
}

impl<S> Clone for Mailbox<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S> Mailbox<S>
where
  S: Directory + MailboxStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn send(
    &self,
    sender: Uuid,
    recipient: Uuid,
    text: String,
  ) -> Result<Message> {
    if text.trim().is_empty() {
      return Err(Error::Validation("text is required".into()));
    }
    self
      .store
      .get_user(recipient)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("Recipient not found".into()))?;

    let message = self
      .store
      .insert_message(NewMessage { sender, recipient, text })
      .await
      .map_err(Error::store)?;
    info!(%sender, %recipient, id = %message.id, "message sent");
    Ok(message)
  }

  /// Every message between `viewer` and `partner`, oldest first.
  pub async fn conversation(
    &self,
    viewer: Uuid,
    partner: Uuid,
  ) -> Result<Vec<Message>> {
    self
      .store
      .conversation(viewer, partner)
      .await
      .map_err(Error::store)
  }

  /// Mark everything `partner` has sent `viewer` so far as read and return
  /// `viewer`'s remaining unread count across all senders.
  pub async fn mark_read(&self, viewer: Uuid, partner: Uuid) -> Result<u64> {
    let outcome = self
      .store
      .mark_read_from(viewer, partner)
      .await
      .map_err(Error::store)?;
    debug!(%viewer, %partner, marked = outcome.marked, unread = outcome.unread, "messages marked read");
    Ok(outcome.unread)
  }

  pub async fn unread_count(&self, viewer: Uuid) -> Result<u64> {
    self.store.count_unread(viewer).await.map_err(Error::store)
  }

  pub async fn unread_by_sender(&self, viewer: Uuid) -> Result<Vec<SenderCount>> {
    let unread = self.store.unread_for(viewer).await.map_err(Error::store)?;
    Ok(
      group_latest(unread, |m| m.sender, |m| m.created_at)
        .into_iter()
        .map(|g| SenderCount { sender: g.key, count: g.count })
        .collect(),
    )
  }

  /// Unread messages grouped by sender, newest group first.
  pub async fn unread_digest(&self, viewer: Uuid) -> Result<Vec<MessageDigest>> {
    let unread = self.store.unread_for(viewer).await.map_err(Error::store)?;
    let groups = group_latest(unread, |m| m.sender, |m| m.created_at);
    let mut info = self.summaries(groups.iter().map(|g| g.key)).await?;

    Ok(
      groups
        .into_iter()
        .map(|g| MessageDigest {
          sender:       g.key,
          count:        g.count,
          sender_info:  info.remove(&g.key),
          last_message: g.latest,
        })
        .collect(),
    )
  }

  /// One entry per conversation partner, most recently active first.
  pub async fn conversations(
    &self,
    viewer: Uuid,
  ) -> Result<Vec<ConversationSummary>> {
    let messages = self
      .store
      .messages_involving(viewer)
      .await
      .map_err(Error::store)?;
    let partner_of = |m: &Message| {
      if m.sender == viewer { m.recipient } else { m.sender }
    };
    let groups = group_latest(messages, partner_of, |m| m.created_at);
    let mut info = self.summaries(groups.iter().map(|g| g.key)).await?;

    Ok(
      groups
        .into_iter()
        .map(|g| ConversationSummary {
          partner:      g.key,
          partner_info: info.remove(&g.key),
          last_message: g.latest,
        })
        .collect(),
    )
  }

  async fn summaries(
    &self,
    ids: impl Iterator<Item = Uuid>,
  ) -> Result<HashMap<Uuid, UserSummary>> {
    let summaries = self
      .store
      .summaries(ids.collect())
      .await
      .map_err(Error::store)?;
    Ok(summaries.into_iter().map(|s| (s.id, s)).collect())
  }
}
