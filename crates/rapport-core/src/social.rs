//! The friend-request state machine.
//!
//! ```text
//!              request                 request (by the other side)
//! Unrelated ───────────▶ OutgoingPending ─────────────────────────▶ Friends
//!     │                                                               ▲
//!     │ request (by the other side)        accept / request (auto)    │
//!     └──────────────────▶ IncomingPending ───────────────────────────┘
//!                               │ reject
//!                               ▼
//!                           Unrelated
//! ```
//!
//! Every write is a compare-and-swap through [`RelationStore::transition`], so
//! both sides of a pair always change together and a concurrent change is
//! detected rather than overwritten.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::{Profile, UserSummary},
  note::Note,
  relation::{Relation, RelationSet, RequestOutcome},
  store::{Directory, NoteCatalog, RelationStore},
};

/// How many times [`SocialGraph::request`] re-reads the pair after losing a
/// race before giving up.
const MAX_ATTEMPTS: usize = 3;

/// Who a friend request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  Email(String),
  Id(Uuid),
}

pub struct SocialGraph<S> {
  store: Arc<S>,
}

impl<S> Clone for SocialGraph<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S> SocialGraph<S>
where
  S: Directory + RelationStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn resolve(&self, target: &Target) -> Result<Option<Profile>> {
    let found = match target {
      Target::Email(email) => self.store.find_by_email(email).await,
      Target::Id(id) => self.store.get_user(*id).await,
    };
    found.map_err(Error::store)
  }

  async fn require_user(&self, id: Uuid) -> Result<()> {
    self
      .store
      .get_user(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("User not found".into()))?;
    Ok(())
  }

  /// Ask `target` to be friends with `viewer`.
  ///
  /// If `target` already asked `viewer`, the pair becomes friends at once.
  pub async fn request(
    &self,
    viewer: Uuid,
    target: &Target,
  ) -> Result<RequestOutcome> {
    let target = self
      .resolve(target)
      .await?
      .ok_or_else(|| Error::NotFound("User not found".into()))?
      .user_id;

    if target == viewer {
      return Err(Error::InvalidTarget);
    }

    for attempt in 1..=MAX_ATTEMPTS {
      let current = self
        .store
        .relation(viewer, target)
        .await
        .map_err(Error::store)?;

      let (next, outcome) = match current {
        Relation::Friends => return Err(Error::Conflict("Already friends".into())),
        Relation::OutgoingPending => {
          return Err(Error::Conflict("Request already sent".into()));
        }
        Relation::IncomingPending => (Relation::Friends, RequestOutcome::AutoAccepted),
        Relation::Unrelated => (Relation::OutgoingPending, RequestOutcome::Sent),
      };

      let applied = self
        .store
        .transition(viewer, target, current, next)
        .await
        .map_err(Error::store)?;

      if applied {
        info!(%viewer, %target, ?outcome, "friend request");
        return Ok(outcome);
      }
      warn!(%viewer, %target, attempt, "relation changed concurrently; retrying");
    }

    Err(Error::Conflict(
      "Relation changed concurrently, please retry".into(),
    ))
  }

  /// Accept `requester`'s pending request to `viewer`.
  pub async fn accept(&self, viewer: Uuid, requester: Uuid) -> Result<()> {
    self.resolve_request(viewer, requester, Relation::Friends).await?;
    info!(%viewer, %requester, "friend request accepted");
    Ok(())
  }

  /// Drop `requester`'s pending request to `viewer` without befriending.
  pub async fn reject(&self, viewer: Uuid, requester: Uuid) -> Result<()> {
    self.resolve_request(viewer, requester, Relation::Unrelated).await?;
    info!(%viewer, %requester, "friend request rejected");
    Ok(())
  }

  async fn resolve_request(
    &self,
    viewer: Uuid,
    requester: Uuid,
    next: Relation,
  ) -> Result<()> {
    self.require_user(requester).await?;

    let applied = self
      .store
      .transition(viewer, requester, Relation::IncomingPending, next)
      .await
      .map_err(Error::store)?;

    if applied {
      Ok(())
    } else {
      Err(Error::NoSuchRequest(requester))
    }
  }

  /// The relation of `other` to `viewer`.
  pub async fn relation(&self, viewer: Uuid, other: Uuid) -> Result<Relation> {
    self.store.relation(viewer, other).await.map_err(Error::store)
  }

  pub async fn list_friends(&self, viewer: Uuid) -> Result<Vec<UserSummary>> {
    self.list(viewer, RelationSet::Friends).await
  }

  pub async fn list_incoming(&self, viewer: Uuid) -> Result<Vec<UserSummary>> {
    self.list(viewer, RelationSet::Incoming).await
  }

  pub async fn list_outgoing(&self, viewer: Uuid) -> Result<Vec<UserSummary>> {
    self.list(viewer, RelationSet::Outgoing).await
  }

  async fn list(&self, viewer: Uuid, set: RelationSet) -> Result<Vec<UserSummary>> {
    let ids = self
      .store
      .members(viewer, set)
      .await
      .map_err(Error::store)?;
    debug!(%viewer, ?set, count = ids.len(), "listing relation set");
    self.store.summaries(ids).await.map_err(Error::store)
  }

  /// `true` if `a` and `b` are friends, or are the same identity.
  pub async fn is_friend(&self, a: Uuid, b: Uuid) -> Result<bool> {
    if a == b {
      return Ok(true);
    }
    Ok(self.relation(a, b).await? == Relation::Friends)
  }
}

impl<S> SocialGraph<S>
where
  S: Directory + RelationStore + NoteCatalog,
{
  /// `owner`'s notes, newest first, if `viewer` may see them.
  pub async fn notes_of(&self, viewer: Uuid, owner: Uuid) -> Result<Vec<Note>> {
    if !self.is_friend(viewer, owner).await? {
      return Err(Error::Forbidden(
        "Not authorized to view this user's notes".into(),
      ));
    }
    self.store.notes_by_owner(owner).await.map_err(Error::store)
  }
}
