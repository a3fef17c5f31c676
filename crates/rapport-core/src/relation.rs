//! The friend relation between two identities.
//!
//! Each identity holds three sets: friends, incoming requests and outgoing
//! requests. A pair of identities is always in exactly one of the states of
//! [`Relation`], seen from one side; the other side sees the mirror image.

use serde::{Deserialize, Serialize};

/// The relation of `other` to `viewer`, seen from `viewer`'s side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
  Unrelated,
  /// `viewer` asked `other` to be friends.
  OutgoingPending,
  /// `other` asked `viewer` to be friends.
  IncomingPending,
  Friends,
}

impl Relation {
  /// The same relation seen from the other side of the pair.
  pub fn mirror(self) -> Self {
    match self {
      Self::OutgoingPending => Self::IncomingPending,
      Self::IncomingPending => Self::OutgoingPending,
      other => other,
    }
  }

  /// The set the counterpart lives in on the viewer's record, if any.
  pub fn set(self) -> Option<RelationSet> {
    match self {
      Self::Unrelated => None,
      Self::OutgoingPending => Some(RelationSet::Outgoing),
      Self::IncomingPending => Some(RelationSet::Incoming),
      Self::Friends => Some(RelationSet::Friends),
    }
  }
}

/// One of the three per-identity sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationSet {
  Friends,
  Incoming,
  Outgoing,
}

impl From<RelationSet> for Relation {
  fn from(set: RelationSet) -> Self {
    match set {
      RelationSet::Friends => Self::Friends,
      RelationSet::Incoming => Self::IncomingPending,
      RelationSet::Outgoing => Self::OutgoingPending,
    }
  }
}

/// Result of [`crate::social::SocialGraph::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
  /// A new pending request now exists.
  Sent,
  /// The target had already asked the viewer; both are now friends.
  AutoAccepted,
}

impl RequestOutcome {
  pub fn message(self) -> &'static str {
    match self {
      Self::Sent => "Friend request sent",
      Self::AutoAccepted => "Friend request accepted automatically",
    }
  }
}
