//! Identities as seen by the social layer.
//!
//! Identity issuance and credentials live elsewhere; this layer only reads a
//! user's display fields and refers to users by UUID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored user record, limited to the fields the social layer displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub user_id:     Uuid,
  /// Always lowercase and trimmed.
  pub email:       String,
  pub first_name:  Option<String>,
  pub middle_name: Option<String>,
  pub last_name:   Option<String>,
  /// URL of the profile picture; empty when none was uploaded.
  pub avatar:      String,
  pub created_at:  DateTime<Utc>,
}

impl Profile {
  /// The non-empty name parts joined with single spaces.
  pub fn display_name(&self) -> String {
    [&self.first_name, &self.middle_name, &self.last_name]
      .into_iter()
      .filter_map(|p| p.as_deref().map(str::trim))
      .filter(|p| !p.is_empty())
      .collect::<Vec<_>>()
      .join(" ")
  }

  pub fn summary(&self) -> UserSummary {
    UserSummary {
      id:     self.user_id,
      name:   self.display_name(),
      email:  self.email.clone(),
      avatar: self.avatar.clone(),
    }
  }
}

/// Display-enriched reference to a user, embedded in list and digest
/// responses so they render without further lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub id:     Uuid,
  pub name:   String,
  pub email:  String,
  pub avatar: String,
}

/// Input for seeding an identity record into a backend.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
  pub email:       String,
  pub first_name:  Option<String>,
  pub middle_name: Option<String>,
  pub last_name:   Option<String>,
  pub avatar:      String,
}

impl NewUser {
  pub fn new(email: impl Into<String>) -> Self {
    Self { email: email.into(), ..Self::default() }
  }
}

/// Canonical form of an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
