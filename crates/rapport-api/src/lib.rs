//! JSON REST API for Rapport.
//!
//! Exposes an axum [`Router`] over friendship, messaging, comment and
//! notification operations, backed by any type implementing [`Store`].
//! Every route requires a bearer token (see [`auth`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rapport_api::api_router(AppState::new(store.clone())))
//! ```

pub mod auth;
pub mod body;
pub mod comments;
pub mod error;
pub mod friends;
pub mod messages;
pub mod notifications;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use rapport_core::{
  comments::CommentService,
  mailbox::Mailbox,
  notify::Notifications,
  social::SocialGraph,
  store::{
    CommentStore, CredentialStore, Directory, MailboxStore, NoteCatalog, RelationStore,
  },
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Store bound ──────────────────────────────────────────────────────────────

/// Everything the API needs from a backend.
pub trait Store:
  Directory
  + CredentialStore
  + NoteCatalog
  + RelationStore
  + MailboxStore
  + CommentStore
  + 'static
{
}

impl<T> Store for T where
  T: Directory
    + CredentialStore
    + NoteCatalog
    + RelationStore
    + MailboxStore
    + CommentStore
    + 'static
{
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:         Arc<S>,
  pub graph:         SocialGraph<S>,
  pub mailbox:       Mailbox<S>,
  pub comments:      CommentService<S>,
  pub notifications: Notifications<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:         self.store.clone(),
      graph:         self.graph.clone(),
      mailbox:       self.mailbox.clone(),
      comments:      self.comments.clone(),
      notifications: self.notifications.clone(),
    }
  }
}

impl<S: Store> AppState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      graph:         SocialGraph::new(store.clone()),
      mailbox:       Mailbox::new(store.clone()),
      comments:      CommentService::new(store.clone()),
      notifications: Notifications::new(store.clone()),
      store,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Store>(state: AppState<S>) -> Router<()> {
  Router::new()
    // Friends
    .route("/friends",                            get(friends::list::<S>))
    .route("/friends/request",                    post(friends::request::<S>))
    .route("/friends/requests/incoming",          get(friends::incoming::<S>))
    .route("/friends/requests/outgoing",          get(friends::outgoing::<S>))
    .route("/friends/requests/{id}/accept",       post(friends::accept::<S>))
    .route("/friends/requests/{id}/reject",       post(friends::reject::<S>))
    .route("/friends/{id}/notes",                 get(friends::notes::<S>))
    // Messages
    .route("/messages/send",                      post(messages::send::<S>))
    .route("/messages/conversations",             get(messages::conversations::<S>))
    .route("/messages/conversation/{user_id}",    get(messages::conversation::<S>))
    .route("/messages/conversation/{user_id}/mark-read", post(messages::mark_read::<S>))
    .route("/messages/unread/count",              get(messages::unread_count::<S>))
    .route("/messages/unread/by-sender",          get(messages::unread_by_sender::<S>))
    .route("/messages/unread/list",               get(messages::unread_list::<S>))
    // Comments
    .route("/comments/note/{note_id}",            get(comments::list::<S>).post(comments::add::<S>))
    .route("/comments/note/{note_id}/mark-read",  post(comments::mark_read::<S>))
    .route("/comments/unread/list",               get(comments::unread_list::<S>))
    .route("/comments/unread/count",              get(comments::unread_count::<S>))
    .route("/comments/counts",                    get(comments::counts::<S>))
    .route("/comments/{comment_id}",              put(comments::edit::<S>))
    // Notifications
    .route("/notifications",                      get(notifications::feed::<S>))
    .route("/notifications/counts",               get(notifications::counts::<S>))
    .route("/notifications/resolve",              post(notifications::resolve::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
