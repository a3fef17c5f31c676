//! Integration tests for `SqliteStore` and the core services running on it,
//! against an in-memory database.

use std::{sync::Arc, time::Duration};

use rapport_core::{
  Error,
  comments::CommentService,
  identity::NewUser,
  mailbox::Mailbox,
  notify::{FeedItem, FeedTarget, Notifications, UnreadCounts},
  relation::{Relation, RelationSet, RequestOutcome},
  social::{SocialGraph, Target},
  store::{CredentialStore, Directory, RelationStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> Arc<SqliteStore> {
  Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

async fn user(s: &SqliteStore, email: &str) -> Uuid {
  let first = email.split('@').next().map(str::to_owned);
  s.add_user(NewUser { first_name: first, ..NewUser::new(email) })
    .await
    .unwrap()
    .user_id
}

/// Separates timestamps so recency ordering is observable.
async fn tick() { tokio::time::sleep(Duration::from_millis(3)).await; }

fn email(addr: &str) -> Target { Target::Email(addr.into()) }

/// Both halves of every pair agree.
async fn assert_symmetric(s: &SqliteStore, users: &[Uuid]) {
  for &a in users {
    for &b in users {
      if a == b {
        continue;
      }
      let ab = s.relation(a, b).await.unwrap();
      let ba = s.relation(b, a).await.unwrap();
      assert_eq!(ab, ba.mirror(), "asymmetric relation between {a} and {b}");
    }
  }
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_user_by_email() {
  let s = store().await;
  let id = user(&s, "Ada@Example.com").await;

  let found = s.find_by_email("  ada@example.COM ").await.unwrap().unwrap();
  assert_eq!(found.user_id, id);
  assert_eq!(found.email, "ada@example.com");
  assert!(s.find_by_email("bob@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "ada@example.com").await;
  let err = s.add_user(NewUser::new("ADA@example.com")).await.unwrap_err();
  assert!(matches!(err, crate::Error::EmailTaken(_)));
}

#[tokio::test]
async fn summaries_keep_order_and_skip_unknown() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  let out = s
    .summaries(vec![b, Uuid::new_v4(), a, b])
    .await
    .unwrap();
  let ids: Vec<_> = out.iter().map(|u| u.id).collect();
  assert_eq!(ids, vec![b, a]);
  assert_eq!(out[1].name, "a");
}

#[tokio::test]
async fn tokens_resolve_to_their_user() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  s.register_token(a, "digest-a".into()).await.unwrap();

  assert_eq!(s.viewer_for_token("digest-a").await.unwrap(), Some(a));
  assert_eq!(s.viewer_for_token("digest-b").await.unwrap(), None);
}

// ─── Relation store ──────────────────────────────────────────────────────────

#[tokio::test]
async fn transition_is_compare_and_swap() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  assert!(
    s.transition(a, b, Relation::Unrelated, Relation::OutgoingPending)
      .await
      .unwrap()
  );
  // Stale expectation: nothing changes.
  assert!(
    !s.transition(a, b, Relation::Unrelated, Relation::Friends)
      .await
      .unwrap()
  );
  assert_eq!(s.relation(a, b).await.unwrap(), Relation::OutgoingPending);
  assert_eq!(s.relation(b, a).await.unwrap(), Relation::IncomingPending);

  assert!(
    s.transition(b, a, Relation::IncomingPending, Relation::Unrelated)
      .await
      .unwrap()
  );
  assert_eq!(s.relation(a, b).await.unwrap(), Relation::Unrelated);
  assert!(s.members(a, RelationSet::Outgoing).await.unwrap().is_empty());
  assert!(s.members(b, RelationSet::Incoming).await.unwrap().is_empty());
}

#[tokio::test]
async fn self_edges_are_refused_by_the_schema() {
  let s = store().await;
  let a = user(&s, "a@example.com").await;
  assert!(
    s.transition(a, a, Relation::Unrelated, Relation::Friends)
      .await
      .is_err()
  );
  assert_eq!(s.relation(a, a).await.unwrap(), Relation::Unrelated);
}

// ─── Social graph ────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_then_accept_makes_friends() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  let outcome = graph.request(a, &email("b@example.com")).await.unwrap();
  assert_eq!(outcome, RequestOutcome::Sent);

  let incoming = graph.list_incoming(b).await.unwrap();
  assert_eq!(incoming.len(), 1);
  assert_eq!(incoming[0].id, a);
  assert_eq!(graph.list_outgoing(a).await.unwrap()[0].id, b);

  graph.accept(b, a).await.unwrap();

  assert_eq!(graph.list_friends(a).await.unwrap()[0].id, b);
  assert_eq!(graph.list_friends(b).await.unwrap()[0].id, a);
  for id in [a, b] {
    assert!(graph.list_incoming(id).await.unwrap().is_empty());
    assert!(graph.list_outgoing(id).await.unwrap().is_empty());
  }
  assert!(graph.is_friend(a, b).await.unwrap());
}

#[tokio::test]
async fn mutual_requests_auto_accept() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  graph.request(a, &Target::Id(b)).await.unwrap();
  let outcome = graph.request(b, &email("a@example.com")).await.unwrap();

  assert_eq!(outcome, RequestOutcome::AutoAccepted);
  assert_eq!(s.relation(a, b).await.unwrap(), Relation::Friends);
  assert_eq!(s.relation(b, a).await.unwrap(), Relation::Friends);
  for id in [a, b] {
    assert!(s.members(id, RelationSet::Incoming).await.unwrap().is_empty());
    assert!(s.members(id, RelationSet::Outgoing).await.unwrap().is_empty());
  }
}

#[tokio::test]
async fn reject_clears_both_sides_without_friendship() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  graph.request(a, &Target::Id(b)).await.unwrap();
  graph.reject(b, a).await.unwrap();

  assert!(graph.list_outgoing(a).await.unwrap().is_empty());
  assert!(graph.list_incoming(b).await.unwrap().is_empty());
  assert!(graph.list_friends(a).await.unwrap().is_empty());
  assert!(!graph.is_friend(a, b).await.unwrap());

  // The pair is back to unrelated, so a fresh request is allowed.
  assert_eq!(
    graph.request(a, &Target::Id(b)).await.unwrap(),
    RequestOutcome::Sent
  );
}

#[tokio::test]
async fn request_failures() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  assert!(matches!(
    graph.request(a, &email("a@example.com")).await,
    Err(Error::InvalidTarget)
  ));
  assert!(matches!(
    graph.request(a, &email("nobody@example.com")).await,
    Err(Error::NotFound(_))
  ));

  graph.request(a, &Target::Id(b)).await.unwrap();
  assert!(matches!(
    graph.request(a, &Target::Id(b)).await,
    Err(Error::Conflict(_))
  ));

  graph.accept(b, a).await.unwrap();
  for (from, to) in [(a, b), (b, a)] {
    assert!(matches!(
      graph.request(from, &Target::Id(to)).await,
      Err(Error::Conflict(_))
    ));
  }
}

#[tokio::test]
async fn accept_and_reject_require_an_incoming_request() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  assert!(matches!(graph.accept(b, a).await, Err(Error::NoSuchRequest(id)) if id == a));
  assert!(matches!(graph.reject(b, a).await, Err(Error::NoSuchRequest(_))));
  assert!(matches!(
    graph.accept(b, Uuid::new_v4()).await,
    Err(Error::NotFound(_))
  ));

  // The requester cannot accept their own outgoing request.
  graph.request(a, &Target::Id(b)).await.unwrap();
  assert!(matches!(graph.accept(a, b).await, Err(Error::NoSuchRequest(_))));
  assert_eq!(s.relation(a, b).await.unwrap(), Relation::OutgoingPending);
}

#[tokio::test]
async fn relations_stay_symmetric_across_operations() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let mut users = Vec::new();
  for i in 0..4 {
    users.push(user(&s, &format!("u{i}@example.com")).await);
  }
  let [a, b, c, d] = [users[0], users[1], users[2], users[3]];

  graph.request(a, &Target::Id(b)).await.unwrap();
  graph.request(a, &Target::Id(c)).await.unwrap();
  graph.request(d, &Target::Id(a)).await.unwrap();
  assert_symmetric(&s, &users).await;

  graph.accept(b, a).await.unwrap();
  graph.reject(c, a).await.unwrap();
  graph.request(a, &Target::Id(d)).await.unwrap();
  graph.request(c, &Target::Id(b)).await.unwrap();
  let _ = graph.request(b, &Target::Id(a)).await;
  let _ = graph.accept(a, c).await;
  assert_symmetric(&s, &users).await;

  assert!(graph.is_friend(a, b).await.unwrap());
  assert!(graph.is_friend(a, d).await.unwrap());
  assert!(!graph.is_friend(a, c).await.unwrap());
  assert_eq!(s.relation(b, c).await.unwrap(), Relation::IncomingPending);
}

#[tokio::test]
async fn concurrent_crossing_requests_end_as_friends() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  let (to_a, to_b) = (Target::Id(a), Target::Id(b));
  let (ra, rb) = tokio::join!(graph.request(a, &to_b), graph.request(b, &to_a));
  let mut outcomes = vec![ra.unwrap(), rb.unwrap()];
  outcomes.sort_by_key(|o| *o == RequestOutcome::AutoAccepted);

  assert_eq!(outcomes, vec![RequestOutcome::Sent, RequestOutcome::AutoAccepted]);
  assert_eq!(s.relation(a, b).await.unwrap(), Relation::Friends);
  assert_symmetric(&s, &[a, b]).await;
}

#[tokio::test]
async fn notes_are_visible_to_self_and_friends_only() {
  let s = store().await;
  let graph = SocialGraph::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let c = user(&s, "c@example.com").await;

  s.add_note(a, "first", "").await.unwrap();
  tick().await;
  s.add_note(a, "second", "").await.unwrap();

  let own = graph.notes_of(a, a).await.unwrap();
  assert_eq!(
    own.iter().map(|n| n.title.as_str()).collect::<Vec<_>>(),
    vec!["second", "first"]
  );

  graph.request(b, &Target::Id(a)).await.unwrap();
  assert!(matches!(graph.notes_of(b, a).await, Err(Error::Forbidden(_))));
  graph.accept(a, b).await.unwrap();
  assert_eq!(graph.notes_of(b, a).await.unwrap().len(), 2);
  assert!(matches!(graph.notes_of(c, a).await, Err(Error::Forbidden(_))));
}

// ─── Mailbox ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_validates_input() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  assert!(matches!(
    mailbox.send(a, b, "   ".into()).await,
    Err(Error::Validation(_))
  ));
  assert!(matches!(
    mailbox.send(a, Uuid::new_v4(), "hi".into()).await,
    Err(Error::NotFound(_))
  ));
  assert_eq!(mailbox.unread_count(b).await.unwrap(), 0);
}

#[tokio::test]
async fn conversation_is_ordered_and_mark_read_is_idempotent() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let c = user(&s, "c@example.com").await;

  let sent = mailbox.send(a, b, "hi".into()).await.unwrap();
  assert!(!sent.read);
  mailbox.send(b, a, "hello".into()).await.unwrap();
  mailbox.send(a, b, "how are you".into()).await.unwrap();
  mailbox.send(c, b, "unrelated".into()).await.unwrap();

  let convo = mailbox.conversation(b, a).await.unwrap();
  let texts: Vec<_> = convo.iter().map(|m| m.text.as_str()).collect();
  assert_eq!(texts, vec!["hi", "hello", "how are you"]);

  assert_eq!(mailbox.unread_count(b).await.unwrap(), 3);
  assert_eq!(mailbox.mark_read(b, a).await.unwrap(), 1);
  assert_eq!(mailbox.mark_read(b, a).await.unwrap(), 1);
  assert_eq!(mailbox.unread_count(b).await.unwrap(), 1);

  // Messages b sent are untouched by b's mark-read.
  assert_eq!(mailbox.unread_count(a).await.unwrap(), 1);
}

#[tokio::test]
async fn messages_arriving_after_mark_read_stay_unread() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;

  mailbox.send(a, b, "one".into()).await.unwrap();
  assert_eq!(mailbox.mark_read(b, a).await.unwrap(), 0);
  mailbox.send(a, b, "two".into()).await.unwrap();

  let digest = mailbox.unread_digest(b).await.unwrap();
  assert_eq!(digest.len(), 1);
  assert_eq!(digest[0].count, 1);
  assert_eq!(digest[0].last_message.text, "two");
}

#[tokio::test]
async fn unread_groupings_by_sender() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let c = user(&s, "c@example.com").await;

  mailbox.send(a, c, "a1".into()).await.unwrap();
  tick().await;
  mailbox.send(b, c, "b1".into()).await.unwrap();
  tick().await;
  mailbox.send(a, c, "a2".into()).await.unwrap();

  let by_sender = mailbox.unread_by_sender(c).await.unwrap();
  assert_eq!(by_sender.len(), 2);
  assert_eq!((by_sender[0].sender, by_sender[0].count), (a, 2));
  assert_eq!((by_sender[1].sender, by_sender[1].count), (b, 1));

  let digest = mailbox.unread_digest(c).await.unwrap();
  assert_eq!(digest[0].last_message.text, "a2");
  assert_eq!(digest[0].sender_info.as_ref().unwrap().email, "a@example.com");
  assert_eq!(digest[1].last_message.text, "b1");
}

#[tokio::test]
async fn conversations_list_latest_message_per_partner() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let c = user(&s, "c@example.com").await;

  mailbox.send(a, b, "to b".into()).await.unwrap();
  tick().await;
  mailbox.send(c, a, "from c".into()).await.unwrap();
  tick().await;
  mailbox.send(b, a, "from b".into()).await.unwrap();

  let list = mailbox.conversations(a).await.unwrap();
  assert_eq!(list.len(), 2);
  assert_eq!(list[0].partner, b);
  assert_eq!(list[0].last_message.text, "from b");
  assert_eq!(list[1].partner, c);
  assert_eq!(list[1].partner_info.as_ref().unwrap().id, c);
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn owner_comments_are_born_read() {
  let s = store().await;
  let comments = CommentService::new(s.clone());
  let owner = user(&s, "owner@example.com").await;
  let friend = user(&s, "friend@example.com").await;
  let note = s.add_note(owner, "Trip", "").await.unwrap();

  let own = comments.add(note.id, owner, "reminder".into()).await.unwrap();
  assert!(own.comment.read_by_owner);
  let other = comments.add(note.id, friend, "nice".into()).await.unwrap();
  assert!(!other.comment.read_by_owner);
  assert_eq!(other.author_info.unwrap().id, friend);

  assert_eq!(comments.unread_count(owner).await.unwrap(), 1);
  let digest = comments.unread_digest(owner).await.unwrap();
  assert_eq!(digest.len(), 1);
  assert_eq!(digest[0].count, 1);
  assert_eq!(digest[0].last_comment.author, friend);
  assert_eq!(digest[0].note_title, "Trip");
}

#[tokio::test]
async fn self_comments_never_appear_unread() {
  let s = store().await;
  let comments = CommentService::new(s.clone());
  let owner = user(&s, "owner@example.com").await;
  let note = s.add_note(owner, "Solo", "").await.unwrap();

  comments.add(note.id, owner, "one".into()).await.unwrap();
  comments.add(note.id, owner, "two".into()).await.unwrap();

  assert!(comments.unread_digest(owner).await.unwrap().is_empty());
  assert_eq!(comments.unread_count(owner).await.unwrap(), 0);
}

#[tokio::test]
async fn add_validates_text_and_note() {
  let s = store().await;
  let comments = CommentService::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let note = s.add_note(a, "n", "").await.unwrap();

  assert!(matches!(
    comments.add(note.id, a, "".into()).await,
    Err(Error::Validation(_))
  ));
  assert!(matches!(
    comments.add(Uuid::new_v4(), a, "hi".into()).await,
    Err(Error::NotFound(_))
  ));
}

#[tokio::test]
async fn only_the_author_may_edit() {
  let s = store().await;
  let comments = CommentService::new(s.clone());
  let owner = user(&s, "owner@example.com").await;
  let friend = user(&s, "friend@example.com").await;
  let note = s.add_note(owner, "n", "").await.unwrap();
  let c = comments.add(note.id, friend, "tpyo".into()).await.unwrap().comment;

  assert!(matches!(
    comments.edit(c.id, owner, "hijack".into()).await,
    Err(Error::Forbidden(_))
  ));
  assert!(matches!(
    comments.edit(Uuid::new_v4(), friend, "x".into()).await,
    Err(Error::NotFound(_))
  ));

  tick().await;
  let edited = comments.edit(c.id, friend, "typo".into()).await.unwrap().comment;
  assert_eq!(edited.text, "typo");
  assert_eq!(edited.created_at, c.created_at);
  assert!(edited.updated_at > c.updated_at);

  let listed = comments.list_for_note(note.id).await.unwrap();
  assert_eq!(listed[0].comment.text, "typo");
}

#[tokio::test]
async fn mark_read_for_note_is_owner_only_and_scoped() {
  let s = store().await;
  let comments = CommentService::new(s.clone());
  let owner = user(&s, "owner@example.com").await;
  let friend = user(&s, "friend@example.com").await;
  let first = s.add_note(owner, "first", "").await.unwrap();
  let second = s.add_note(owner, "second", "").await.unwrap();

  comments.add(first.id, friend, "a".into()).await.unwrap();
  comments.add(first.id, friend, "b".into()).await.unwrap();
  comments.add(second.id, friend, "c".into()).await.unwrap();

  assert!(matches!(
    comments.mark_read_for_note(friend, first.id).await,
    Err(Error::Forbidden(_))
  ));
  assert!(matches!(
    comments.mark_read_for_note(owner, Uuid::new_v4()).await,
    Err(Error::NotFound(_))
  ));

  assert_eq!(comments.mark_read_for_note(owner, first.id).await.unwrap(), 1);
  assert_eq!(comments.mark_read_for_note(owner, first.id).await.unwrap(), 1);

  let digest = comments.unread_digest(owner).await.unwrap();
  assert_eq!(digest.len(), 1);
  assert_eq!(digest[0].note, second.id);
}

#[tokio::test]
async fn list_and_counts_for_notes() {
  let s = store().await;
  let comments = CommentService::new(s.clone());
  let a = user(&s, "a@example.com").await;
  let b = user(&s, "b@example.com").await;
  let busy = s.add_note(a, "busy", "").await.unwrap();
  let quiet = s.add_note(a, "quiet", "").await.unwrap();

  comments.add(busy.id, b, "1".into()).await.unwrap();
  comments.add(busy.id, a, "2".into()).await.unwrap();
  comments.add(busy.id, b, "3".into()).await.unwrap();

  let listed = comments.list_for_note(busy.id).await.unwrap();
  let texts: Vec<_> = listed.iter().map(|c| c.comment.text.as_str()).collect();
  assert_eq!(texts, vec!["1", "2", "3"]);
  assert_eq!(listed[1].author_info.as_ref().unwrap().id, a);

  let counts = comments
    .counts_for_notes(vec![quiet.id, busy.id])
    .await
    .unwrap();
  assert_eq!((counts[0].note, counts[0].count), (quiet.id, 0));
  assert_eq!((counts[1].note, counts[1].count), (busy.id, 3));
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_merges_sources_newest_first() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let comments = CommentService::new(s.clone());
  let feed = Notifications::new(s.clone());
  let owner = user(&s, "owner@example.com").await;
  let friend = user(&s, "friend@example.com").await;
  let note = s.add_note(owner, "Plans", "").await.unwrap();

  mailbox.send(friend, owner, "hi".into()).await.unwrap();
  tick().await;
  comments.add(note.id, friend, "looks good".into()).await.unwrap();

  let items = feed.feed(owner).await.unwrap();
  assert_eq!(items.len(), 2);
  assert!(matches!(&items[0], FeedItem::Comment { note_title, .. } if note_title == "Plans"));
  assert!(matches!(&items[1], FeedItem::Message { sender, .. } if *sender == friend));

  tick().await;
  mailbox.send(friend, owner, "ping".into()).await.unwrap();
  let items = feed.feed(owner).await.unwrap();
  assert_eq!(items[0].target(), FeedTarget::Message { sender: friend });
  assert_eq!(items[0].count(), 2);
  assert_eq!(items[0].last().text, "ping");
}

#[tokio::test]
async fn resolve_dispatches_by_item_type() {
  let s = store().await;
  let mailbox = Mailbox::new(s.clone());
  let comments = CommentService::new(s.clone());
  let feed = Notifications::new(s.clone());
  let owner = user(&s, "owner@example.com").await;
  let friend = user(&s, "friend@example.com").await;
  let note = s.add_note(owner, "Plans", "").await.unwrap();

  mailbox.send(friend, owner, "hi".into()).await.unwrap();
  comments.add(note.id, friend, "c".into()).await.unwrap();
  assert_eq!(
    feed.counts(owner).await.unwrap(),
    UnreadCounts { messages: 1, comments: 1 }
  );

  let after = feed
    .resolve(owner, FeedTarget::Comment { note: note.id })
    .await
    .unwrap();
  assert_eq!(after, UnreadCounts { messages: 1, comments: 0 });

  let after = feed
    .resolve(owner, FeedTarget::Message { sender: friend })
    .await
    .unwrap();
  assert_eq!(after, UnreadCounts { messages: 0, comments: 0 });
  assert!(feed.feed(owner).await.unwrap().is_empty());

  assert!(matches!(
    feed.resolve(friend, FeedTarget::Comment { note: note.id }).await,
    Err(Error::Forbidden(_))
  ));
}
