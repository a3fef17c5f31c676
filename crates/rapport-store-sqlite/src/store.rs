//! [`SqliteStore`], the SQLite implementation of the storage traits.

use std::{collections::HashMap, path::Path};

use rapport_core::{
  comment::{Comment, NewComment},
  identity::{NewUser, Profile, UserSummary, normalize_email},
  message::{Message, NewMessage},
  note::{Note, NoteCommentCount, NoteRef},
  relation::{Relation, RelationSet},
  store::{
    Backend, CommentStore, CredentialStore, Directory, MailboxStore, MarkRead,
    NoteCatalog, RelationStore,
  },
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    COMMENT_COLUMNS, MESSAGE_COLUMNS, NOTE_COLUMNS, RawComment, RawMessage,
    RawNote, RawUser, USER_COLUMNS, decode_relation_set, decode_uuid,
    encode_dt, encode_relation_set, encode_uuid, now,
  },
  schema::SCHEMA,
};

const UNREAD_COMMENTS_FOR_OWNER: &str = "
  FROM comments c
  JOIN notes n ON n.note_id = c.note_id
  WHERE n.owner_id = ?1
    AND c.read_by_owner = 0
    AND c.author_id != ?1";

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn count_unread_messages(conn: &rusqlite::Connection, viewer: &str) -> rusqlite::Result<u64> {
  conn.query_row(
    "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND read = 0",
    rusqlite::params![viewer],
    |r| r.get::<_, i64>(0),
  )
  .map(|n| n as u64)
}

fn count_unread_comments(conn: &rusqlite::Connection, owner: &str) -> rusqlite::Result<u64> {
  conn.query_row(
    &format!("SELECT COUNT(*) {UNREAD_COMMENTS_FOR_OWNER}"),
    rusqlite::params![owner],
    |r| r.get::<_, i64>(0),
  )
  .map(|n| n as u64)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rapport store backed by a single SQLite file.
///
/// Clones share one reference-counted connection. All calls
/// are serialised on the connection's worker thread; multi-statement writes
/// additionally run inside `IMMEDIATE` transactions.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }

  // ── Seeding for the external collaborators ────────────────────────────────

  /// Insert an identity record. The email is normalised first and must be
  /// unused.
  pub async fn add_user(&self, input: NewUser) -> Result<Profile> {
    let profile = Profile {
      user_id:     Uuid::new_v4(),
      email:       normalize_email(&input.email),
      first_name:  input.first_name,
      middle_name: input.middle_name,
      last_name:   input.last_name,
      avatar:      input.avatar,
      created_at:  now(),
    };

    let id_str = encode_uuid(profile.user_id);
    let at_str = encode_dt(profile.created_at);
    let row = profile.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT OR IGNORE INTO users
             (user_id, email, first_name, middle_name, last_name, avatar, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            row.email,
            row.first_name,
            row.middle_name,
            row.last_name,
            row.avatar,
            at_str,
          ],
        )?;
        Ok(changed == 1)
      })
      .await?;

    if !inserted {
      return Err(Error::EmailTaken(profile.email));
    }
    Ok(profile)
  }

  /// Associate a bearer-token digest with `user_id`.
  pub async fn register_token(&self, user_id: Uuid, token_digest: String) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO credentials (token_digest, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token_digest, id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a note owned by `owner`.
  pub async fn add_note(
    &self,
    owner:   Uuid,
    title:   impl Into<String>,
    content: impl Into<String>,
  ) -> Result<Note> {
    let at = now();
    let note = Note {
      id:         Uuid::new_v4(),
      owner,
      title:      title.into(),
      content:    content.into(),
      created_at: at,
      updated_at: at,
    };

    let id_str    = encode_uuid(note.id);
    let owner_str = encode_uuid(owner);
    let at_str    = encode_dt(at);
    let title     = note.title.clone();
    let content   = note.content.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notes (note_id, owner_id, title, content, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, owner_str, title, content, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(note)
  }

  async fn query_messages(&self, sql: String, params: Vec<String>) -> Result<Vec<Message>> {
    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn query_comments(&self, sql: String, params: Vec<String>) -> Result<Vec<Comment>> {
    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }
}

impl Backend for SqliteStore {
  type Error = Error;
}

// ─── Directory / credentials ─────────────────────────────────────────────────

impl Directory for SqliteStore {
  async fn get_user(&self, id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_profile).transpose()
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
    let email = normalize_email(email);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_profile).transpose()
  }

  async fn summaries(&self, ids: Vec<Uuid>) -> Result<Vec<UserSummary>> {
    let mut wanted: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
      if !wanted.contains(&id) {
        wanted.push(id);
      }
    }
    if wanted.is_empty() {
      return Ok(Vec::new());
    }

    let id_strs: Vec<String> = wanted.iter().copied().map(encode_uuid).collect();
    let sql = format!(
      "SELECT {USER_COLUMNS} FROM users WHERE user_id IN ({})",
      placeholders(id_strs.len())
    );

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut by_id: HashMap<Uuid, UserSummary> = raws
      .into_iter()
      .map(|raw| raw.into_profile().map(|p| (p.user_id, p.summary())))
      .collect::<Result<_>>()?;

    Ok(wanted.into_iter().filter_map(|id| by_id.remove(&id)).collect())
  }
}

impl CredentialStore for SqliteStore {
  async fn viewer_for_token(&self, token_digest: &str) -> Result<Option<Uuid>> {
    let digest = token_digest.to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id FROM credentials WHERE token_digest = ?1",
            rusqlite::params![digest],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_uuid).transpose()
  }
}

// ─── Notes ───────────────────────────────────────────────────────────────────

impl NoteCatalog for SqliteStore {
  async fn get_note(&self, id: Uuid) -> Result<Option<NoteRef>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawNote> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = ?1"),
            rusqlite::params![id_str],
            RawNote::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawNote::into_ref).transpose()
  }

  async fn notes_by_owner(&self, owner: Uuid) -> Result<Vec<Note>> {
    let owner_str = encode_uuid(owner);

    let raws: Vec<RawNote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTE_COLUMNS} FROM notes
           WHERE owner_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawNote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNote::into_note).collect()
  }
}

// ─── Relations ───────────────────────────────────────────────────────────────

impl RelationStore for SqliteStore {
  async fn relation(&self, viewer: Uuid, other: Uuid) -> Result<Relation> {
    let viewer_str = encode_uuid(viewer);
    let other_str  = encode_uuid(other);

    let kind: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT kind FROM relations WHERE owner_id = ?1 AND other_id = ?2",
            rusqlite::params![viewer_str, other_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(match kind {
      Some(k) => decode_relation_set(&k)?.into(),
      None    => Relation::Unrelated,
    })
  }

  async fn members(&self, viewer: Uuid, set: RelationSet) -> Result<Vec<Uuid>> {
    let viewer_str = encode_uuid(viewer);
    let kind       = encode_relation_set(set);

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT other_id FROM relations
           WHERE owner_id = ?1 AND kind = ?2
           ORDER BY since, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![viewer_str, kind], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn transition(
    &self,
    viewer:   Uuid,
    other:    Uuid,
    expected: Relation,
    next:     Relation,
  ) -> Result<bool> {
    let viewer_str  = encode_uuid(viewer);
    let other_str   = encode_uuid(other);
    let expected    = expected.set().map(encode_relation_set);
    let mine        = next.set().map(encode_relation_set);
    let theirs      = next.mirror().set().map(encode_relation_set);
    let since       = encode_dt(now());

    let applied = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
          .query_row(
            "SELECT kind FROM relations WHERE owner_id = ?1 AND other_id = ?2",
            rusqlite::params![viewer_str, other_str],
            |r| r.get(0),
          )
          .optional()?;

        // Dropping `tx` rolls back; nothing was written.
        if current.as_deref() != expected {
          return Ok(false);
        }

        tx.execute(
          "DELETE FROM relations
           WHERE (owner_id = ?1 AND other_id = ?2)
              OR (owner_id = ?2 AND other_id = ?1)",
          rusqlite::params![viewer_str, other_str],
        )?;

        if let (Some(mine), Some(theirs)) = (mine, theirs) {
          tx.execute(
            "INSERT INTO relations (owner_id, other_id, kind, since)
             VALUES (?1, ?2, ?3, ?5), (?2, ?1, ?4, ?5)",
            rusqlite::params![viewer_str, other_str, mine, theirs, since],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(applied)
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

impl MailboxStore for SqliteStore {
  async fn insert_message(&self, input: NewMessage) -> Result<Message> {
    let message = Message {
      id:         Uuid::new_v4(),
      sender:     input.sender,
      recipient:  input.recipient,
      text:       input.text,
      read:       false,
      created_at: now(),
    };

    let id_str        = encode_uuid(message.id);
    let sender_str    = encode_uuid(message.sender);
    let recipient_str = encode_uuid(message.recipient);
    let text          = message.text.clone();
    let at_str        = encode_dt(message.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (message_id, sender_id, recipient_id, text, read, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, sender_str, recipient_str, text, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn conversation(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
    self
      .query_messages(
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE (sender_id = ?1 AND recipient_id = ?2)
              OR (sender_id = ?2 AND recipient_id = ?1)
           ORDER BY created_at, rowid"
        ),
        vec![encode_uuid(a), encode_uuid(b)],
      )
      .await
  }

  async fn messages_involving(&self, viewer: Uuid) -> Result<Vec<Message>> {
    self
      .query_messages(
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE sender_id = ?1 OR recipient_id = ?1
           ORDER BY created_at, rowid"
        ),
        vec![encode_uuid(viewer)],
      )
      .await
  }

  async fn unread_for(&self, viewer: Uuid) -> Result<Vec<Message>> {
    self
      .query_messages(
        format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE recipient_id = ?1 AND read = 0
           ORDER BY created_at, rowid"
        ),
        vec![encode_uuid(viewer)],
      )
      .await
  }

  async fn count_unread(&self, viewer: Uuid) -> Result<u64> {
    let viewer_str = encode_uuid(viewer);
    let count = self
      .conn
      .call(move |conn| Ok(count_unread_messages(conn, &viewer_str)?))
      .await?;
    Ok(count)
  }

  async fn mark_read_from(&self, viewer: Uuid, partner: Uuid) -> Result<MarkRead> {
    let viewer_str  = encode_uuid(viewer);
    let partner_str = encode_uuid(partner);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let marked = tx.execute(
          "UPDATE messages SET read = 1
           WHERE sender_id = ?1 AND recipient_id = ?2 AND read = 0",
          rusqlite::params![partner_str, viewer_str],
        )?;
        let unread = count_unread_messages(&tx, &viewer_str)?;
        tx.commit()?;
        Ok(MarkRead { marked: marked as u64, unread })
      })
      .await?;

    Ok(outcome)
  }
}

// ─── Comments ────────────────────────────────────────────────────────────────

impl CommentStore for SqliteStore {
  async fn insert_comment(&self, input: NewComment) -> Result<Comment> {
    let at = now();
    let comment = Comment {
      id:            Uuid::new_v4(),
      note:          input.note,
      author:        input.author,
      text:          input.text,
      read_by_owner: input.read_by_owner,
      created_at:    at,
      updated_at:    at,
    };

    let id_str     = encode_uuid(comment.id);
    let note_str   = encode_uuid(comment.note);
    let author_str = encode_uuid(comment.author);
    let text       = comment.text.clone();
    let read       = comment.read_by_owner;
    let at_str     = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments
             (comment_id, note_id, author_id, text, read_by_owner, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, note_str, author_str, text, read, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(comment)
  }

  async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
    let mut found = self
      .query_comments(
        format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.comment_id = ?1"),
        vec![encode_uuid(id)],
      )
      .await?;
    Ok(found.pop())
  }

  async fn update_comment_text(&self, id: Uuid, text: String) -> Result<Option<Comment>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE comments SET text = ?2, updated_at = ?3 WHERE comment_id = ?1",
          rusqlite::params![id_str, text, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_comment(id).await
  }

  async fn comments_for_note(&self, note: Uuid) -> Result<Vec<Comment>> {
    self
      .query_comments(
        format!(
          "SELECT {COMMENT_COLUMNS} FROM comments c
           WHERE c.note_id = ?1
           ORDER BY c.created_at, c.rowid"
        ),
        vec![encode_uuid(note)],
      )
      .await
  }

  async fn unread_for_owner(&self, owner: Uuid) -> Result<Vec<Comment>> {
    self
      .query_comments(
        format!(
          "SELECT {COMMENT_COLUMNS} {UNREAD_COMMENTS_FOR_OWNER}
           ORDER BY c.created_at, c.rowid"
        ),
        vec![encode_uuid(owner)],
      )
      .await
  }

  async fn count_unread_for_owner(&self, owner: Uuid) -> Result<u64> {
    let owner_str = encode_uuid(owner);
    let count = self
      .conn
      .call(move |conn| Ok(count_unread_comments(conn, &owner_str)?))
      .await?;
    Ok(count)
  }

  async fn mark_read_for_note(&self, owner: Uuid, note: Uuid) -> Result<MarkRead> {
    let owner_str = encode_uuid(owner);
    let note_str  = encode_uuid(note);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let marked = tx.execute(
          "UPDATE comments SET read_by_owner = 1
           WHERE note_id = ?1 AND read_by_owner = 0",
          rusqlite::params![note_str],
        )?;
        let unread = count_unread_comments(&tx, &owner_str)?;
        tx.commit()?;
        Ok(MarkRead { marked: marked as u64, unread })
      })
      .await?;

    Ok(outcome)
  }

  async fn counts_for_notes(&self, notes: Vec<Uuid>) -> Result<Vec<NoteCommentCount>> {
    if notes.is_empty() {
      return Ok(Vec::new());
    }
    let note_strs: Vec<String> = notes.into_iter().map(encode_uuid).collect();
    let sql = format!(
      "SELECT note_id, COUNT(*) FROM comments
       WHERE note_id IN ({})
       GROUP BY note_id",
      placeholders(note_strs.len())
    );

    let raws: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(note_strs.iter()), |r| {
            Ok((r.get(0)?, r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(note, count)| Ok(NoteCommentCount { note: decode_uuid(&note)?, count: count as u64 }))
      .collect()
  }
}
