//! Grouping of unread items into digests.
//!
//! Both unread sources (messages by sender, comments by note) reduce to the
//! same operation over a snapshot: group by key, count members, keep the most
//! recent member as the representative.

use std::collections::{BTreeMap, btree_map::Entry};

use chrono::{DateTime, Utc};

/// Longest preview shown in a digest before it is cut.
pub const PREVIEW_MAX_CHARS: usize = 80;

const ELLIPSIS: &str = "...";

/// One group produced by [`group_latest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, T> {
  pub key:    K,
  pub count:  u64,
  /// The member with the latest timestamp. On equal timestamps the member
  /// that came later in the input wins.
  pub latest: T,
}

/// Group `items` by `key`, newest group first.
///
/// Groups are ordered by their representative's timestamp, descending; ties
/// are broken by key so the output is deterministic.
pub fn group_latest<K, T, I, F, G>(items: I, key: F, at: G) -> Vec<Group<K, T>>
where
  I: IntoIterator<Item = T>,
  K: Ord + Clone,
  F: Fn(&T) -> K,
  G: Fn(&T) -> DateTime<Utc>,
{
  let mut groups: BTreeMap<K, Group<K, T>> = BTreeMap::new();

  for item in items {
    match groups.entry(key(&item)) {
      Entry::Vacant(slot) => {
        let key = slot.key().clone();
        slot.insert(Group { key, count: 1, latest: item });
      }
      Entry::Occupied(mut slot) => {
        let group = slot.get_mut();
        group.count += 1;
        if at(&item) >= at(&group.latest) {
          group.latest = item;
        }
      }
    }
  }

  let mut out: Vec<_> = groups.into_values().collect();
  out.sort_by(|a, b| {
    at(&b.latest)
      .cmp(&at(&a.latest))
      .then_with(|| a.key.cmp(&b.key))
  });
  out
}

/// Cut `text` to at most [`PREVIEW_MAX_CHARS`] characters, ending in `...`
/// when anything was dropped.
pub fn preview(text: &str) -> String {
  if text.chars().count() <= PREVIEW_MAX_CHARS {
    return text.to_owned();
  }
  let keep = PREVIEW_MAX_CHARS - ELLIPSIS.len();
  let mut out: String = text.chars().take(keep).collect();
  out.push_str(ELLIPSIS);
  out
}
