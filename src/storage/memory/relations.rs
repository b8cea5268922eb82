//! RelationStore for the memory backend.

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use tracing::warn;

use super::{MemoryStore, Seq, State};
use crate::ledger::CounterDelta;
use crate::model::{
    Page, PageRequest, Relation, RelationEdge, RelationOp, RelationWrite, Snippet, User, UserId,
};
use crate::storage::helpers::paginate;
use crate::storage::{RelationStore, Result, StorageError};

/// Insert or remove `key`; returns whether the map changed.
fn mutate<K: Eq + Hash>(map: &mut HashMap<K, Seq>, key: K, op: RelationOp, seq: Seq) -> bool {
    match op {
        RelationOp::Insert => {
            if map.contains_key(&key) {
                false
            } else {
                map.insert(key, seq);
                true
            }
        }
        RelationOp::Delete => map.remove(&key).is_some(),
    }
}

/// Entries matching `pick`, most recently inserted first.
fn newest_first<K, T>(map: &HashMap<K, Seq>, pick: impl Fn(&K) -> Option<T>) -> Vec<T> {
    let mut hits: Vec<(Seq, T)> = map
        .iter()
        .filter_map(|(key, seq)| pick(key).map(|item| (*seq, item)))
        .collect();
    hits.sort_by(|a, b| b.0.cmp(&a.0));
    hits.into_iter().map(|(_, item)| item).collect()
}

fn users_page(state: &State, ids: Vec<UserId>, page: PageRequest) -> Page<User> {
    let users = ids
        .into_iter()
        .filter_map(|id| state.users.get(&id).cloned())
        .collect();
    paginate(users, page)
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn relation_exists(&self, actor: UserId, relation: Relation) -> Result<bool> {
        let state = self.state.read().await;
        Ok(match relation {
            Relation::Like(snippet) => state.likes.contains_key(&(actor, snippet)),
            Relation::Bookmark(snippet) => state.bookmarks.contains_key(&(actor, snippet)),
            Relation::Follow(user) => state.follows.contains_key(&(actor, user)),
        })
    }

    async fn write_relation(
        &self,
        edge: &RelationEdge,
        op: RelationOp,
        deltas: &[CounterDelta],
    ) -> Result<RelationWrite> {
        let fail_counters = *self.fail_counters.read().await;
        let mut state = self.state.write().await;
        let actor = edge.actor;

        if op == RelationOp::Insert {
            if !state.users.contains_key(&actor) {
                return Err(StorageError::not_found("User", actor));
            }
            match edge.relation {
                Relation::Like(s) | Relation::Bookmark(s) if !state.snippets.contains_key(&s) => {
                    return Err(StorageError::not_found("Snippet", s));
                }
                Relation::Follow(u) if !state.users.contains_key(&u) => {
                    return Err(StorageError::not_found("User", u));
                }
                _ => {}
            }
        }

        let seq = state.next_seq();
        let changed = match edge.relation {
            Relation::Like(snippet) => mutate(&mut state.likes, (actor, snippet), op, seq),
            Relation::Bookmark(snippet) => mutate(&mut state.bookmarks, (actor, snippet), op, seq),
            Relation::Follow(user) => mutate(&mut state.follows, (actor, user), op, seq),
        };
        if !changed {
            return Ok(RelationWrite::absorbed());
        }

        if fail_counters {
            warn!(kind = %edge.relation.kind(), "Injected counter failure after relation write");
            return Ok(RelationWrite {
                applied: true,
                counters_synced: false,
            });
        }

        match state.apply_deltas(deltas) {
            Ok(()) => Ok(RelationWrite::applied()),
            Err(e) => {
                warn!(error = %e, "Counter update failed after relation write");
                Ok(RelationWrite {
                    applied: true,
                    counters_synced: false,
                })
            }
        }
    }

    async fn followers(&self, user: UserId, page: PageRequest) -> Result<Page<User>> {
        let state = self.state.read().await;
        let ids = newest_first(&state.follows, |(follower, following)| {
            (*following == user).then_some(*follower)
        });
        Ok(users_page(&state, ids, page))
    }

    async fn following(&self, user: UserId, page: PageRequest) -> Result<Page<User>> {
        let state = self.state.read().await;
        let ids = newest_first(&state.follows, |(follower, following)| {
            (*follower == user).then_some(*following)
        });
        Ok(users_page(&state, ids, page))
    }

    async fn bookmarked_snippets(&self, user: UserId, page: PageRequest) -> Result<Page<Snippet>> {
        let state = self.state.read().await;
        let ids = newest_first(&state.bookmarks, |(owner, snippet)| {
            (*owner == user).then_some(*snippet)
        });
        let snippets = ids
            .into_iter()
            .filter_map(|id| state.snippets.get(&id).cloned())
            .collect();
        Ok(paginate(snippets, page))
    }
}
