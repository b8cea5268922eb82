//! ContentStore for the memory backend.

use async_trait::async_trait;

use super::MemoryStore;
use crate::ledger::CounterDelta;
use crate::model::{
    Comment, CommentId, CommentThread, ForkDraft, ForkRecord, NewSnippet, NewUser, Page,
    PageRequest, Snippet, SnippetId, SnippetView, TagId, User, UserId,
};
use crate::storage::helpers::{build_threads, paginate};
use crate::storage::{ContentStore, Result, StorageError};

fn stored_snippet(snippet: &NewSnippet) -> Snippet {
    let draft = &snippet.draft;
    Snippet {
        id: snippet.id,
        owner: snippet.owner,
        title: draft.title.clone(),
        description: draft.description.clone(),
        code: draft.code.clone(),
        language: draft.language.clone(),
        topics: draft.topics.clone(),
        complexity: draft.complexity.clone(),
        is_public: draft.is_public,
        like_count: 0,
        comment_count: 0,
        view_count: 0,
        fork_count: 0,
        created_at: snippet.created_at,
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(StorageError::Conflict(format!("user {} exists", user.id)));
        }
        let stored = User {
            id: user.id,
            name: user.name.clone(),
            follower_count: 0,
            following_count: 0,
            snippet_count: 0,
            total_likes_received: 0,
            created_at: chrono::Utc::now(),
        };
        state.users.insert(user.id, stored.clone());
        Ok(stored)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn publish_snippet(&self, snippet: &NewSnippet, deltas: &[CounterDelta]) -> Result<Snippet> {
        self.counters_failing().await?;
        let mut state = self.state.write().await;
        if !state.users.contains_key(&snippet.owner) {
            return Err(StorageError::not_found("User", snippet.owner));
        }
        if state.snippets.contains_key(&snippet.id) {
            return Err(StorageError::Conflict(format!("snippet {} exists", snippet.id)));
        }

        let stored = stored_snippet(snippet);
        state.snippets.insert(snippet.id, stored.clone());
        state.tags.insert(snippet.id, snippet.draft.tags.clone());

        if let Err(e) = state.apply_deltas(deltas) {
            state.snippets.remove(&snippet.id);
            state.tags.remove(&snippet.id);
            return Err(e);
        }
        Ok(stored)
    }

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>> {
        Ok(self.state.read().await.snippets.get(&id).cloned())
    }

    async fn snippet_tags(&self, id: SnippetId) -> Result<Vec<TagId>> {
        let state = self.state.read().await;
        let mut tags = state.tags.get(&id).cloned().unwrap_or_default();
        tags.sort_unstable();
        tags.dedup();
        Ok(tags)
    }

    async fn create_fork(&self, draft: &ForkDraft, deltas: &[CounterDelta]) -> Result<Snippet> {
        self.counters_failing().await?;
        let mut state = self.state.write().await;
        let snippet = &draft.snippet;
        if !state.snippets.contains_key(&draft.provenance.original) {
            return Err(StorageError::not_found("Snippet", draft.provenance.original));
        }
        if !state.users.contains_key(&snippet.owner) {
            return Err(StorageError::not_found("User", snippet.owner));
        }

        let stored = stored_snippet(snippet);
        state.snippets.insert(snippet.id, stored.clone());
        state.tags.insert(snippet.id, snippet.draft.tags.clone());

        if let Err(e) = state.apply_deltas(deltas) {
            state.snippets.remove(&snippet.id);
            state.tags.remove(&snippet.id);
            return Err(e);
        }
        state.forks.push(draft.provenance.clone());
        Ok(stored)
    }

    async fn forks_of(&self, original: SnippetId) -> Result<Vec<ForkRecord>> {
        let state = self.state.read().await;
        Ok(state
            .forks
            .iter()
            .filter(|f| f.original == original)
            .cloned()
            .collect())
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_comment(&self, comment: &Comment, deltas: &[CounterDelta]) -> Result<()> {
        self.counters_failing().await?;
        let mut state = self.state.write().await;
        if !state.snippets.contains_key(&comment.snippet) {
            return Err(StorageError::not_found("Snippet", comment.snippet));
        }
        if !state.users.contains_key(&comment.author) {
            return Err(StorageError::not_found("User", comment.author));
        }
        state.apply_deltas(deltas)?;
        state.comments.push(comment.clone());
        Ok(())
    }

    async fn list_comment_threads(
        &self,
        snippet: SnippetId,
        page: PageRequest,
    ) -> Result<Page<CommentThread>> {
        let state = self.state.read().await;

        // Newest first; reversing before the stable sort keeps later inserts
        // ahead of earlier ones when timestamps tie.
        let mut roots: Vec<Comment> = state
            .comments
            .iter()
            .rev()
            .filter(|c| c.snippet == snippet && c.parent.is_none())
            .cloned()
            .collect();
        roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut replies: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.snippet == snippet && c.parent.is_some())
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let roots = paginate(roots, page);
        let threads = build_threads(roots.items, replies);
        Ok(Page {
            items: threads,
            pagination: roots.pagination,
        })
    }

    async fn record_view(&self, view: &SnippetView, deltas: &[CounterDelta]) -> Result<()> {
        if *self.fail_views.read().await {
            return Err(StorageError::Injected("view log".to_string()));
        }
        self.counters_failing().await?;
        let mut state = self.state.write().await;
        state.apply_deltas(deltas)?;
        state.views.push(view.clone());
        Ok(())
    }

    async fn count_views(&self, snippet: SnippetId) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.views.iter().filter(|v| v.snippet == snippet).count() as u64)
    }
}
