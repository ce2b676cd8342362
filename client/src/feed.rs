//! The feed: posts for the active view, the current user's vote intents,
//! and every optimistic mutation against them.
//!
//! All mutations run on one cooperative thread. An operation mutates
//! synchronously, suspends only for the confirming backend call, and on
//! failure restores the exact pre-call snapshot, so observers either see
//! the optimistic state or the state they started from, never a partial
//! application.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use shared::{sort_ranked, Post, SortOption, VoteDirection};

use crate::backend::FeedBackend;
use crate::error::StoreError;
use crate::session::Session;
use crate::vote::VoteLedger;

#[derive(Default)]
struct FeedState {
    posts: Vec<Post>,
    ledger: VoteLedger,
    saving: HashSet<Uuid>,
    sort: SortOption,
    community: Option<String>,
    is_loading: bool,
    last_error: Option<String>,
}

/// Single writer for the feed. Construct it at the composition root and
/// hand out `Rc` handles; components never mutate posts or intents
/// directly.
pub struct FeedStore {
    backend: Rc<dyn FeedBackend>,
    session: Rc<dyn Session>,
    state: RefCell<FeedState>,
}

impl FeedStore {
    pub fn new(backend: Rc<dyn FeedBackend>, session: Rc<dyn Session>) -> Self {
        Self {
            backend,
            session,
            state: RefCell::new(FeedState::default()),
        }
    }

    /// Loads the feed for `community` (or the front page), ranks it, then
    /// seeds the user's vote intents and saved flags. Load failures land
    /// in [`FeedStore::last_error`] rather than propagating; the previous
    /// posts stay on screen.
    pub async fn fetch_posts(&self, community: Option<&str>) {
        {
            let mut state = self.state.borrow_mut();
            state.is_loading = true;
            state.last_error = None;
            state.community = community.map(str::to_owned);
        }
        let sort = self.sort();

        match self.backend.fetch_posts(sort, community).await {
            Ok(mut posts) => {
                // one clock reading per ranking pass
                let now = OffsetDateTime::now_utc();
                sort_ranked(&mut posts, sort, now);

                let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
                self.set_posts(posts);
                self.state.borrow_mut().is_loading = false;

                self.load_user_votes(&ids).await;
                self.load_saved(&ids).await;
            }
            Err(err) => {
                warn!(%err, "failed to fetch posts");
                let mut state = self.state.borrow_mut();
                state.is_loading = false;
                state.last_error = Some(err.to_string());
            }
        }
    }

    /// Votes on a post, optimistically.
    ///
    /// The count and intent change before this suspends; if the backend
    /// rejects the vote they are restored to the pre-call snapshot and the
    /// failure is re-surfaced. A second vote for the same post while one
    /// is in flight is rejected with [`StoreError::InFlight`]. A
    /// confirmation that resolves after the post left the feed is
    /// discarded.
    pub async fn apply_vote(
        &self,
        post_id: Uuid,
        direction: VoteDirection,
    ) -> Result<(), StoreError> {
        if self.session.current_user().is_none() {
            return Err(StoreError::Unauthenticated);
        }

        let pending = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let post = state
                .posts
                .iter_mut()
                .find(|p| p.id == post_id)
                .ok_or(StoreError::UnknownItem(post_id))?;
            let pending = state.ledger.begin(post_id, direction, post.votes)?;
            post.votes += pending.delta;
            pending
        };

        match self.backend.persist_post_vote(post_id, pending.next).await {
            Ok(()) => {
                // local state already shows the confirmed value; no
                // refresh round-trip
                self.state.borrow_mut().ledger.commit(&pending);
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.borrow_mut();
                    let state = &mut *state;
                    if let Some(snapshot) = state.ledger.rollback(&pending) {
                        if let Some(post) =
                            state.posts.iter_mut().find(|p| p.id == post_id)
                        {
                            post.votes = snapshot.votes;
                        }
                    }
                }
                warn!(%post_id, %err, "vote rejected by backend, rolled back");
                Err(StoreError::Persistence(err))
            }
        }
    }

    /// Flips the saved flag optimistically; rolls back on rejection.
    /// Returns the new flag.
    pub async fn toggle_saved(&self, post_id: Uuid) -> Result<bool, StoreError> {
        if self.session.current_user().is_none() {
            return Err(StoreError::Unauthenticated);
        }

        let saving = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let post = state
                .posts
                .iter_mut()
                .find(|p| p.id == post_id)
                .ok_or(StoreError::UnknownItem(post_id))?;
            if !state.saving.insert(post_id) {
                return Err(StoreError::InFlight(post_id));
            }
            post.saved = !post.saved;
            post.saved
        };

        let result = if saving {
            self.backend.save_post(post_id).await
        } else {
            self.backend.unsave_post(post_id).await
        };

        let mut state = self.state.borrow_mut();
        state.saving.remove(&post_id);
        match result {
            Ok(()) => Ok(saving),
            Err(err) => {
                if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
                    post.saved = !saving;
                }
                warn!(%post_id, %err, "save toggle rejected, rolled back");
                Err(StoreError::Persistence(err))
            }
        }
    }

    /// Records the new order and refetches the current view.
    pub async fn set_sort(&self, sort: SortOption) {
        let community = {
            let mut state = self.state.borrow_mut();
            state.sort = sort;
            state.community.clone()
        };
        self.fetch_posts(community.as_deref()).await;
    }

    /// Seeds the current user's held votes for the given posts. Failures
    /// are logged and ignored; the feed works without intents.
    pub async fn load_user_votes(&self, posts: &[Uuid]) {
        if posts.is_empty() {
            return;
        }
        match self.backend.fetch_post_votes(posts).await {
            Ok(votes) => self.state.borrow_mut().ledger.seed_intents(votes),
            Err(err) => debug!(%err, "failed to load vote intents"),
        }
    }

    async fn load_saved(&self, posts: &[Uuid]) {
        if posts.is_empty() {
            return;
        }
        match self.backend.fetch_saved(posts).await {
            Ok(saved) => {
                let mut state = self.state.borrow_mut();
                for post in &mut state.posts {
                    post.saved = saved.contains(&post.id);
                }
            }
            Err(err) => debug!(%err, "failed to load saved flags"),
        }
    }

    /// Replaces the feed. Ledger and save guards are retained only for
    /// posts still present; in-flight confirmations for evicted posts can
    /// no longer touch state.
    pub fn set_posts(&self, posts: Vec<Post>) {
        let mut state = self.state.borrow_mut();
        let keep: HashSet<Uuid> = posts.iter().map(|p| p.id).collect();
        state.posts = posts;
        state.ledger.retain(|id| keep.contains(id));
        state.saving.retain(|id| keep.contains(id));
    }

    /// Prepends a post (own submission or realtime insert).
    pub fn add_post(&self, post: Post) {
        let mut state = self.state.borrow_mut();
        if state.posts.iter().any(|p| p.id == post.id) {
            return;
        }
        state.posts.insert(0, post);
    }

    /// Out-of-band correction of a post's vote count (someone else
    /// voted). Overwrites the count only; the local intent and everything
    /// else stay untouched.
    pub fn apply_external_vote_count(&self, post_id: Uuid, votes: i64) {
        let mut state = self.state.borrow_mut();
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.votes = votes;
        }
    }

    /// Out-of-band correction of a post's comment count.
    pub fn apply_external_comment_count(&self, post_id: Uuid, count: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == post_id) {
            post.comment_count = count;
        }
    }

    pub fn reset(&self) {
        *self.state.borrow_mut() = FeedState::default();
    }

    pub fn posts(&self) -> Ref<'_, [Post]> {
        Ref::map(self.state.borrow(), |s| s.posts.as_slice())
    }

    pub fn post(&self, id: &Uuid) -> Option<Post> {
        self.state.borrow().posts.iter().find(|p| p.id == *id).cloned()
    }

    /// The current user's held vote on a post; `None` means no vote.
    pub fn vote_intent(&self, id: &Uuid) -> Option<VoteDirection> {
        self.state.borrow().ledger.intent(id)
    }

    pub fn sort(&self) -> SortOption {
        self.state.borrow().sort
    }

    pub fn community(&self) -> Option<String> {
        self.state.borrow().community.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }
}
