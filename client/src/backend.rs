//! What the backend service looks like from here. Transport, persistence
//! and auth live on the other side of these traits; the stores only see
//! the call shapes and an opaque [`BackendError`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use shared::{BackendError, Comment, NewComment, NewPost, Post, SortOption, VoteDirection};

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait(?Send)]
pub trait FeedBackend {
    /// Initial load. The returned order is advisory; the store re-ranks
    /// locally with the shared engine.
    async fn fetch_posts(
        &self,
        sort: SortOption,
        community: Option<&str>,
    ) -> BackendResult<Vec<Post>>;

    async fn create_post(&self, post: NewPost) -> BackendResult<Post>;

    /// Upserts the current user's vote; `None` retracts it.
    async fn persist_post_vote(
        &self,
        post: Uuid,
        direction: Option<VoteDirection>,
    ) -> BackendResult<()>;

    /// The current user's held votes for the given posts. Posts without a
    /// vote are simply absent from the map.
    async fn fetch_post_votes(
        &self,
        posts: &[Uuid],
    ) -> BackendResult<HashMap<Uuid, VoteDirection>>;

    /// Which of the given posts the current user has saved.
    async fn fetch_saved(&self, posts: &[Uuid]) -> BackendResult<HashSet<Uuid>>;

    async fn save_post(&self, post: Uuid) -> BackendResult<()>;

    async fn unsave_post(&self, post: Uuid) -> BackendResult<()>;
}

#[async_trait(?Send)]
pub trait CommentBackend {
    /// Flat listing for a post; the store assembles the thread.
    async fn fetch_comments(&self, post: Uuid) -> BackendResult<Vec<Comment>>;

    async fn create_comment(&self, comment: NewComment) -> BackendResult<Comment>;

    async fn persist_comment_vote(
        &self,
        comment: Uuid,
        direction: Option<VoteDirection>,
    ) -> BackendResult<()>;

    async fn fetch_comment_votes(
        &self,
        comments: &[Uuid],
    ) -> BackendResult<HashMap<Uuid, VoteDirection>>;
}

#[async_trait(?Send)]
pub trait CommunityBackend {
    async fn join(&self, community: Uuid) -> BackendResult<()>;

    async fn leave(&self, community: Uuid) -> BackendResult<()>;
}
