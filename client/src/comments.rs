//! The discussion under one post: a materialized comment tree plus the
//! same optimistic vote discipline as the feed, applied at any depth.

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared::{sort_comment_tree, Comment, VoteDirection};

use crate::backend::CommentBackend;
use crate::error::StoreError;
use crate::session::Session;
use crate::vote::VoteLedger;

/// Assembles a flat listing into a thread. Replies whose parent is not in
/// the listing surface as roots instead of disappearing. Every level ends
/// up best-voted first, oldest first on ties.
pub fn build_comment_tree(flat: Vec<Comment>) -> Vec<Comment> {
    let ids: HashSet<Uuid> = flat.iter().map(|c| c.id).collect();
    let mut children: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    let mut roots: Vec<Comment> = Vec::new();

    for mut comment in flat {
        comment.replies.clear();
        match comment.parent_id {
            Some(parent) if ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            }
            _ => roots.push(comment),
        }
    }

    fn attach(node: &mut Comment, children: &mut HashMap<Uuid, Vec<Comment>>) {
        if let Some(mut replies) = children.remove(&node.id) {
            for reply in &mut replies {
                attach(reply, children);
            }
            node.replies = replies;
        }
    }
    for root in &mut roots {
        attach(root, &mut children);
    }

    sort_comment_tree(&mut roots);
    roots
}

fn find_comment<'a>(comments: &'a [Comment], id: &Uuid) -> Option<&'a Comment> {
    for comment in comments {
        if comment.id == *id {
            return Some(comment);
        }
        if let Some(found) = find_comment(&comment.replies, id) {
            return Some(found);
        }
    }
    None
}

fn find_comment_mut<'a>(comments: &'a mut [Comment], id: &Uuid) -> Option<&'a mut Comment> {
    for comment in comments {
        if comment.id == *id {
            return Some(comment);
        }
        if let Some(found) = find_comment_mut(&mut comment.replies, id) {
            return Some(found);
        }
    }
    None
}

fn collect_ids(comments: &[Comment], into: &mut Vec<Uuid>) {
    for comment in comments {
        into.push(comment.id);
        collect_ids(&comment.replies, into);
    }
}

#[derive(Default)]
struct CommentState {
    post_id: Option<Uuid>,
    comments: Vec<Comment>,
    ledger: VoteLedger,
    is_loading: bool,
    last_error: Option<String>,
}

pub struct CommentStore {
    backend: Rc<dyn CommentBackend>,
    session: Rc<dyn Session>,
    state: RefCell<CommentState>,
}

impl CommentStore {
    pub fn new(backend: Rc<dyn CommentBackend>, session: Rc<dyn Session>) -> Self {
        Self {
            backend,
            session,
            state: RefCell::new(CommentState::default()),
        }
    }

    /// Loads and threads the discussion for one post, then seeds the
    /// user's vote intents for every comment in the tree.
    pub async fn fetch_comments(&self, post_id: Uuid) {
        {
            let mut state = self.state.borrow_mut();
            state.is_loading = true;
            state.last_error = None;
            state.post_id = Some(post_id);
        }

        match self.backend.fetch_comments(post_id).await {
            Ok(flat) => {
                let tree = build_comment_tree(flat);
                let mut ids = Vec::new();
                collect_ids(&tree, &mut ids);
                {
                    let mut state = self.state.borrow_mut();
                    state.comments = tree;
                    state.is_loading = false;
                    let keep: HashSet<Uuid> = ids.iter().copied().collect();
                    state.ledger.retain(|id| keep.contains(id));
                }
                self.load_user_votes(&ids).await;
            }
            Err(err) => {
                warn!(%post_id, %err, "failed to fetch comments");
                let mut state = self.state.borrow_mut();
                state.is_loading = false;
                state.last_error = Some(err.to_string());
            }
        }
    }

    /// Votes on a comment at any depth. Same contract as the feed store:
    /// optimistic mutation, exact-snapshot rollback on rejection, one
    /// flight per comment, stale confirmations discarded.
    pub async fn apply_vote(
        &self,
        comment_id: Uuid,
        direction: VoteDirection,
    ) -> Result<(), StoreError> {
        if self.session.current_user().is_none() {
            return Err(StoreError::Unauthenticated);
        }

        let pending = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let comment = find_comment_mut(&mut state.comments, &comment_id)
                .ok_or(StoreError::UnknownItem(comment_id))?;
            let pending = state.ledger.begin(comment_id, direction, comment.votes)?;
            comment.votes += pending.delta;
            pending
        };

        match self
            .backend
            .persist_comment_vote(comment_id, pending.next)
            .await
        {
            Ok(()) => {
                self.state.borrow_mut().ledger.commit(&pending);
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.borrow_mut();
                    let state = &mut *state;
                    if let Some(snapshot) = state.ledger.rollback(&pending) {
                        if let Some(comment) =
                            find_comment_mut(&mut state.comments, &comment_id)
                        {
                            comment.votes = snapshot.votes;
                        }
                    }
                }
                warn!(%comment_id, %err, "comment vote rejected, rolled back");
                Err(StoreError::Persistence(err))
            }
        }
    }

    /// Seeds held votes for the given comments; failures are logged and
    /// ignored.
    pub async fn load_user_votes(&self, comments: &[Uuid]) {
        if comments.is_empty() {
            return;
        }
        match self.backend.fetch_comment_votes(comments).await {
            Ok(votes) => self.state.borrow_mut().ledger.seed_intents(votes),
            Err(err) => debug!(%err, "failed to load comment vote intents"),
        }
    }

    /// Inserts a comment: under its parent when the parent is in the
    /// tree, otherwise at the top. Already-present ids (realtime echo of
    /// an own submission) are ignored.
    pub fn add_comment(&self, comment: Comment) {
        let mut state = self.state.borrow_mut();
        if find_comment(&state.comments, &comment.id).is_some() {
            return;
        }
        if let Some(parent_id) = comment.parent_id {
            if let Some(parent) = find_comment_mut(&mut state.comments, &parent_id) {
                parent.replies.push(comment);
                return;
            }
        }
        state.comments.insert(0, comment);
    }

    /// Realtime insert; comments for other posts are dropped.
    pub fn apply_external_comment(&self, comment: Comment) {
        if self.state.borrow().post_id != Some(comment.post_id) {
            return;
        }
        self.add_comment(comment);
    }

    pub fn reset(&self) {
        *self.state.borrow_mut() = CommentState::default();
    }

    pub fn comments(&self) -> Ref<'_, [Comment]> {
        Ref::map(self.state.borrow(), |s| s.comments.as_slice())
    }

    pub fn comment(&self, id: &Uuid) -> Option<Comment> {
        find_comment(&self.state.borrow().comments, id).cloned()
    }

    pub fn vote_intent(&self, id: &Uuid) -> Option<VoteDirection> {
        self.state.borrow().ledger.intent(id)
    }

    pub fn post_id(&self) -> Option<Uuid> {
        self.state.borrow().post_id
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }
}
