//! Push-style corrections from elsewhere: other sessions voting,
//! commenting, posting. The stores never see a transport, only this
//! subscribe/unsubscribe capability; the watch helpers hold weak store
//! handles so a torn-down view silently detaches instead of mutating
//! dead state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use shared::{Comment, Post};

use crate::comments::CommentStore;
use crate::feed::FeedStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Vote-count changes for one post.
    PostVotes(Uuid),
    /// New posts, optionally scoped to a community.
    NewPosts { community: Option<Uuid> },
    /// New comments under one post.
    NewComments(Uuid),
    /// Comment-count changes for one post.
    CommentCount(Uuid),
}

#[derive(Debug, Clone)]
pub enum Event {
    VoteCount { post: Uuid, votes: i64 },
    NewPost(Box<Post>),
    NewComment(Box<Comment>),
    CommentCount { post: Uuid, count: u32 },
}

/// Active subscription; dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// The capability the host wires to its transport. Handlers fire on the
/// store thread; a handler only ever sees events for its topic.
pub trait Realtime {
    fn subscribe(&self, topic: Topic, handler: Box<dyn Fn(&Event)>) -> Subscription;
}

type HandlerEntry = (u64, Rc<dyn Fn(&Event)>);

#[derive(Default)]
struct BusState {
    handlers: HashMap<Topic, Vec<HandlerEntry>>,
    next_id: u64,
}

/// In-process [`Realtime`] for tests and embedded hosts.
#[derive(Default)]
pub struct LocalBus {
    state: Rc<RefCell<BusState>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, topic: &Topic, event: &Event) {
        // snapshot first so handlers may subscribe or unsubscribe
        // reentrantly
        let handlers: Vec<Rc<dyn Fn(&Event)>> = self
            .state
            .borrow()
            .handlers
            .get(topic)
            .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(event);
        }
    }
}

impl Realtime for LocalBus {
    fn subscribe(&self, topic: Topic, handler: Box<dyn Fn(&Event)>) -> Subscription {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state
                .handlers
                .entry(topic.clone())
                .or_default()
                .push((id, Rc::from(handler)));
            id
        };

        let state = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                let mut state = state.borrow_mut();
                if let Some(entries) = state.handlers.get_mut(&topic) {
                    entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }
        })
    }
}

/// Keeps one post's vote count in step with other sessions. Only the
/// count baseline is overwritten; the local vote intent is never touched.
pub fn watch_post_votes(
    store: &Rc<FeedStore>,
    realtime: &dyn Realtime,
    post_id: Uuid,
) -> Subscription {
    let store = Rc::downgrade(store);
    realtime.subscribe(
        Topic::PostVotes(post_id),
        forward(store, |store, event| {
            if let Event::VoteCount { post, votes } = event {
                store.apply_external_vote_count(*post, *votes);
            }
        }),
    )
}

/// Prepends posts created elsewhere to the feed.
pub fn watch_new_posts(
    store: &Rc<FeedStore>,
    realtime: &dyn Realtime,
    community: Option<Uuid>,
) -> Subscription {
    let store = Rc::downgrade(store);
    realtime.subscribe(
        Topic::NewPosts { community },
        forward(store, |store, event| {
            if let Event::NewPost(post) = event {
                store.add_post(post.as_ref().clone());
            }
        }),
    )
}

/// Inserts comments posted elsewhere into the active discussion.
pub fn watch_new_comments(
    store: &Rc<CommentStore>,
    realtime: &dyn Realtime,
    post_id: Uuid,
) -> Subscription {
    let store = Rc::downgrade(store);
    realtime.subscribe(
        Topic::NewComments(post_id),
        forward(store, |store, event| {
            if let Event::NewComment(comment) = event {
                store.apply_external_comment(comment.as_ref().clone());
            }
        }),
    )
}

/// Keeps one post's comment count in step with other sessions.
pub fn watch_comment_count(
    store: &Rc<FeedStore>,
    realtime: &dyn Realtime,
    post_id: Uuid,
) -> Subscription {
    let store = Rc::downgrade(store);
    realtime.subscribe(
        Topic::CommentCount(post_id),
        forward(store, |store, event| {
            if let Event::CommentCount { post, count } = event {
                store.apply_external_comment_count(*post, *count);
            }
        }),
    )
}

fn forward<S: 'static>(
    store: Weak<S>,
    apply: impl Fn(&S, &Event) + 'static,
) -> Box<dyn Fn(&Event)> {
    Box::new(move |event| {
        if let Some(store) = store.upgrade() {
            apply(&store, event);
        }
    })
}
