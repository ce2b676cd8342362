pub mod backend;
pub mod comments;
pub mod community;
pub mod error;
pub mod feed;
pub mod realtime;
pub mod session;
pub mod vote;

pub use backend::{BackendResult, CommentBackend, CommunityBackend, FeedBackend};
pub use comments::{build_comment_tree, CommentStore};
pub use community::MembershipStore;
pub use error::StoreError;
pub use feed::FeedStore;
pub use realtime::{
    watch_comment_count, watch_new_comments, watch_new_posts, watch_post_votes, Event, LocalBus,
    Realtime, Subscription, Topic,
};
pub use session::{AuthState, Session};
pub use vote::{resolve_transition, PendingVote, VoteLedger, VoteSnapshot, VoteTransition};
