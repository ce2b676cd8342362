use std::cmp::Reverse;

use serde::{Serialize, Deserialize};
use time::{Duration, OffsetDateTime};

use crate::models::{Comment, Post};

/// Hours added to an item's age before decay, so brand-new items cannot
/// divide by a near-zero denominator or dwarf everything else on one vote.
pub const HOT_AGE_OFFSET_HOURS: f64 = 2.0;

/// Decay exponent. Older items lose influence super-linearly.
pub const HOT_GRAVITY: f64 = 1.5;

/// Items younger than this rank as if they were exactly this old. Unclamped
/// millisecond ages made rising scores explode for second-old items.
pub const RISING_AGE_FLOOR: Duration = Duration::milliseconds(1_000);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    #[default]
    Hot,
    New,
    Top,
    Rising,
}

/// Anything that can be ordered by the feed: posts and comments both carry
/// a vote count and a creation instant, which is all the engine reads.
pub trait Rankable {
    fn votes(&self) -> i64;
    fn created_at(&self) -> OffsetDateTime;

    fn age(&self, now: OffsetDateTime) -> Duration {
        now - self.created_at()
    }
}

impl Rankable for Post {
    fn votes(&self) -> i64 {
        self.votes
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl Rankable for Comment {
    fn votes(&self) -> i64 {
        self.votes
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

/// `votes / (age_hours + 2)^1.5`. Ages below zero (clock skew, items
/// stamped in the future) are treated as zero so the denominator stays
/// positive and the score stays a number.
pub fn hot_score(votes: i64, age: Duration) -> f64 {
    let age_hours = (age.as_seconds_f64() / 3600.0).max(0.0);
    votes as f64 / (age_hours + HOT_AGE_OFFSET_HOURS).powf(HOT_GRAVITY)
}

/// Votes per millisecond of age, floored at [`RISING_AGE_FLOOR`].
pub fn rising_score(votes: i64, age: Duration) -> f64 {
    let age = age.max(RISING_AGE_FLOOR);
    votes as f64 / age.whole_milliseconds() as f64
}

/// Orders items in place for display. Stable under every strategy: items
/// that compare equal keep their input order. `now` is captured once by
/// the caller so one invocation sees one clock reading.
pub fn sort_ranked<T: Rankable>(items: &mut [T], sort: SortOption, now: OffsetDateTime) {
    match sort {
        SortOption::New => items.sort_by_key(|item| Reverse(item.created_at())),
        SortOption::Top => items.sort_by_key(|item| Reverse(item.votes())),
        SortOption::Hot => sort_by_score(items, |item| hot_score(item.votes(), item.age(now))),
        SortOption::Rising => {
            sort_by_score(items, |item| rising_score(item.votes(), item.age(now)))
        }
    }
}

/// Thread ordering: best-voted replies first, oldest first on equal votes,
/// applied at every depth.
pub fn sort_comment_tree(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    for comment in comments {
        sort_comment_tree(&mut comment.replies);
    }
}

fn sort_by_score<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by_cached_key(|item| Reverse(TotalF64(score(item))));
}

/// Total order over f64 so scores can be sort keys; scores here are never
/// NaN, but `total_cmp` keeps the ordering defined even if one slips in.
#[derive(PartialEq)]
struct TotalF64(f64);

impl Eq for TotalF64 {}

impl PartialOrd for TotalF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
