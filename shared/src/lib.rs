pub mod error;
pub mod models;
pub mod ranking;
pub mod validation;

pub use error::{BackendError, BackendErrorKind};
pub use models::*;
pub use ranking::{
    hot_score, rising_score, sort_comment_tree, sort_ranked, Rankable, SortOption,
};
pub use validation::*;
