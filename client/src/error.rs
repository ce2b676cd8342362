use thiserror::Error;
use uuid::Uuid;

use shared::BackendError;

/// Per-operation failures surfaced by the stores. None are fatal: the
/// first three are detected before any state changes, and a persistence
/// failure has already been undone by rollback when the caller sees it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("unknown item {0}")]
    UnknownItem(Uuid),
    #[error("an update for {0} is still in flight")]
    InFlight(Uuid),
    #[error(transparent)]
    Persistence(#[from] BackendError),
}
