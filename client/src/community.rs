//! Community membership: the join/leave toggle, optimistic like voting
//! but over a simple set.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::warn;
use uuid::Uuid;

use crate::backend::CommunityBackend;
use crate::error::StoreError;
use crate::session::Session;

#[derive(Default)]
struct MembershipState {
    joined: HashSet<Uuid>,
    working: HashSet<Uuid>,
}

pub struct MembershipStore {
    backend: Rc<dyn CommunityBackend>,
    session: Rc<dyn Session>,
    state: RefCell<MembershipState>,
}

impl MembershipStore {
    pub fn new(backend: Rc<dyn CommunityBackend>, session: Rc<dyn Session>) -> Self {
        Self {
            backend,
            session,
            state: RefCell::new(MembershipState::default()),
        }
    }

    /// Server truth after a profile load.
    pub fn seed(&self, joined: impl IntoIterator<Item = Uuid>) {
        self.state.borrow_mut().joined = joined.into_iter().collect();
    }

    pub fn is_member(&self, community: &Uuid) -> bool {
        self.state.borrow().joined.contains(community)
    }

    /// Joins when not a member, leaves when one; the flag flips before
    /// the backend call and flips back if it fails. Returns the new
    /// membership.
    pub async fn toggle(&self, community: Uuid) -> Result<bool, StoreError> {
        if self.session.current_user().is_none() {
            return Err(StoreError::Unauthenticated);
        }

        let joining = {
            let mut state = self.state.borrow_mut();
            if !state.working.insert(community) {
                return Err(StoreError::InFlight(community));
            }
            if state.joined.insert(community) {
                true
            } else {
                state.joined.remove(&community);
                false
            }
        };

        let result = if joining {
            self.backend.join(community).await
        } else {
            self.backend.leave(community).await
        };

        let mut state = self.state.borrow_mut();
        state.working.remove(&community);
        match result {
            Ok(()) => Ok(joining),
            Err(err) => {
                if joining {
                    state.joined.remove(&community);
                } else {
                    state.joined.insert(community);
                }
                warn!(%community, %err, "membership change rejected, rolled back");
                Err(StoreError::Persistence(err))
            }
        }
    }
}
