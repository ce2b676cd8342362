use std::cell::Cell;

use uuid::Uuid;

/// Who is acting. Authentication itself (tokens, refresh, providers) is
/// the backend service's concern; the stores only ask this seam whether a
/// user is present before mutating anything.
pub trait Session {
    fn current_user(&self) -> Option<Uuid>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Plain signed-in/signed-out holder for hosts and tests.
#[derive(Debug, Default)]
pub struct AuthState {
    user: Cell<Option<Uuid>>,
}

impl AuthState {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(user: Uuid) -> Self {
        Self {
            user: Cell::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: Uuid) {
        self.user.set(Some(user));
    }

    pub fn sign_out(&self) {
        self.user.set(None);
    }
}

impl Session for AuthState {
    fn current_user(&self) -> Option<Uuid> {
        self.user.get()
    }
}
