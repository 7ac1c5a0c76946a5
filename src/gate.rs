use crate::errors::ServiceError;
use crate::services::{ProfileStore, SessionStore};
use crate::types::GateState;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Access gate combining session and profile state.
///
/// Starts in `Loading` and settles via [`evaluate`](Self::evaluate):
/// no session means `Blocked`, a session with an active profile means
/// `Granted`, anything else means `PendingApproval`.
pub struct ProfileGate {
    session: Arc<SessionStore>,
    profiles: Arc<dyn ProfileStore>,
    state: Mutex<GateState>,
}

impl ProfileGate {
    pub fn new(session: Arc<SessionStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            session,
            profiles,
            state: Mutex::new(GateState::Loading),
        }
    }

    /// Re-derive the gate state from the current session and profile.
    ///
    /// A profile that cannot be read is treated the same as a missing
    /// one; the user stays pending instead of being let through.
    pub async fn evaluate(&self) -> GateState {
        let mut state = self.state.lock().await;

        let session = match self.session.session() {
            Some(session) => session,
            None => {
                *state = GateState::Blocked;
                return *state;
            }
        };

        let next = match self.profiles.fetch_profile(&session.user_id).await {
            Ok(Some(profile)) if profile.active => GateState::Granted,
            Ok(_) => GateState::PendingApproval,
            Err(e) => {
                log::warn!("Profile lookup failed for {}: {}", session.user_id, e);
                GateState::PendingApproval
            }
        };
        log::debug!("Access gate for {} is {}", session.user_id, next);
        *state = next;
        next
    }

    pub async fn state(&self) -> GateState {
        *self.state.lock().await
    }

    /// Acknowledge the pending-approval notice.
    ///
    /// Signs the user out on the transition out of `PendingApproval`;
    /// repeat calls and calls in any other state change nothing.
    pub async fn dismiss_pending(&self) -> Result<GateState, ServiceError> {
        let mut state = self.state.lock().await;
        if *state != GateState::PendingApproval {
            return Ok(*state);
        }
        self.session.sign_out().await?;
        *state = GateState::Blocked;
        Ok(*state)
    }

    /// Explicit sign-out, from any state
    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        self.session.sign_out().await?;
        *state = GateState::Blocked;
        Ok(())
    }
}
