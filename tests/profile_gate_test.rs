//! Tests for the profile-based access gate, run against in-memory
//! identity and profile doubles.

#[cfg(test)]
mod profile_gate_tests {
    use smilesim::gate::ProfileGate;
    use smilesim::services::{IdentityProvider, SessionStore};
    use smilesim::testing::{InMemoryIdentity, InMemoryProfiles};
    use smilesim::types::{GateState, SessionInfo, UserProfile};
    use std::sync::Arc;

    fn profile(user_id: &str, active: bool) -> UserProfile {
        UserProfile {
            id: user_id.to_string(),
            display_name: "Dr. Souza".to_string(),
            phone: None,
            company: None,
            tax_id: None,
            logo_url: None,
            active,
        }
    }

    async fn signed_in_store(user_id: &str) -> (Arc<SessionStore>, Arc<InMemoryIdentity>) {
        let identity = Arc::new(InMemoryIdentity::with_session(SessionInfo::new(
            user_id.to_string(),
            "token".to_string(),
        )));
        let store = SessionStore::new(identity.clone() as Arc<dyn IdentityProvider>);
        store.initialize().await.unwrap();
        (store, identity)
    }

    #[tokio::test]
    async fn test_blocked_without_a_session() {
        let identity = Arc::new(InMemoryIdentity::new());
        let store = SessionStore::new(identity as Arc<dyn IdentityProvider>);
        store.initialize().await.unwrap();
        let gate = ProfileGate::new(store, Arc::new(InMemoryProfiles::new()));

        assert_eq!(gate.evaluate().await, GateState::Blocked);
    }

    #[tokio::test]
    async fn test_granted_with_an_active_profile() {
        let (store, _identity) = signed_in_store("user-1").await;
        let profiles = Arc::new(InMemoryProfiles::new());
        profiles.insert_profile(profile("user-1", true));
        let gate = ProfileGate::new(store, profiles);

        assert_eq!(gate.evaluate().await, GateState::Granted);
    }

    #[tokio::test]
    async fn test_pending_with_an_inactive_profile() {
        let (store, _identity) = signed_in_store("user-1").await;
        let profiles = Arc::new(InMemoryProfiles::new());
        profiles.insert_profile(profile("user-1", false));
        let gate = ProfileGate::new(store, profiles);

        assert_eq!(gate.evaluate().await, GateState::PendingApproval);
    }

    #[tokio::test]
    async fn test_pending_with_a_missing_profile_row() {
        let (store, _identity) = signed_in_store("user-1").await;
        let gate = ProfileGate::new(store, Arc::new(InMemoryProfiles::new()));

        assert_eq!(gate.evaluate().await, GateState::PendingApproval);
    }

    #[tokio::test]
    async fn test_pending_when_the_profile_cannot_be_read() {
        let (store, _identity) = signed_in_store("user-1").await;
        let gate = ProfileGate::new(store, Arc::new(InMemoryProfiles::failing()));

        // An unreadable profile must not let the user through
        assert_eq!(gate.evaluate().await, GateState::PendingApproval);
    }

    #[tokio::test]
    async fn test_state_does_not_refetch() {
        let (store, _identity) = signed_in_store("user-1").await;
        let profiles = Arc::new(InMemoryProfiles::new());
        profiles.insert_profile(profile("user-1", true));
        let gate = ProfileGate::new(store, profiles.clone());

        assert_eq!(gate.state().await, GateState::Loading);
        assert_eq!(profiles.fetch_count(), 0);

        gate.evaluate().await;
        assert_eq!(profiles.fetch_count(), 1);

        assert_eq!(gate.state().await, GateState::Granted);
        assert_eq!(gate.state().await, GateState::Granted);
        assert_eq!(profiles.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_signs_out_exactly_once() {
        let (store, identity) = signed_in_store("user-1").await;
        let gate = ProfileGate::new(store.clone(), Arc::new(InMemoryProfiles::new()));

        assert_eq!(gate.evaluate().await, GateState::PendingApproval);

        assert_eq!(gate.dismiss_pending().await.unwrap(), GateState::Blocked);
        assert_eq!(identity.sign_out_calls(), 1);
        assert!(store.session().is_none());

        // Repeat dismissals change nothing
        assert_eq!(gate.dismiss_pending().await.unwrap(), GateState::Blocked);
        assert_eq!(identity.sign_out_calls(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_is_a_noop_outside_pending() {
        let (store, identity) = signed_in_store("user-1").await;
        let profiles = Arc::new(InMemoryProfiles::new());
        profiles.insert_profile(profile("user-1", true));
        let gate = ProfileGate::new(store.clone(), profiles);

        assert_eq!(gate.evaluate().await, GateState::Granted);
        assert_eq!(gate.dismiss_pending().await.unwrap(), GateState::Granted);
        assert_eq!(identity.sign_out_calls(), 0);
        assert!(store.session().is_some());
    }

    #[tokio::test]
    async fn test_explicit_sign_out_blocks_from_any_state() {
        let (store, identity) = signed_in_store("user-1").await;
        let profiles = Arc::new(InMemoryProfiles::new());
        profiles.insert_profile(profile("user-1", true));
        let gate = ProfileGate::new(store.clone(), profiles);

        assert_eq!(gate.evaluate().await, GateState::Granted);
        gate.sign_out().await.unwrap();

        assert_eq!(gate.state().await, GateState::Blocked);
        assert_eq!(identity.sign_out_calls(), 1);
        assert!(store.session().is_none());

        // Re-evaluating after sign-out stays blocked
        assert_eq!(gate.evaluate().await, GateState::Blocked);
    }
}
