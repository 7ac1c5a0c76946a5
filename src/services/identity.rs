use crate::errors::ServiceError;
use crate::types::SessionInfo;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Callback invoked whenever the signed-in session changes.
/// `None` means signed out.
pub type SessionCallback = Box<dyn Fn(Option<SessionInfo>) + Send + Sync>;

/// Authentication backend. Implementations own token storage and
/// refresh; callers only ever see [`SessionInfo`] snapshots.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<SessionInfo>, ServiceError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionInfo, ServiceError>;

    /// Register a new account. Returns a session when the backend signs
    /// the user in immediately, `None` when confirmation is pending.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        phone: &str,
    ) -> Result<Option<SessionInfo>, ServiceError>;

    async fn request_password_reset(&self, email: &str) -> Result<(), ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    /// Register a listener for session changes. Listeners live for the
    /// provider's lifetime.
    fn subscribe(&self, callback: SessionCallback);
}

/// Holds the current session and keeps it in sync with the provider.
///
/// The store mirrors the provider's session state behind a cheap lock
/// so synchronous callers can ask "who is signed in" without awaiting.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    current: RwLock<Option<SessionInfo>>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            current: RwLock::new(None),
        })
    }

    /// Prime the mirror from the provider and subscribe to changes.
    /// Call once after construction.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), ServiceError> {
        let session = self.provider.current_session().await?;
        *self.current.write().expect("lock poisoned") = session;

        let store = Arc::downgrade(self);
        self.provider.subscribe(Box::new(move |session| {
            if let Some(store) = store.upgrade() {
                *store.current.write().expect("lock poisoned") = session;
            }
        }));
        Ok(())
    }

    /// Snapshot of the signed-in session, if any
    pub fn session(&self) -> Option<SessionInfo> {
        self.current.read().expect("lock poisoned").clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.read().expect("lock poisoned").is_some()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionInfo, ServiceError> {
        let session = self.provider.sign_in(email, password).await?;
        *self.current.write().expect("lock poisoned") = Some(session.clone());
        log::info!("User {} signed in", session.user_id);
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        phone: &str,
    ) -> Result<Option<SessionInfo>, ServiceError> {
        let session = self
            .provider
            .sign_up(email, password, display_name, phone)
            .await?;
        if let Some(session) = &session {
            *self.current.write().expect("lock poisoned") = Some(session.clone());
        }
        Ok(session)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        self.provider.request_password_reset(email).await
    }

    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        self.provider.sign_out().await?;
        *self.current.write().expect("lock poisoned") = None;
        log::info!("User signed out");
        Ok(())
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }
}
