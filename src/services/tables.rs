use crate::errors::ServiceError;
use crate::types::{Procedure, ProfileUpdate, SavedSimulation, ShadeSwatch, UserProfile};
use async_trait::async_trait;

/// Professional profile rows, keyed by the account's user id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` means the account exists but has no profile row yet
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ServiceError>;

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<UserProfile, ServiceError>;
}

/// Read-only access to the procedure and shade catalogs
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn fetch_procedures(&self) -> Result<Vec<Procedure>, ServiceError>;

    async fn fetch_shades(&self) -> Result<Vec<ShadeSwatch>, ServiceError>;
}

/// Row to insert for a completed simulation
#[derive(Debug, Clone)]
pub struct NewSimulationRecord {
    pub user_id: String,
    pub procedure_id: Option<String>,
    pub patient_name: String,
    pub original_image_url: String,
    pub simulated_image_url: String,
}

#[async_trait]
pub trait SimulationStore: Send + Sync {
    async fn insert(&self, record: &NewSimulationRecord) -> Result<SavedSimulation, ServiceError>;

    /// All of one user's saved simulations, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SavedSimulation>, ServiceError>;

    /// Delete a row owned by `user_id`. Deleting a row that is not
    /// theirs (or does not exist) is an error.
    async fn delete(&self, id: &str, user_id: &str) -> Result<(), ServiceError>;
}
