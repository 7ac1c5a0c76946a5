//! Backend services: identity, profile and catalog tables, simulation
//! records and object storage.

pub mod identity;
pub mod rest;
pub mod storage;
pub mod tables;

pub use identity::{IdentityProvider, SessionCallback, SessionStore};
pub use rest::RestBackend;
pub use storage::ObjectStorage;
pub use tables::{CatalogStore, NewSimulationRecord, ProfileStore, SimulationStore};

use std::sync::Arc;

/// The set of service handles the rest of the plugin works against
pub struct Services {
    pub session: Arc<SessionStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub simulations: Arc<dyn SimulationStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Services {
    pub fn new(
        session: Arc<SessionStore>,
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogStore>,
        simulations: Arc<dyn SimulationStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            session,
            profiles,
            catalog,
            simulations,
            storage,
        }
    }

    /// Wire every service to one REST backend
    pub fn from_rest(backend: Arc<RestBackend>) -> Self {
        Self {
            session: SessionStore::new(backend.clone()),
            profiles: backend.clone(),
            catalog: backend.clone(),
            simulations: backend.clone(),
            storage: backend,
        }
    }
}
