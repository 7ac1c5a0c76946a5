use crate::errors::ServiceError;
use crate::services::CatalogStore;
use crate::types::{Procedure, ShadeSwatch};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Load-once cache for the procedure and shade catalogs.
///
/// The first reader triggers the fetch; later readers get the cached
/// rows until [`reset`](Self::reset). A failed fetch caches nothing, so
/// the next reader simply tries again. Loading never waits on session
/// state.
pub struct CatalogCache {
    store: Arc<dyn CatalogStore>,
    procedures: RwLock<Option<Vec<Procedure>>>,
    shades: RwLock<Option<Vec<ShadeSwatch>>>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            procedures: RwLock::new(None),
            shades: RwLock::new(None),
        }
    }

    /// Active procedures ordered by display name
    pub async fn procedures(&self) -> Result<Vec<Procedure>, ServiceError> {
        if let Some(cached) = self.procedures.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.procedures.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }

        let mut rows = self.store.fetch_procedures().await?;
        rows.retain(|p| p.active);
        rows.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        log::info!("Loaded {} active procedures", rows.len());
        *slot = Some(rows.clone());
        Ok(rows)
    }

    /// Active shade swatches ordered by display name
    pub async fn shades(&self) -> Result<Vec<ShadeSwatch>, ServiceError> {
        if let Some(cached) = self.shades.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.shades.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }

        let mut rows = self.store.fetch_shades().await?;
        rows.retain(|s| s.active);
        rows.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        log::info!("Loaded {} active shade swatches", rows.len());
        *slot = Some(rows.clone());
        Ok(rows)
    }

    /// Drop both caches so the next read refetches
    pub async fn reset(&self) {
        *self.procedures.write().await = None;
        *self.shades.write().await = None;
        log::debug!("Catalog cache cleared");
    }
}
