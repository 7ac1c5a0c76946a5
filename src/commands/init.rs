use crate::catalog::CatalogCache;
use crate::gate::ProfileGate;
use crate::records::SimulationRecords;
use crate::services::{RestBackend, Services};
use std::sync::{Arc, RwLock};
use tauri::command;

/// Long-lived plugin state: the service stack plus the domain layers
/// built on it. Constructed once by `initialize_plugin`.
pub struct PluginRuntime {
    pub services: Services,
    pub gate: ProfileGate,
    pub catalog: CatalogCache,
    pub records: SimulationRecords,
}

impl PluginRuntime {
    /// Assemble a runtime from an already-wired service stack
    pub fn from_services(services: Services, simulation_bucket: impl Into<String>) -> Self {
        let gate = ProfileGate::new(services.session.clone(), services.profiles.clone());
        let catalog = CatalogCache::new(services.catalog.clone());
        let records = SimulationRecords::new(
            services.simulations.clone(),
            services.storage.clone(),
            simulation_bucket,
        );
        Self {
            services,
            gate,
            catalog,
            records,
        }
    }
}

lazy_static::lazy_static! {
    static ref RUNTIME: RwLock<Option<Arc<PluginRuntime>>> = RwLock::new(None);
}

/// Swap in a runtime. Tests use this to install fake-backed runtimes.
pub fn install_runtime(runtime: Arc<PluginRuntime>) {
    let mut slot = RUNTIME.write().expect("lock poisoned");
    *slot = Some(runtime);
}

/// Handle to the installed runtime
pub(crate) fn runtime() -> Result<Arc<PluginRuntime>, String> {
    let slot = RUNTIME.read().map_err(|e| e.to_string())?;
    slot.clone()
        .ok_or_else(|| "Plugin is not initialized; call initialize_plugin first".to_string())
}

/// Initialize the plugin: build the REST backend from configuration,
/// prime the session mirror and install the runtime
#[command]
pub async fn initialize_plugin() -> Result<String, String> {
    let config = super::config::current_config()?;

    let backend = match RestBackend::new(&config.backend) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("Failed to build REST backend: {}", e);
            return Err(format!("Failed to build REST backend: {}", e));
        }
    };

    let services = Services::from_rest(backend);
    if let Err(e) = services.session.initialize().await {
        // Startup proceeds signed out; the user can still authenticate
        log::warn!("Could not restore a session at startup: {}", e);
    }

    let runtime = PluginRuntime::from_services(services, config.backend.simulation_bucket.clone());
    install_runtime(Arc::new(runtime));

    let message = format!(
        "Smile simulation plugin initialized against {}",
        config.backend.base_url.as_deref().unwrap_or("(unset)")
    );
    log::info!("{}", message);
    Ok(message)
}

/// Get plugin version and build information
#[command]
pub async fn get_plugin_info() -> Result<PluginInfo, String> {
    Ok(PluginInfo {
        name: crate::NAME.to_string(),
        version: crate::VERSION.to_string(),
        description: crate::DESCRIPTION.to_string(),
        initialized: RUNTIME
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false),
    })
}

/// Plugin metadata response
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub initialized: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plugin_info_reports_crate_metadata() {
        let info = get_plugin_info().await.unwrap();
        assert_eq!(info.name, "smilesim");
        assert!(!info.version.is_empty());
    }
}
