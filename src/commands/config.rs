use crate::config::SmileSimConfig;
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<SmileSimConfig>> = Arc::new(RwLock::new(SmileSimConfig::load_or_default()));
}

/// Snapshot of the active configuration for other command modules
pub(crate) fn current_config() -> Result<SmileSimConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Get the current configuration
#[command]
pub async fn get_config() -> Result<SmileSimConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Update configuration
#[command]
pub async fn update_config(new_config: SmileSimConfig) -> Result<(), String> {
    // Validate first
    new_config.validate().map_err(|e| e.to_string())?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = new_config.clone();
    }

    // Save to file
    new_config.save_to_file(SmileSimConfig::default_path())?;

    Ok(())
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config() -> Result<SmileSimConfig, String> {
    let default_config = SmileSimConfig::default();

    {
        let mut config = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *config = default_config.clone();
    }

    // Save defaults to file
    default_config.save_to_file(SmileSimConfig::default_path())?;

    Ok(default_config)
}

/// Get capture configuration
#[command]
pub async fn get_capture_config() -> Result<crate::config::CaptureConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.capture.clone())
}

/// Get pipeline configuration
#[command]
pub async fn get_pipeline_config() -> Result<crate::config::PipelineConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.pipeline.clone())
}

/// Get backend configuration
#[command]
pub async fn get_backend_config() -> Result<crate::config::BackendConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.backend.clone())
}

/// Update capture configuration. A rejected section never replaces the
/// active one.
#[command]
pub async fn update_capture_config(
    capture_config: crate::config::CaptureConfig,
) -> Result<(), String> {
    let mut updated = current_config()?;
    updated.capture = capture_config;

    // Validate the scratch copy before installing it
    updated.validate().map_err(|e| e.to_string())?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = updated.clone();
    }

    updated.save_to_file(SmileSimConfig::default_path())?;

    Ok(())
}

/// Update pipeline configuration. A rejected section never replaces the
/// active one.
#[command]
pub async fn update_pipeline_config(
    pipeline_config: crate::config::PipelineConfig,
) -> Result<(), String> {
    let mut updated = current_config()?;
    updated.pipeline = pipeline_config;

    updated.validate().map_err(|e| e.to_string())?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = updated.clone();
    }

    updated.save_to_file(SmileSimConfig::default_path())?;

    Ok(())
}

/// Update backend configuration. A rejected section never replaces the
/// active one.
#[command]
pub async fn update_backend_config(
    backend_config: crate::config::BackendConfig,
) -> Result<(), String> {
    let mut updated = current_config()?;
    updated.backend = backend_config;

    updated.validate().map_err(|e| e.to_string())?;

    {
        let mut config = GLOBAL_CONFIG.write().map_err(|e| e.to_string())?;
        *config = updated.clone();
    }

    updated.save_to_file(SmileSimConfig::default_path())?;

    Ok(())
}
