use crate::types::{Procedure, ShadeSwatch};
use tauri::command;

/// Get the active procedures, sorted by display name
#[command]
pub async fn get_procedures() -> Result<Vec<Procedure>, String> {
    let runtime = super::init::runtime()?;

    match runtime.catalog.procedures().await {
        Ok(procedures) => Ok(procedures),
        Err(e) => {
            log::error!("Failed to load procedures: {}", e);
            Err(format!("Failed to load procedures: {}", e))
        }
    }
}

/// Get the active tooth-shade swatches, sorted by display name
#[command]
pub async fn get_shade_swatches() -> Result<Vec<ShadeSwatch>, String> {
    let runtime = super::init::runtime()?;

    match runtime.catalog.shades().await {
        Ok(shades) => Ok(shades),
        Err(e) => {
            log::error!("Failed to load shade swatches: {}", e);
            Err(format!("Failed to load shade swatches: {}", e))
        }
    }
}

/// Drop the cached catalog so the next read hits the backend again
#[command]
pub async fn reload_catalog() -> Result<(), String> {
    let runtime = super::init::runtime()?;
    runtime.catalog.reset().await;
    log::info!("Catalog cache cleared");
    Ok(())
}
