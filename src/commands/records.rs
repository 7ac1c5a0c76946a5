use crate::commands::init::PluginRuntime;
use crate::records::SaveRequest;
use crate::types::SavedSimulation;
use tauri::command;

fn require_user(runtime: &PluginRuntime) -> Result<String, String> {
    runtime
        .services
        .session
        .session()
        .map(|session| session.user_id)
        .ok_or_else(|| "No signed-in user".to_string())
}

/// Persist a finished simulation: both images plus one table row
#[command]
pub async fn save_simulation(
    patient_name: String,
    procedure_id: Option<String>,
    original_image: String,
    simulated_image: String,
) -> Result<SavedSimulation, String> {
    let runtime = super::init::runtime()?;
    let user_id = require_user(&runtime)?;

    let request = SaveRequest {
        user_id,
        patient_name,
        procedure_id,
        original_image,
        simulated_image,
    };

    match runtime.records.save(request).await {
        Ok(record) => {
            log::info!("Saved simulation {}", record.id);
            Ok(record)
        }
        Err(e) => {
            log::error!("Failed to save simulation: {}", e);
            Err(format!("Failed to save simulation: {}", e))
        }
    }
}

/// List the signed-in user's saved simulations, newest first
#[command]
pub async fn list_simulations() -> Result<Vec<SavedSimulation>, String> {
    let runtime = super::init::runtime()?;
    let user_id = require_user(&runtime)?;

    match runtime.records.list(&user_id).await {
        Ok(records) => Ok(records),
        Err(e) => {
            log::error!("Failed to list simulations: {}", e);
            Err(format!("Failed to list simulations: {}", e))
        }
    }
}

/// Delete one of the signed-in user's saved simulations
#[command]
pub async fn delete_simulation(id: String) -> Result<(), String> {
    let runtime = super::init::runtime()?;
    let user_id = require_user(&runtime)?;

    match runtime.records.delete(&id, &user_id).await {
        Ok(()) => {
            log::info!("Deleted simulation {}", id);
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to delete simulation: {}", e);
            Err(format!("Failed to delete simulation: {}", e))
        }
    }
}
