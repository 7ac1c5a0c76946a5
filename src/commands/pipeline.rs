use crate::pipeline::encode::{decode_data_url, detect_image_mime, encode_data_url};
use crate::pipeline::{HttpTransport, ImagePipelineClient};
use crate::types::SimulationRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tauri::command;

/// Wire-facing result of a completed simulation, both images as data URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub original_image: String,
    pub simulated_image: String,
    pub procedure_reference: Option<String>,
}

/// Submit a captured photo to the simulation webhook.
///
/// `image_data` is a data URL as produced by `capture_session_still`.
/// On failure the detailed error is logged and the caller gets the
/// short user-facing message for the failure class.
#[command]
pub async fn submit_simulation(
    image_data: String,
    procedure: String,
    shade: Option<String>,
    procedure_id: Option<String>,
) -> Result<SimulationResponse, String> {
    let config = super::config::current_config()?;

    let (_, source_image) = decode_data_url(&image_data).map_err(|e| {
        log::error!("Rejecting simulation request: {}", e);
        format!("Invalid source image: {}", e)
    })?;

    let transport = HttpTransport::new(Duration::from_secs(config.pipeline.attempt_timeout_secs))
        .map_err(|e| format!("Failed to build webhook transport: {}", e))?;
    let client = ImagePipelineClient::new(transport, &config.pipeline);

    let mut request = SimulationRequest::new(source_image, procedure);
    if let Some(shade) = shade {
        request = request.with_shade(shade);
    }
    if let Some(procedure_id) = procedure_id {
        request = request.with_reference(procedure_id);
    }

    match client.submit(request).await {
        Ok(result) => {
            log::info!(
                "Simulation completed ({} byte simulated image)",
                result.simulated_image.len()
            );
            Ok(SimulationResponse {
                original_image: encode_data_url(
                    &detect_image_mime(&result.original_image),
                    &result.original_image,
                ),
                simulated_image: encode_data_url(
                    &detect_image_mime(&result.simulated_image),
                    &result.simulated_image,
                ),
                procedure_reference: result.procedure_reference,
            })
        }
        Err(e) => {
            log::error!("Simulation failed: {}", e);
            Err(e.user_message().to_string())
        }
    }
}
