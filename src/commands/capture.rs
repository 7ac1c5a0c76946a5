use crate::capture::{CaptureSession, NokhwaBackend, StreamBackend};
use crate::pipeline::encode::{encode_data_url, JPEG_MIME};
use crate::types::{CameraFacing, SessionPhase, StillFrame, StreamCapabilities};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tauri::command;
use tokio::sync::RwLock;

// Global session registry; the map lock is async, the per-session lock
// lives inside CaptureSession itself
lazy_static::lazy_static! {
    static ref SESSION_REGISTRY: Arc<RwLock<HashMap<String, CaptureSession>>> = Arc::new(RwLock::new(HashMap::new()));
}

/// Wire-facing snapshot of one capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub phase: SessionPhase,
    pub capabilities: StreamCapabilities,
    pub flash_on: bool,
    pub zoom_level: Option<f32>,
    pub device_id: Option<String>,
    pub stream_id: Option<String>,
    pub has_still: bool,
}

/// A frozen still plus a browser-ready preview of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedStill {
    pub frame: StillFrame,
    pub preview: String,
}

async fn session_status(session: &CaptureSession) -> SessionStatus {
    SessionStatus {
        session_id: session.id().to_string(),
        phase: session.phase().await,
        capabilities: session.capabilities().await,
        flash_on: session.flash_enabled().await,
        zoom_level: session.zoom_level().await,
        device_id: session.device_id().await,
        stream_id: session.stream_id().await,
        has_still: session.last_still().await.is_some(),
    }
}

async fn lookup_session(session_id: &str) -> Result<CaptureSession, String> {
    let registry = SESSION_REGISTRY.read().await;
    registry
        .get(session_id)
        .cloned()
        .ok_or_else(|| format!("No capture session with ID: {}", session_id))
}

/// Open a capture session and bring its stream live
#[command]
pub async fn open_capture_session(
    facing: Option<CameraFacing>,
) -> Result<SessionStatus, String> {
    let config = super::config::current_config()?;
    let facing = facing.unwrap_or(config.capture.preferred_facing);
    log::info!("Opening capture session with preferred facing: {}", facing);

    let backend: Arc<dyn StreamBackend> =
        Arc::new(NokhwaBackend::new(config.capture.warmup_frames));

    match CaptureSession::open(backend, facing, config.capture.jpeg_quality).await {
        Ok(session) => {
            let status = session_status(&session).await;
            let mut registry = SESSION_REGISTRY.write().await;
            registry.insert(session.id().to_string(), session);
            Ok(status)
        }
        Err(e) => {
            log::error!("Failed to open capture session: {}", e);
            Err(format!("Failed to open capture session: {}", e))
        }
    }
}

/// Get the current status of a capture session
#[command]
pub async fn get_session_status(session_id: String) -> Result<SessionStatus, String> {
    let session = lookup_session(&session_id).await?;
    Ok(session_status(&session).await)
}

/// Toggle the torch on a live session, returning the new state
#[command]
pub async fn toggle_session_flash(session_id: String) -> Result<bool, String> {
    let session = lookup_session(&session_id).await?;

    match session.toggle_flash().await {
        Ok(on) => Ok(on),
        Err(e) => {
            log::error!("Failed to toggle flash: {}", e);
            Err(format!("Failed to toggle flash: {}", e))
        }
    }
}

/// Apply a zoom level to a live session, returning the applied level
#[command]
pub async fn set_session_zoom(session_id: String, level: f32) -> Result<f32, String> {
    let session = lookup_session(&session_id).await?;

    match session.set_zoom(level).await {
        Ok(()) => Ok(level),
        Err(e) => {
            log::error!("Failed to set zoom: {}", e);
            Err(format!("Failed to set zoom: {}", e))
        }
    }
}

/// Capture a still from a live session and freeze it
#[command]
pub async fn capture_session_still(session_id: String) -> Result<CapturedStill, String> {
    let session = lookup_session(&session_id).await?;

    match session.capture_still().await {
        Ok(frame) => {
            log::info!(
                "Captured still: {}x{} ({} bytes)",
                frame.width,
                frame.height,
                frame.size_bytes()
            );
            let preview = encode_data_url(JPEG_MIME, &frame.data);
            Ok(CapturedStill { frame, preview })
        }
        Err(e) => {
            log::error!("Failed to capture still: {}", e);
            Err(format!("Failed to capture still: {}", e))
        }
    }
}

/// Discard the frozen still and bring a fresh stream live
#[command]
pub async fn retake_session(session_id: String) -> Result<SessionStatus, String> {
    let session = lookup_session(&session_id).await?;

    match session.retake().await {
        Ok(()) => Ok(session_status(&session).await),
        Err(e) => {
            log::error!("Failed to retake: {}", e);
            Err(format!("Failed to retake: {}", e))
        }
    }
}

/// Close a capture session (stop its stream and drop it from the registry)
#[command]
pub async fn close_capture_session(session_id: String) -> Result<String, String> {
    log::info!("Closing capture session: {}", session_id);

    let mut registry = SESSION_REGISTRY.write().await;

    if let Some(session) = registry.remove(&session_id) {
        session.close().await;
        Ok(format!("Capture session {} closed", session_id))
    } else {
        let msg = format!("No capture session with ID: {}", session_id);
        log::info!("{}", msg);
        Ok(msg) // Not an error if the session wasn't open
    }
}
