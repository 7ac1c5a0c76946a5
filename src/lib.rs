//! SmileSim: patient-photo capture and smile simulation for Tauri applications
//!
//! This crate drives the full simulation workflow for dental consultation
//! apps: open a camera session, freeze a patient photo, send it to an
//! image-synthesis webhook and persist the before/after pair.
//!
//! # Features
//! - Camera session lifecycle with flash and zoom control
//! - Webhook submission with retries and per-attempt timeouts
//! - Profile-based access gating
//! - Cached procedure and tooth-shade catalogs
//! - Saved-simulation records with object storage cleanup
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! smilesim = "0.3"
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! use smilesim;
//!
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(smilesim::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod capture;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod errors;
pub mod gate;
pub mod pipeline;
pub mod records;
pub mod services;
pub mod types;

// Testing utilities - synthetic frames and in-memory service doubles
pub mod testing;

// Re-exports for convenience
pub use capture::{CaptureSession, NokhwaBackend, StreamBackend};
pub use catalog::CatalogCache;
pub use errors::{CaptureError, ServiceError};
pub use gate::ProfileGate;
pub use pipeline::{HttpTransport, ImagePipelineClient, PipelineFailure, PipelineFailureKind};
pub use records::SimulationRecords;
pub use services::Services;
pub use types::{
    CameraFacing, GateState, Procedure, SavedSimulation, SessionInfo, SessionPhase, ShadeSwatch,
    SimulationRequest, SimulationResult, StillFrame, StreamCapabilities, UserProfile,
};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the SmileSim plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("smilesim")
        .invoke_handler(tauri::generate_handler![
            // Initialization commands
            commands::init::initialize_plugin,
            commands::init::get_plugin_info,
            // Capture session commands
            commands::capture::open_capture_session,
            commands::capture::get_session_status,
            commands::capture::toggle_session_flash,
            commands::capture::set_session_zoom,
            commands::capture::capture_session_still,
            commands::capture::retake_session,
            commands::capture::close_capture_session,
            // Simulation pipeline commands
            commands::pipeline::submit_simulation,
            // Access gate and authentication commands
            commands::gate::evaluate_access_gate,
            commands::gate::get_access_gate_state,
            commands::gate::dismiss_approval_notice,
            commands::gate::sign_in,
            commands::gate::sign_up,
            commands::gate::request_password_reset,
            commands::gate::sign_out,
            commands::gate::get_current_session,
            // Profile commands
            commands::profile::get_user_profile,
            commands::profile::update_user_profile,
            commands::profile::upload_profile_logo,
            // Catalog commands
            commands::catalog::get_procedures,
            commands::catalog::get_shade_swatches,
            commands::catalog::reload_catalog,
            // Saved-simulation commands
            commands::records::save_simulation,
            commands::records::list_simulations,
            commands::records::delete_simulation,
            // Configuration commands
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
            commands::config::get_capture_config,
            commands::config::get_pipeline_config,
            commands::config::get_backend_config,
            commands::config::update_capture_config,
            commands::config::update_pipeline_config,
            commands::config::update_backend_config,
        ])
        .build()
}

/// Initialize logging for the plugin
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "smilesim=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "smilesim");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
