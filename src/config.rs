//! Configuration management for SmileSim
//!
//! Provides configuration loading, saving, and management for the webhook
//! pipeline, capture defaults, and backend service endpoints.

use crate::types::CameraFacing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmileSimConfig {
    pub pipeline: PipelineConfig,
    pub capture: CaptureConfig,
    pub backend: BackendConfig,
}

/// Image-synthesis webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Webhook endpoint URL. Submission is refused while this is unset.
    pub endpoint_url: Option<String>,
    /// Bound on each individual webhook attempt, in seconds
    pub attempt_timeout_secs: u64,
    /// Total attempts per submission (first try included)
    pub retry_attempts: u32,
    /// Fixed delay between attempts, in seconds
    pub retry_delay_secs: u64,
    /// Send the older wire shape (`procedureId` query parameter, `vitacor`
    /// body field) instead of `procedure`/`shade`
    pub legacy_contract: bool,
}

/// Capture session defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Facing tried first when a session opens
    pub preferred_facing: CameraFacing,
    /// JPEG quality for captured stills (1-100)
    pub jpeg_quality: u8,
    /// Frames discarded after acquisition while the device stabilizes
    pub warmup_frames: u32,
}

/// Backend-as-a-service endpoints and storage layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the hosted backend (auth, tables, storage)
    pub base_url: Option<String>,
    /// Publishable API key sent with every backend request
    pub anon_key: Option<String>,
    /// Bucket holding original/simulated simulation images
    pub simulation_bucket: String,
    /// Bucket holding profile logos
    pub logo_bucket: String,
    /// Lifetime of signed URLs issued for non-public objects, in seconds
    pub signed_url_ttl_secs: u64,
}

impl Default for SmileSimConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            capture: CaptureConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            attempt_timeout_secs: 60,
            retry_attempts: 3,
            retry_delay_secs: 2,
            legacy_contract: false,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_facing: CameraFacing::Environment,
            jpeg_quality: 90,
            warmup_frames: 5,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            anon_key: None,
            simulation_bucket: "simulacoes".to_string(),
            logo_bucket: "logos".to_string(),
            signed_url_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl SmileSimConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: SmileSimConfig =
            toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, toml_string).map_err(|e| format!("Failed to write config file: {}", e))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("smilesim.toml")
    }

    /// Load the config file layered with `SMILESIM_*` environment overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `SMILESIM_PIPELINE__ENDPOINT_URL` overrides `pipeline.endpoint_url`.
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| format!("Failed to build default config: {}", e))?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("SMILESIM").separator("__"))
            .build()
            .map_err(|e| format!("Failed to load config: {}", e))?;

        settings
            .try_deserialize()
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load from the default location (with env overrides) or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.pipeline.endpoint_url {
            if url.trim().is_empty() {
                return Err("Webhook endpoint URL must not be blank".to_string());
            }
        }
        if self.pipeline.attempt_timeout_secs == 0 {
            return Err("Attempt timeout must be at least 1 second".to_string());
        }
        if self.pipeline.retry_attempts == 0 {
            return Err("Retry attempts must be at least 1".to_string());
        }

        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.capture.warmup_frames > 60 {
            return Err("Warmup frames must be at most 60".to_string());
        }

        if let Some(url) = &self.backend.base_url {
            if url.trim().is_empty() {
                return Err("Backend base URL must not be blank".to_string());
            }
        }
        if self.backend.simulation_bucket.trim().is_empty() {
            return Err("Simulation bucket must not be blank".to_string());
        }
        if self.backend.signed_url_ttl_secs == 0 {
            return Err("Signed URL lifetime must be at least 1 second".to_string());
        }

        Ok(())
    }
}
