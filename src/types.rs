use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Camera facing preference for stream acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Rear camera, preferred for patient photos
    Environment,
    /// Front camera
    User,
}

impl CameraFacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraFacing::Environment => "environment",
            CameraFacing::User => "user",
        }
    }
}

impl Default for CameraFacing {
    fn default() -> Self {
        CameraFacing::Environment
    }
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported zoom range reported by a stream, advisory only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ZoomRange {
    pub fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }
}

/// Optional-capability record for a live stream.
///
/// Populated exactly once when the stream is acquired; never re-queried
/// on later control calls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamCapabilities {
    pub flash_supported: bool,
    pub zoom: Option<ZoomRange>,
}

impl StreamCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_flash(mut self) -> Self {
        self.flash_supported = true;
        self
    }

    pub fn with_zoom(mut self, range: ZoomRange) -> Self {
        self.zoom = Some(range);
        self
    }
}

/// Capture session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Acquiring,
    Live,
    Frozen,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Acquiring => "acquiring",
            SessionPhase::Live => "live",
            SessionPhase::Frozen => "frozen",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A JPEG still extracted from a live stream at native resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StillFrame {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub device_id: String,
}

impl StillFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, device_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            width,
            height,
            data,
            device_id,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Input to the image pipeline. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Source image bytes (JPEG or PNG)
    pub source_image: Vec<u8>,
    /// Wire identifier of the chosen procedure, appended to the webhook URL
    pub procedure_identifier: String,
    /// Optional tooth-shade identifier, sent in the request body
    pub shade_identifier: Option<String>,
    /// Catalog row id of the procedure, carried through for persistence
    pub procedure_reference: Option<String>,
}

impl SimulationRequest {
    pub fn new(source_image: Vec<u8>, procedure_identifier: impl Into<String>) -> Self {
        Self {
            source_image,
            procedure_identifier: procedure_identifier.into(),
            shade_identifier: None,
            procedure_reference: None,
        }
    }

    pub fn with_shade(mut self, shade: impl Into<String>) -> Self {
        self.shade_identifier = Some(shade.into());
        self
    }

    pub fn with_reference(mut self, procedure_id: impl Into<String>) -> Self {
        self.procedure_reference = Some(procedure_id.into());
        self
    }
}

/// Output of the image pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub original_image: Vec<u8>,
    pub simulated_image: Vec<u8>,
    pub procedure_reference: Option<String>,
}

/// Reference data: a bookable procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    pub id: String,
    pub display_name: String,
    /// Value sent to the image-synthesis webhook for this procedure
    pub webhook_value: String,
    pub active: bool,
}

/// Reference data: a tooth-shade swatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadeSwatch {
    pub id: String,
    pub display_name: String,
    pub color_hex: String,
    pub active: bool,
}

/// Profile row for an authenticated user. `active` gates application access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tax_id: Option<String>,
    pub logo_url: Option<String>,
    pub active: bool,
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub tax_id: Option<String>,
    pub logo_url: Option<String>,
}

/// A persisted simulation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSimulation {
    pub id: String,
    pub user_id: String,
    pub procedure_id: Option<String>,
    pub patient_name: String,
    pub original_image_url: String,
    pub simulated_image_url: String,
    pub created_at: DateTime<Utc>,
    /// Display name of the linked procedure when the store joins it in
    pub procedure_name: Option<String>,
}

/// Access-gate state derived from session and profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    Loading,
    Blocked,
    PendingApproval,
    Granted,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Loading => "loading",
            GateState::Blocked => "blocked",
            GateState::PendingApproval => "pending_approval",
            GateState::Granted => "granted",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mirror of the identity provider's session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
}

impl SessionInfo {
    pub fn new(user_id: String, access_token: String) -> Self {
        Self {
            user_id,
            email: None,
            access_token,
        }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }
}
