//! In-memory doubles for the capture backend, the webhook transport and
//! the backend service traits. Used by unit and integration tests;
//! never constructed in release paths.

use crate::capture::backend::{ActiveStream, RawFrame, StreamBackend};
use crate::errors::{CaptureError, ServiceError};
use crate::pipeline::transport::{TransportFault, WebhookTransport};
use crate::services::identity::{IdentityProvider, SessionCallback};
use crate::services::storage::ObjectStorage;
use crate::services::tables::{CatalogStore, NewSimulationRecord, ProfileStore, SimulationStore};
use crate::testing::synthetic::synthetic_rgb_frame;
use crate::types::{
    CameraFacing, Procedure, ProfileUpdate, SavedSimulation, SessionInfo, ShadeSwatch,
    StreamCapabilities, UserProfile, ZoomRange,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Scripted camera backend. Hands out gradient-frame streams and keeps
/// counters the capture tests assert on.
pub struct SyntheticBackend {
    capabilities: Arc<RwLock<StreamCapabilities>>,
    acquire_count: AtomicU32,
    live_streams: Arc<AtomicUsize>,
    reject_facing: Option<CameraFacing>,
    fail_all: bool,
    fail_torch: bool,
    frame_size: (u32, u32),
}

impl SyntheticBackend {
    /// Backend with one device supporting flash and a 1x-5x zoom range
    pub fn new() -> Self {
        Self::with_capabilities(
            StreamCapabilities::none()
                .with_flash()
                .with_zoom(ZoomRange::new(1.0, 5.0, 0.1)),
        )
    }

    pub fn with_capabilities(capabilities: StreamCapabilities) -> Self {
        Self {
            capabilities: Arc::new(RwLock::new(capabilities)),
            acquire_count: AtomicU32::new(0),
            live_streams: Arc::new(AtomicUsize::new(0)),
            reject_facing: None,
            fail_all: false,
            fail_torch: false,
            frame_size: (64, 48),
        }
    }

    /// Refuse acquisitions that ask for this facing; unconstrained
    /// acquisitions still succeed
    pub fn reject_facing(mut self, facing: CameraFacing) -> Self {
        self.reject_facing = Some(facing);
        self
    }

    /// Refuse every acquisition
    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Make torch writes fail on streams handed out after this call
    pub fn fail_torch(mut self) -> Self {
        self.fail_torch = true;
        self
    }

    /// Change what future capability queries report. Streams already
    /// adopted by a session must keep showing their original record.
    pub fn set_capabilities(&self, capabilities: StreamCapabilities) {
        *self.capabilities.write().expect("lock poisoned") = capabilities;
    }

    pub fn acquire_count(&self) -> u32 {
        self.acquire_count.load(Ordering::SeqCst)
    }

    pub fn live_stream_count(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamBackend for SyntheticBackend {
    async fn acquire(
        &self,
        facing: Option<CameraFacing>,
    ) -> Result<Arc<dyn ActiveStream>, CaptureError> {
        let n = self.acquire_count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_all {
            return Err(CaptureError::DeviceUnavailable(
                "synthetic backend has no devices".to_string(),
            ));
        }
        if let (Some(requested), Some(rejected)) = (facing, self.reject_facing) {
            if requested == rejected {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "no {} camera detected",
                    requested
                )));
            }
        }

        self.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(SyntheticStream {
            stream_id: format!("synthetic-{}", n),
            device_id: "synthetic-device-0".to_string(),
            capabilities: Arc::clone(&self.capabilities),
            live: AtomicBool::new(true),
            live_streams: Arc::clone(&self.live_streams),
            frame_counter: AtomicU64::new(0),
            fail_torch: self.fail_torch,
            width: self.frame_size.0,
            height: self.frame_size.1,
        }))
    }
}

struct SyntheticStream {
    stream_id: String,
    device_id: String,
    capabilities: Arc<RwLock<StreamCapabilities>>,
    live: AtomicBool,
    live_streams: Arc<AtomicUsize>,
    frame_counter: AtomicU64,
    fail_torch: bool,
    width: u32,
    height: u32,
}

impl ActiveStream for SyntheticStream {
    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn capabilities(&self) -> StreamCapabilities {
        *self.capabilities.read().expect("lock poisoned")
    }

    fn grab_frame(&self) -> Result<RawFrame, CaptureError> {
        if !self.live.load(Ordering::SeqCst) {
            return Err(CaptureError::AcquisitionError(
                "stream is stopped".to_string(),
            ));
        }
        let n = self.frame_counter.fetch_add(1, Ordering::SeqCst);
        Ok(synthetic_rgb_frame(n, self.width, self.height))
    }

    fn set_torch(&self, _on: bool) -> Result<(), CaptureError> {
        if self.fail_torch {
            return Err(CaptureError::ControlError(
                "synthetic torch refused the write".to_string(),
            ));
        }
        Ok(())
    }

    fn set_zoom(&self, _level: f32) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Transport that replays a prepared script of responses and records
/// every request it sees.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Bytes, TransportFault>>>,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
    attempts: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<Bytes, TransportFault>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
        }
    }

    /// Transport with an empty script; every call fails as unreachable
    pub fn always_fail() -> Self {
        Self::new(Vec::new())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl WebhookTransport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Bytes, TransportFault> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("lock poisoned")
            .push((url.to_string(), body.clone()));
        self.script
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportFault::Unreachable(
                    "scripted transport exhausted".to_string(),
                ))
            })
    }
}

/// Transport that never answers within the caller's deadline
pub struct HangingTransport {
    delay: Duration,
    attempts: AtomicU32,
}

impl HangingTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebhookTransport for HangingTransport {
    async fn post_json(
        &self,
        _url: &str,
        _body: &serde_json::Value,
    ) -> Result<Bytes, TransportFault> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Err(TransportFault::Unreachable(
            "hanging transport woke up".to_string(),
        ))
    }
}

/// Identity provider backed by a plain in-memory slot
pub struct InMemoryIdentity {
    session: RwLock<Option<SessionInfo>>,
    listeners: RwLock<Vec<SessionCallback>>,
    sign_out_calls: AtomicU32,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
            sign_out_calls: AtomicU32::new(0),
        }
    }

    pub fn with_session(session: SessionInfo) -> Self {
        let provider = Self::new();
        *provider.session.write().expect("lock poisoned") = Some(session);
        provider
    }

    pub fn sign_out_calls(&self) -> u32 {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn notify(&self, session: Option<SessionInfo>) {
        for listener in self.listeners.read().expect("lock poisoned").iter() {
            listener(session.clone());
        }
    }
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn current_session(&self) -> Result<Option<SessionInfo>, ServiceError> {
        Ok(self.session.read().expect("lock poisoned").clone())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<SessionInfo, ServiceError> {
        let session = SessionInfo::new(
            format!("user-{}", email),
            format!("token-{}", Uuid::new_v4()),
        )
        .with_email(email.to_string());
        *self.session.write().expect("lock poisoned") = Some(session.clone());
        self.notify(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _display_name: &str,
        _phone: &str,
    ) -> Result<Option<SessionInfo>, ServiceError> {
        // Mirrors a backend that requires email confirmation
        Ok(None)
    }

    async fn request_password_reset(&self, _email: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.write().expect("lock poisoned") = None;
        self.notify(None);
        Ok(())
    }

    fn subscribe(&self, callback: SessionCallback) {
        self.listeners.write().expect("lock poisoned").push(callback);
    }
}

/// Profile table double
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<String, UserProfile>>,
    fail_fetch: bool,
    fetch_count: AtomicU32,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            fail_fetch: false,
            fetch_count: AtomicU32::new(0),
        }
    }

    /// Store whose fetches always fail with a query error
    pub fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::new()
        }
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        self.profiles
            .write()
            .expect("lock poisoned")
            .insert(profile.id.clone(), profile);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryProfiles {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, ServiceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(ServiceError::Query(
                "synthetic profile failure".to_string(),
            ));
        }
        Ok(self
            .profiles
            .read()
            .expect("lock poisoned")
            .get(user_id)
            .cloned())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<UserProfile, ServiceError> {
        let mut profiles = self.profiles.write().expect("lock poisoned");
        let profile = profiles
            .get_mut(user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("profile {}", user_id)))?;

        if let Some(name) = &changes.display_name {
            profile.display_name = name.clone();
        }
        if let Some(phone) = &changes.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(company) = &changes.company {
            profile.company = Some(company.clone());
        }
        if let Some(tax_id) = &changes.tax_id {
            profile.tax_id = Some(tax_id.clone());
        }
        if let Some(logo_url) = &changes.logo_url {
            profile.logo_url = Some(logo_url.clone());
        }
        Ok(profile.clone())
    }
}

/// Catalog tables double. Returns rows exactly as given, so tests can
/// verify the cache's own filtering and ordering.
pub struct InMemoryCatalog {
    procedures: Vec<Procedure>,
    shades: Vec<ShadeSwatch>,
    procedure_fetches: AtomicU32,
    shade_fetches: AtomicU32,
    fail_first: u32,
}

impl InMemoryCatalog {
    pub fn new(procedures: Vec<Procedure>, shades: Vec<ShadeSwatch>) -> Self {
        Self {
            procedures,
            shades,
            procedure_fetches: AtomicU32::new(0),
            shade_fetches: AtomicU32::new(0),
            fail_first: 0,
        }
    }

    /// Fail the first `n` fetches of each table; later fetches succeed
    pub fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn procedure_fetches(&self) -> u32 {
        self.procedure_fetches.load(Ordering::SeqCst)
    }

    pub fn shade_fetches(&self) -> u32 {
        self.shade_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn fetch_procedures(&self) -> Result<Vec<Procedure>, ServiceError> {
        let n = self.procedure_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.fail_first {
            return Err(ServiceError::Query(
                "synthetic catalog failure".to_string(),
            ));
        }
        Ok(self.procedures.clone())
    }

    async fn fetch_shades(&self) -> Result<Vec<ShadeSwatch>, ServiceError> {
        let n = self.shade_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.fail_first {
            return Err(ServiceError::Query(
                "synthetic catalog failure".to_string(),
            ));
        }
        Ok(self.shades.clone())
    }
}

/// Object storage double keyed by `bucket/path`
pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    upload_count: AtomicU32,
    fail_upload_at: Option<u32>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            upload_count: AtomicU32::new(0),
            fail_upload_at: None,
        }
    }

    /// Fail the `n`th upload (1-based); earlier and later uploads succeed
    pub fn fail_upload_at(mut self, n: u32) -> Self {
        self.fail_upload_at = Some(n);
        self
    }

    pub fn upload_count(&self) -> u32 {
        self.upload_count.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn has_object(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .read()
            .expect("lock poisoned")
            .contains_key(&format!("{}/{}", bucket, path))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ServiceError> {
        let n = self.upload_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_upload_at == Some(n) {
            return Err(ServiceError::Storage(
                "synthetic upload failure".to_string(),
            ));
        }
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(format!("{}/{}", bucket, path), data);
        Ok(format!("mem://storage/object/public/{}/{}", bucket, path))
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), ServiceError> {
        self.objects
            .write()
            .expect("lock poisoned")
            .remove(&format!("{}/{}", bucket, path));
        Ok(())
    }
}

/// Simulation table double
pub struct InMemorySimulations {
    rows: RwLock<Vec<SavedSimulation>>,
    procedure_names: RwLock<HashMap<String, String>>,
    fail_insert: bool,
}

impl InMemorySimulations {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            procedure_names: RwLock::new(HashMap::new()),
            fail_insert: false,
        }
    }

    /// Store whose inserts always fail with a query error
    pub fn failing() -> Self {
        Self {
            fail_insert: true,
            ..Self::new()
        }
    }

    /// Teach the double a procedure display name so inserts can join it
    pub fn register_procedure_name(&self, procedure_id: &str, name: &str) {
        self.procedure_names
            .write()
            .expect("lock poisoned")
            .insert(procedure_id.to_string(), name.to_string());
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }
}

impl Default for InMemorySimulations {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimulationStore for InMemorySimulations {
    async fn insert(&self, record: &NewSimulationRecord) -> Result<SavedSimulation, ServiceError> {
        if self.fail_insert {
            return Err(ServiceError::Query("synthetic insert failure".to_string()));
        }
        let procedure_name = record.procedure_id.as_ref().and_then(|id| {
            self.procedure_names
                .read()
                .expect("lock poisoned")
                .get(id)
                .cloned()
        });
        let row = SavedSimulation {
            id: Uuid::new_v4().to_string(),
            user_id: record.user_id.clone(),
            procedure_id: record.procedure_id.clone(),
            patient_name: record.patient_name.clone(),
            original_image_url: record.original_image_url.clone(),
            simulated_image_url: record.simulated_image_url.clone(),
            created_at: Utc::now(),
            procedure_name,
        };
        self.rows.write().expect("lock poisoned").push(row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SavedSimulation>, ServiceError> {
        let mut rows: Vec<SavedSimulation> = self
            .rows
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<(), ServiceError> {
        let mut rows = self.rows.write().expect("lock poisoned");
        let index = rows
            .iter()
            .position(|row| row.id == id && row.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("simulation {}", id)))?;
        rows.remove(index);
        Ok(())
    }
}
