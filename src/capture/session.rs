use crate::capture::backend::{ActiveStream, RawFrame, StreamBackend};
use crate::errors::CaptureError;
use crate::types::{CameraFacing, SessionPhase, StillFrame, StreamCapabilities};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Mutable session state, guarded by the session mutex
struct SessionData {
    phase: SessionPhase,
    stream: Option<Arc<dyn ActiveStream>>,
    capabilities: StreamCapabilities,
    flash_on: bool,
    zoom_level: Option<f32>,
    last_still: Option<StillFrame>,
}

impl SessionData {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            stream: None,
            capabilities: StreamCapabilities::none(),
            flash_on: false,
            zoom_level: None,
            last_still: None,
        }
    }

    /// Take ownership of a freshly acquired stream and go live.
    /// Capabilities are read here, exactly once per acquisition.
    fn adopt_stream(&mut self, stream: Arc<dyn ActiveStream>) {
        self.capabilities = stream.capabilities();
        self.stream = Some(stream);
        self.flash_on = false;
        self.zoom_level = None;
        self.phase = SessionPhase::Live;
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
        }
        self.flash_on = false;
        self.zoom_level = None;
    }

    fn reset_to_idle(&mut self) {
        self.release_stream();
        self.capabilities = StreamCapabilities::none();
        self.last_still = None;
        self.phase = SessionPhase::Idle;
    }
}

struct Inner {
    id: String,
    backend: Arc<dyn StreamBackend>,
    preferred_facing: CameraFacing,
    jpeg_quality: u8,
    state: Mutex<SessionData>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last handle is gone; make sure the device is released
        if let Some(stream) = self.state.get_mut().stream.take() {
            stream.stop();
        }
    }
}

/// One media capture session: a single camera stream plus the frozen
/// still taken from it.
///
/// The handle is cheap to clone; all clones share one session. Every
/// operation takes the session mutex, so operations on the same session
/// are strictly serialized. Distinct sessions never contend.
///
/// Phases move `Idle -> Acquiring -> Live -> Frozen` and back to `Idle`
/// on close or on any acquisition failure.
pub struct CaptureSession {
    inner: Arc<Inner>,
}

impl Clone for CaptureSession {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CaptureSession {
    /// Acquire a stream and open a live session.
    ///
    /// The preferred facing is tried first; when no such device exists
    /// the acquisition is retried without a facing constraint, and it is
    /// that second attempt's error that surfaces on total failure.
    pub async fn open(
        backend: Arc<dyn StreamBackend>,
        preferred_facing: CameraFacing,
        jpeg_quality: u8,
    ) -> Result<Self, CaptureError> {
        let session = Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4().to_string(),
                backend,
                preferred_facing,
                jpeg_quality,
                state: Mutex::new(SessionData::new()),
            }),
        };

        {
            let mut data = session.inner.state.lock().await;
            data.phase = SessionPhase::Acquiring;
            match acquire_with_fallback(&session.inner.backend, session.inner.preferred_facing)
                .await
            {
                Ok(stream) => {
                    log::info!(
                        "Capture session {} live on device {} (stream {})",
                        session.inner.id,
                        stream.device_id(),
                        stream.stream_id()
                    );
                    data.adopt_stream(stream);
                }
                Err(e) => {
                    log::error!(
                        "Capture session {} failed to acquire a stream: {}",
                        session.inner.id,
                        e
                    );
                    data.reset_to_idle();
                    return Err(e);
                }
            }
        }

        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Toggle the torch, returning the new on/off state.
    ///
    /// Only valid on a live stream whose capability record reports flash
    /// support. A device refusal surfaces as an error but leaves the
    /// stream live.
    pub async fn toggle_flash(&self) -> Result<bool, CaptureError> {
        let mut data = self.inner.state.lock().await;
        if data.phase != SessionPhase::Live {
            return Err(CaptureError::InvalidState(format!(
                "flash toggle requires a live stream, session is {}",
                data.phase
            )));
        }
        if !data.capabilities.flash_supported {
            return Err(CaptureError::ControlError(
                "flash is not supported by the active device".to_string(),
            ));
        }

        let stream = live_stream(&data)?;
        let target = !data.flash_on;
        stream.set_torch(target)?;
        data.flash_on = target;
        log::debug!(
            "Session {} flash {}",
            self.inner.id,
            if target { "on" } else { "off" }
        );
        Ok(target)
    }

    /// Apply a zoom level to the live stream.
    ///
    /// The advertised range is advisory. Out-of-range values are passed
    /// through unclamped and recorded as given.
    pub async fn set_zoom(&self, level: f32) -> Result<(), CaptureError> {
        let mut data = self.inner.state.lock().await;
        if data.phase != SessionPhase::Live {
            return Err(CaptureError::InvalidState(format!(
                "zoom requires a live stream, session is {}",
                data.phase
            )));
        }
        let range = match data.capabilities.zoom {
            Some(range) => range,
            None => {
                return Err(CaptureError::ControlError(
                    "zoom is not supported by the active device".to_string(),
                ))
            }
        };
        if level < range.min || level > range.max {
            log::warn!(
                "Zoom level {} outside advertised range {}..{}, passing through unclamped",
                level,
                range.min,
                range.max
            );
        }

        let stream = live_stream(&data)?;
        stream.set_zoom(level)?;
        data.zoom_level = Some(level);
        Ok(())
    }

    /// Grab one frame at the stream's native resolution, encode it as a
    /// JPEG still and freeze the session.
    ///
    /// The stream is stopped only after the frame is safely encoded; a
    /// grab or encode failure leaves the session live so the caller can
    /// try again.
    pub async fn capture_still(&self) -> Result<StillFrame, CaptureError> {
        let mut data = self.inner.state.lock().await;
        if data.phase != SessionPhase::Live {
            return Err(CaptureError::InvalidState(format!(
                "capture requires a live stream, session is {}",
                data.phase
            )));
        }

        let stream = live_stream(&data)?;
        let quality = self.inner.jpeg_quality;

        let grab = Arc::clone(&stream);
        let still = tokio::task::spawn_blocking(move || -> Result<StillFrame, CaptureError> {
            let frame = grab.grab_frame()?;
            let device_id = grab.device_id().to_string();
            encode_still(frame, quality, device_id)
        })
        .await
        .map_err(|e| CaptureError::AcquisitionError(format!("Task join error: {}", e)))??;

        stream.stop();
        data.flash_on = false;
        data.zoom_level = None;
        data.last_still = Some(still.clone());
        data.phase = SessionPhase::Frozen;

        log::info!(
            "Session {} froze frame {} ({}x{}, {} bytes)",
            self.inner.id,
            still.id,
            still.width,
            still.height,
            still.size_bytes()
        );
        Ok(still)
    }

    /// Discard the frozen still and acquire a fresh stream.
    ///
    /// The new stream always has a new identity, even when it comes from
    /// the same physical device. Failure to reacquire drops the session
    /// back to idle.
    pub async fn retake(&self) -> Result<(), CaptureError> {
        let mut data = self.inner.state.lock().await;
        if data.phase != SessionPhase::Frozen {
            return Err(CaptureError::InvalidState(format!(
                "retake requires a frozen session, session is {}",
                data.phase
            )));
        }

        data.release_stream();
        data.last_still = None;
        data.capabilities = StreamCapabilities::none();
        data.phase = SessionPhase::Acquiring;

        match acquire_with_fallback(&self.inner.backend, self.inner.preferred_facing).await {
            Ok(stream) => {
                log::info!(
                    "Session {} reacquired stream {} on device {}",
                    self.inner.id,
                    stream.stream_id(),
                    stream.device_id()
                );
                data.adopt_stream(stream);
                Ok(())
            }
            Err(e) => {
                log::error!(
                    "Session {} failed to reacquire a stream: {}",
                    self.inner.id,
                    e
                );
                data.reset_to_idle();
                Err(e)
            }
        }
    }

    /// Stop the stream and return to idle. Safe to call in any phase and
    /// any number of times.
    pub async fn close(&self) {
        let mut data = self.inner.state.lock().await;
        if data.stream.is_some() {
            log::info!("Closing capture session {}", self.inner.id);
        }
        data.reset_to_idle();
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.lock().await.phase
    }

    pub async fn capabilities(&self) -> StreamCapabilities {
        self.inner.state.lock().await.capabilities
    }

    pub async fn flash_enabled(&self) -> bool {
        self.inner.state.lock().await.flash_on
    }

    pub async fn zoom_level(&self) -> Option<f32> {
        self.inner.state.lock().await.zoom_level
    }

    pub async fn stream_id(&self) -> Option<String> {
        let data = self.inner.state.lock().await;
        data.stream.as_ref().map(|s| s.stream_id().to_string())
    }

    pub async fn device_id(&self) -> Option<String> {
        let data = self.inner.state.lock().await;
        data.stream.as_ref().map(|s| s.device_id().to_string())
    }

    pub async fn last_still(&self) -> Option<StillFrame> {
        self.inner.state.lock().await.last_still.clone()
    }

    pub async fn has_live_stream(&self) -> bool {
        let data = self.inner.state.lock().await;
        data.stream.as_ref().map(|s| s.is_live()).unwrap_or(false)
    }
}

fn live_stream(data: &SessionData) -> Result<Arc<dyn ActiveStream>, CaptureError> {
    data.stream
        .clone()
        .ok_or_else(|| CaptureError::InvalidState("live session has no stream".to_string()))
}

async fn acquire_with_fallback(
    backend: &Arc<dyn StreamBackend>,
    preferred: CameraFacing,
) -> Result<Arc<dyn ActiveStream>, CaptureError> {
    match backend.acquire(Some(preferred)).await {
        Ok(stream) => Ok(stream),
        Err(e) => {
            log::warn!(
                "No {} camera available ({}), retrying without a facing constraint",
                preferred,
                e
            );
            backend.acquire(None).await
        }
    }
}

fn encode_still(frame: RawFrame, quality: u8, device_id: String) -> Result<StillFrame, CaptureError> {
    let img = image::RgbImage::from_vec(frame.width, frame.height, frame.data).ok_or_else(|| {
        CaptureError::EncodeError("frame buffer does not match its declared dimensions".to_string())
    })?;
    let dynamic_img = image::DynamicImage::ImageRgb8(img);

    let mut jpeg = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality);
    dynamic_img
        .write_with_encoder(encoder)
        .map_err(|e| CaptureError::EncodeError(format!("JPEG encode failed: {}", e)))?;

    Ok(StillFrame::new(
        jpeg.into_inner(),
        frame.width,
        frame.height,
        device_id,
    ))
}
