use crate::capture::backend::{ActiveStream, RawFrame, StreamBackend};
use crate::errors::CaptureError;
use crate::types::{CameraFacing, StreamCapabilities};
use async_trait::async_trait;
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, RequestedFormat, RequestedFormatType},
    CallbackCamera,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Stream backend over real camera hardware via nokhwa.
///
/// All device work runs on blocking worker threads; the async side only
/// ever waits on the join handle.
pub struct NokhwaBackend {
    warmup_frames: u32,
}

impl NokhwaBackend {
    pub fn new(warmup_frames: u32) -> Self {
        Self { warmup_frames }
    }
}

impl Default for NokhwaBackend {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl StreamBackend for NokhwaBackend {
    async fn acquire(
        &self,
        facing: Option<CameraFacing>,
    ) -> Result<Arc<dyn ActiveStream>, CaptureError> {
        let warmup_frames = self.warmup_frames;
        tokio::task::spawn_blocking(move || open_device_stream(facing, warmup_frames))
            .await
            .map_err(|e| CaptureError::AcquisitionError(format!("Task join error: {}", e)))?
    }
}

fn open_device_stream(
    facing: Option<CameraFacing>,
    warmup_frames: u32,
) -> Result<Arc<dyn ActiveStream>, CaptureError> {
    let cameras = query(ApiBackend::Auto)
        .map_err(|e| CaptureError::DeviceUnavailable(format!("camera query failed: {}", e)))?;
    if cameras.is_empty() {
        return Err(CaptureError::DeviceUnavailable(
            "no cameras detected".to_string(),
        ));
    }

    let info = match facing {
        Some(f) => cameras
            .iter()
            .find(|c| matches_facing(&c.human_name(), f))
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!("no {} camera detected", f))
            })?,
        None => &cameras[0],
    };

    let index = info.index().clone();
    let device_id = index.to_string();
    let human_name = info.human_name();

    let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
    let mut camera = CallbackCamera::new(index, requested_format, |_| {})
        .map_err(|e| classify_open_failure(format!("failed to initialize camera: {}", e)))?;

    camera
        .open_stream()
        .map_err(|e| classify_open_failure(format!("failed to start stream: {}", e)))?;

    // Discard startup frames; cameras need time to stabilize exposure
    for i in 0..warmup_frames {
        match camera.poll_frame() {
            Ok(_) => log::debug!("Warmup frame {} captured", i + 1),
            Err(e) => log::debug!(
                "Warmup frame {} failed (normal during startup): {}",
                i + 1,
                e
            ),
        }
        std::thread::sleep(std::time::Duration::from_millis(30));
    }

    log::info!("Opened stream on '{}' (device {})", human_name, device_id);

    Ok(Arc::new(NokhwaStream {
        camera: Mutex::new(camera),
        stream_id: Uuid::new_v4().to_string(),
        device_id,
        live: AtomicBool::new(true),
    }))
}

/// Match a device to a requested facing by its reported name. Desktop
/// APIs expose no facing metadata, so the name is all there is.
fn matches_facing(name: &str, facing: CameraFacing) -> bool {
    let name = name.to_lowercase();
    let keywords: &[&str] = match facing {
        CameraFacing::User => &["front", "user", "facetime", "integrated", "built-in"],
        CameraFacing::Environment => &["back", "rear", "environment", "world"],
    };
    keywords.iter().any(|k| name.contains(k))
}

fn classify_open_failure(detail: String) -> CaptureError {
    let lowered = detail.to_lowercase();
    if lowered.contains("permission")
        || lowered.contains("denied")
        || lowered.contains("not authorized")
    {
        CaptureError::PermissionDenied(detail)
    } else {
        CaptureError::AcquisitionError(detail)
    }
}

struct NokhwaStream {
    camera: Mutex<CallbackCamera>,
    stream_id: String,
    device_id: String,
    live: AtomicBool,
}

impl ActiveStream for NokhwaStream {
    fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn capabilities(&self) -> StreamCapabilities {
        // nokhwa exposes neither torch nor zoom controls
        StreamCapabilities::none()
    }

    fn grab_frame(&self) -> Result<RawFrame, CaptureError> {
        if !self.live.load(Ordering::SeqCst) {
            return Err(CaptureError::AcquisitionError(
                "stream is stopped".to_string(),
            ));
        }

        let mut camera = self
            .camera
            .lock()
            .map_err(|_| CaptureError::AcquisitionError("failed to lock camera".to_string()))?;

        let frame = camera
            .poll_frame()
            .map_err(|e| CaptureError::AcquisitionError(format!("failed to capture frame: {}", e)))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::AcquisitionError(format!("failed to decode frame: {}", e)))?;

        let width = decoded.width();
        let height = decoded.height();
        Ok(RawFrame::new(decoded.into_raw(), width, height))
    }

    fn set_torch(&self, _on: bool) -> Result<(), CaptureError> {
        Err(CaptureError::ControlError(
            "torch control is not exposed by this device".to_string(),
        ))
    }

    fn set_zoom(&self, _level: f32) -> Result<(), CaptureError> {
        Err(CaptureError::ControlError(
            "zoom control is not exposed by this device".to_string(),
        ))
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            if let Ok(mut camera) = self.camera.lock() {
                let _ = camera.stop_stream();
            }
            log::debug!(
                "Stopped stream {} on device {}",
                self.stream_id,
                self.device_id
            );
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

// Ensure the device is released even if stop was never called
impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

// CallbackCamera holds platform handles that are safe to move across
// threads as long as access stays behind the mutex
unsafe impl Send for NokhwaStream {}
unsafe impl Sync for NokhwaStream {}
