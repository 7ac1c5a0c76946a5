use crate::errors::CaptureError;
use crate::types::{CameraFacing, StreamCapabilities};
use async_trait::async_trait;
use std::sync::Arc;

/// Uncompressed RGB frame as pulled off a live stream
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Tightly packed RGB8 pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// A live media stream bound to one physical device.
///
/// Implementations must tolerate `stop` being called more than once and
/// from any thread. After `stop`, `is_live` returns false and
/// `grab_frame` fails.
pub trait ActiveStream: Send + Sync {
    /// Identity of this stream instance. Acquiring again, even from the
    /// same device, yields a different id.
    fn stream_id(&self) -> &str;

    /// Identity of the underlying device
    fn device_id(&self) -> &str;

    /// Controls this stream actually supports. Queried once right after
    /// acquisition; the answer must not change over the stream's life.
    fn capabilities(&self) -> StreamCapabilities;

    /// Pull the most recent frame off the stream. Blocking; callers run
    /// this on a worker thread.
    fn grab_frame(&self) -> Result<RawFrame, CaptureError>;

    fn set_torch(&self, on: bool) -> Result<(), CaptureError>;

    fn set_zoom(&self, level: f32) -> Result<(), CaptureError>;

    /// Stop the stream and release the device. Idempotent.
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Source of camera streams.
///
/// The session layer never talks to device APIs directly; it acquires
/// streams through this trait so tests can substitute synthetic
/// hardware.
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Open a stream, preferring a device with the given facing when one
    /// is requested. `None` means any available device.
    async fn acquire(
        &self,
        facing: Option<CameraFacing>,
    ) -> Result<Arc<dyn ActiveStream>, CaptureError>;
}
