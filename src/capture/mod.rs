//! Media capture: session state machine, stream backends and devices.

pub mod backend;
pub mod device;
pub mod session;

pub use backend::{ActiveStream, RawFrame, StreamBackend};
pub use device::NokhwaBackend;
pub use session::CaptureSession;
