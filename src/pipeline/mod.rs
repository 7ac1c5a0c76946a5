//! Webhook submission pipeline: encoding, retries and transport.

pub mod client;
pub mod encode;
pub mod failure;
pub mod retry;
pub mod transport;

pub use client::ImagePipelineClient;
pub use encode::{decode_data_url, detect_image_mime, encode_data_url, mime_extension, JPEG_MIME};
pub use failure::{PipelineFailure, PipelineFailureKind};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, TransportFault, WebhookTransport};
