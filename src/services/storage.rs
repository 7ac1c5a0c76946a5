use crate::errors::ServiceError;
use async_trait::async_trait;

/// Bucketed object storage for uploaded images.
///
/// Paths are forward-slash separated and scoped per user by their
/// callers; the storage itself does no access control.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload an object and return a URL under which it can be fetched
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ServiceError>;

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), ServiceError>;
}
