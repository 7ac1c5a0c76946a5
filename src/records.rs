use crate::errors::ServiceError;
use crate::pipeline::encode::{decode_data_url, mime_extension};
use crate::services::{NewSimulationRecord, ObjectStorage, SimulationStore};
use crate::types::SavedSimulation;
use std::sync::Arc;
use uuid::Uuid;

/// Request to persist a finished simulation
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub user_id: String,
    pub patient_name: String,
    pub procedure_id: Option<String>,
    /// Data URL of the captured photo
    pub original_image: String,
    /// Data URL of the webhook's output
    pub simulated_image: String,
}

struct StoredObject {
    path: String,
    url: String,
}

/// Persistence of completed simulations: two stored images plus one
/// table row per save.
pub struct SimulationRecords {
    simulations: Arc<dyn SimulationStore>,
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
}

impl SimulationRecords {
    pub fn new(
        simulations: Arc<dyn SimulationStore>,
        storage: Arc<dyn ObjectStorage>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            simulations,
            storage,
            bucket: bucket.into(),
        }
    }

    /// Upload both images, then insert the row.
    ///
    /// A failure partway through deletes whatever was already uploaded,
    /// best effort, so a failed save leaves no orphaned objects behind.
    pub async fn save(&self, request: SaveRequest) -> Result<SavedSimulation, ServiceError> {
        let patient_name = request.patient_name.trim();
        if patient_name.is_empty() {
            return Err(ServiceError::Invalid(
                "patient name must not be empty".to_string(),
            ));
        }

        let original = self
            .upload_data_url(&request.user_id, &request.original_image)
            .await?;
        let simulated = match self
            .upload_data_url(&request.user_id, &request.simulated_image)
            .await
        {
            Ok(object) => object,
            Err(e) => {
                self.cleanup(&[&original]).await;
                return Err(e);
            }
        };

        let record = NewSimulationRecord {
            user_id: request.user_id.clone(),
            procedure_id: request.procedure_id.clone(),
            patient_name: patient_name.to_string(),
            original_image_url: original.url.clone(),
            simulated_image_url: simulated.url.clone(),
        };
        match self.simulations.insert(&record).await {
            Ok(row) => {
                log::info!(
                    "Saved simulation {} for patient '{}' (user {})",
                    row.id,
                    row.patient_name,
                    row.user_id
                );
                Ok(row)
            }
            Err(e) => {
                self.cleanup(&[&original, &simulated]).await;
                Err(e)
            }
        }
    }

    /// One user's saved simulations, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<SavedSimulation>, ServiceError> {
        let mut rows = self.simulations.list_for_user(user_id).await?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    /// Delete a saved simulation: the row first, then its stored images.
    ///
    /// The row is authoritative. Once it is gone the delete has
    /// succeeded; stranded objects only waste space and are logged.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), ServiceError> {
        let rows = self.simulations.list_for_user(user_id).await?;
        let record = rows
            .into_iter()
            .find(|row| row.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("simulation {}", id)))?;

        self.simulations.delete(id, user_id).await?;

        for url in [&record.original_image_url, &record.simulated_image_url] {
            match storage_path_from_url(url, &self.bucket) {
                Some(path) => {
                    if let Err(e) = self.storage.delete(&self.bucket, &path).await {
                        log::warn!("Failed to delete stored object {}: {}", path, e);
                    }
                }
                None => log::warn!("Could not derive a storage path from {}", url),
            }
        }

        log::info!("Deleted simulation {} for user {}", id, user_id);
        Ok(())
    }

    async fn upload_data_url(
        &self,
        user_id: &str,
        data_url: &str,
    ) -> Result<StoredObject, ServiceError> {
        let (mime, data) = decode_data_url(data_url).map_err(ServiceError::Decode)?;
        let path = format!("{}/{}.{}", user_id, Uuid::new_v4(), mime_extension(&mime));
        let url = self.storage.upload(&self.bucket, &path, data, &mime).await?;
        Ok(StoredObject { path, url })
    }

    async fn cleanup(&self, objects: &[&StoredObject]) {
        for object in objects {
            if let Err(e) = self.storage.delete(&self.bucket, &object.path).await {
                log::warn!(
                    "Failed to clean up {}/{}: {}",
                    self.bucket,
                    object.path,
                    e
                );
            }
        }
    }
}

/// Extract the object path from a public or signed storage URL
fn storage_path_from_url(url: &str, bucket: &str) -> Option<String> {
    let markers = [
        format!("/object/public/{}/", bucket),
        format!("/object/sign/{}/", bucket),
    ];
    for marker in &markers {
        if let Some(index) = url.find(marker.as_str()) {
            let path = &url[index + marker.len()..];
            let path = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
            if !path.is_empty() {
                return Some(path.to_string());
            }
        }
    }
    None
}
