use crate::commands::init::PluginRuntime;
use crate::pipeline::encode::{decode_data_url, mime_extension};
use crate::types::{ProfileUpdate, UserProfile};
use tauri::command;
use uuid::Uuid;

fn require_user(runtime: &PluginRuntime) -> Result<String, String> {
    runtime
        .services
        .session
        .session()
        .map(|session| session.user_id)
        .ok_or_else(|| "No signed-in user".to_string())
}

/// Get the signed-in user's profile row. `None` means the row has not
/// been provisioned yet.
#[command]
pub async fn get_user_profile() -> Result<Option<UserProfile>, String> {
    let runtime = super::init::runtime()?;
    let user_id = require_user(&runtime)?;

    match runtime.services.profiles.fetch_profile(&user_id).await {
        Ok(profile) => Ok(profile),
        Err(e) => {
            log::error!("Failed to fetch profile: {}", e);
            Err(format!("Failed to fetch profile: {}", e))
        }
    }
}

/// Apply changes to the signed-in user's profile
#[command]
pub async fn update_user_profile(changes: ProfileUpdate) -> Result<UserProfile, String> {
    let runtime = super::init::runtime()?;
    let user_id = require_user(&runtime)?;

    match runtime
        .services
        .profiles
        .update_profile(&user_id, &changes)
        .await
    {
        Ok(profile) => {
            log::info!("Updated profile for user {}", user_id);
            Ok(profile)
        }
        Err(e) => {
            log::error!("Failed to update profile: {}", e);
            Err(format!("Failed to update profile: {}", e))
        }
    }
}

/// Upload a company logo (as a data URL) and record its URL on the
/// profile. Returns the updated profile.
#[command]
pub async fn upload_profile_logo(image_data: String) -> Result<UserProfile, String> {
    let runtime = super::init::runtime()?;
    let user_id = require_user(&runtime)?;
    let config = super::config::current_config()?;

    let (mime, bytes) = decode_data_url(&image_data)
        .map_err(|e| format!("Invalid logo image: {}", e))?;
    if image::load_from_memory(&bytes).is_err() {
        return Err("Invalid logo image: not a decodable image".to_string());
    }

    let path = format!("{}/{}.{}", user_id, Uuid::new_v4(), mime_extension(&mime));
    let url = match runtime
        .services
        .storage
        .upload(&config.backend.logo_bucket, &path, bytes, &mime)
        .await
    {
        Ok(url) => url,
        Err(e) => {
            log::error!("Logo upload failed: {}", e);
            return Err(format!("Logo upload failed: {}", e));
        }
    };

    let changes = ProfileUpdate {
        logo_url: Some(url),
        ..Default::default()
    };
    match runtime
        .services
        .profiles
        .update_profile(&user_id, &changes)
        .await
    {
        Ok(profile) => {
            log::info!("Logo updated for user {}", user_id);
            Ok(profile)
        }
        Err(e) => {
            log::error!("Failed to record logo URL: {}", e);
            // Best-effort cleanup so the uploaded object is not orphaned
            if let Err(cleanup) = runtime
                .services
                .storage
                .delete(&config.backend.logo_bucket, &path)
                .await
            {
                log::warn!("Could not remove orphaned logo {}: {}", path, cleanup);
            }
            Err(format!("Failed to record logo URL: {}", e))
        }
    }
}
