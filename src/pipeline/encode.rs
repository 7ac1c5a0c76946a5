//! Data URL conversions shared by the webhook pipeline and the record store.
//!
//! The transport encoding is plain base64 inside a `data:` URL; no image
//! re-encoding happens here, so a decode of an encode is byte-identical.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const JPEG_MIME: &str = "image/jpeg";

/// Build a `data:<mime>;base64,<payload>` URL from raw bytes
pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Parse a data URL back into its mime type and raw bytes
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), String> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URL".to_string())?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URL has no payload separator".to_string())?;

    let mime = header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();

    if !header.contains("base64") {
        return Err("data URL is not base64 encoded".to_string());
    }

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {}", e))?;

    Ok((mime, data))
}

/// File extension for a mime type, used when naming stored objects
pub fn mime_extension(mime: &str) -> &str {
    match mime.split('/').nth(1) {
        Some("jpeg") => "jpg",
        Some(sub) if !sub.is_empty() => sub,
        _ => "bin",
    }
}

/// Guess the mime type of raw image bytes from their magic numbers
pub fn detect_image_mime(data: &[u8]) -> &'static str {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        _ => "application/octet-stream",
    }
}
