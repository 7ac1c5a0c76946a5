//! Synthetic image data for offline testing without camera hardware.

use crate::capture::backend::RawFrame;
use std::io::Cursor;

/// Create a gradient RGB frame whose content varies with `frame_number`
pub fn synthetic_rgb_frame(frame_number: u64, width: u32, height: u32) -> RawFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8); // R
            data[idx + 1] = base.wrapping_add((y % 256) as u8); // G
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8); // B
        }
    }

    RawFrame::new(data, width, height)
}

/// Encode a small valid JPEG, for response-validation and storage tests
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let frame = synthetic_rgb_frame(0, width, height);
    let img = image::RgbImage::from_vec(width, height, frame.data)
        .expect("gradient buffer matches its dimensions");
    let dynamic_img = image::DynamicImage::ImageRgb8(img);

    let mut jpeg = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 85);
    dynamic_img
        .write_with_encoder(encoder)
        .expect("JPEG encode of synthetic frame");
    jpeg.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_correct_size() {
        let frame = synthetic_rgb_frame(0, 320, 240);
        assert_eq!(frame.width, 320);
        assert_eq!(frame.height, 240);
        assert_eq!(frame.data.len(), 320 * 240 * 3);
    }

    #[test]
    fn test_synthetic_frames_differ() {
        let frame0 = synthetic_rgb_frame(0, 320, 240);
        let frame1 = synthetic_rgb_frame(1, 320, 240);
        assert_ne!(frame0.data[0], frame1.data[0]);
    }

    #[test]
    fn test_synthetic_jpeg_is_decodable() {
        let jpeg = synthetic_jpeg(64, 48);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }
}
