// src/session/capture.rs
//
// One frame per server request: grab the full screen, downscale to the
// transport width, JPEG-encode, base64. The agent never self-schedules
// captures; cadence (and therefore bandwidth) is owned by the server.
use base64::Engine;
use screenshots::image::codecs::jpeg::JpegEncoder;
use screenshots::image::imageops::{self, FilterType};
use screenshots::image::{DynamicImage, RgbaImage};
use screenshots::Screen;
use thiserror::Error;

/// Frames wider than this are downscaled, preserving aspect ratio.
pub const MAX_FRAME_WIDTH: u32 = 1280;
/// Fixed JPEG quality for every frame.
pub const JPEG_QUALITY: u8 = 75;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("screen capture failed: {0}")]
    Screen(String),

    #[error("frame encoding failed: {0}")]
    Encode(String),
}

pub trait ScreenSource: Send {
    fn capture(&mut self) -> Result<RgbaImage, CaptureError>;
}

/// Captures the primary display. Screens are enumerated on every call so a
/// display that appears after startup is still usable.
pub struct PrimaryScreen;

impl ScreenSource for PrimaryScreen {
    fn capture(&mut self) -> Result<RgbaImage, CaptureError> {
        let screens = Screen::all().map_err(|e| CaptureError::Screen(e.to_string()))?;
        let screen = screens
            .first()
            .ok_or_else(|| CaptureError::Screen("no screens detected".to_string()))?;
        screen
            .capture()
            .map_err(|e| CaptureError::Screen(e.to_string()))
    }
}

/// Target dimensions for a frame: unchanged when already narrow enough,
/// otherwise width clamped to `MAX_FRAME_WIDTH` with proportionally scaled,
/// rounded height.
pub fn downscale_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_FRAME_WIDTH {
        return (width, height);
    }
    let ratio = MAX_FRAME_WIDTH as f64 / width as f64;
    (MAX_FRAME_WIDTH, (height as f64 * ratio).round() as u32)
}

/// Downscale, JPEG-encode at the fixed quality, and base64 the result into
/// a text-safe payload for a `screen_data` frame.
pub fn encode_frame(image: RgbaImage) -> Result<String, CaptureError> {
    let (width, height) = image.dimensions();
    let (target_width, target_height) = downscale_dimensions(width, height);
    let image = if (target_width, target_height) != (width, height) {
        imageops::resize(&image, target_width, target_height, FilterType::Lanczos3)
    } else {
        image
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(&buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenshots::image::Rgba;

    #[test]
    fn wide_frames_are_clamped_to_1280() {
        assert_eq!(downscale_dimensions(1920, 1080), (1280, 720));
        assert_eq!(downscale_dimensions(2560, 1440), (1280, 720));
        assert_eq!(downscale_dimensions(3840, 2160), (1280, 720));
    }

    #[test]
    fn narrow_frames_are_untouched() {
        assert_eq!(downscale_dimensions(1280, 800), (1280, 800));
        assert_eq!(downscale_dimensions(800, 600), (800, 600));
        assert_eq!(downscale_dimensions(1, 1), (1, 1));
    }

    #[test]
    fn scaled_height_is_rounded() {
        // 1081 * (1280 / 1920) = 720.67, rounds to 721.
        assert_eq!(downscale_dimensions(1920, 1081), (1280, 721));
    }

    #[test]
    fn encode_frame_downscales_and_base64s() {
        let image = RgbaImage::from_pixel(1920, 1080, Rgba([40, 90, 160, 255]));
        let data = encode_frame(image).unwrap();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&data)
            .unwrap();
        let decoded = screenshots::image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 1280);
        assert_eq!(decoded.height(), 720);
    }

    #[test]
    fn small_frames_keep_their_size() {
        let image = RgbaImage::from_pixel(640, 480, Rgba([0, 0, 0, 255]));
        let data = encode_frame(image).unwrap();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&data)
            .unwrap();
        let decoded = screenshots::image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 640);
        assert_eq!(decoded.height(), 480);
    }
}
