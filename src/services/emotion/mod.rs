//! Facial emotion heuristics
//!
//! A frame is reduced to luminance, searched for faces with a Haar cascade,
//! and the first face is checked for a smile. Smile presence plus mean face
//! luminance decide the mood (see [`classifier::decide`]).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GrayImage, Luma};
use thiserror::Error;

pub mod cascade;
pub mod classifier;

pub use cascade::{CascadeDetector, DetectParams, HaarCascade};
pub use classifier::{EmotionClassifier, EmotionReading};

/// Axis-aligned detection rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed cascade: {0}")]
    Parse(String),

    #[error("unsupported cascade: {0}")]
    Unsupported(String),

    #[error("invalid detection parameters: {0}")]
    InvalidParams(String),

    #[error("empty region")]
    EmptyRegion,

    #[error("detectors unavailable: {0}")]
    Unavailable(String),
}

/// Something that finds regions of interest in a luminance image
pub trait RegionDetector: Send + Sync {
    /// Regions in detector order; the first one is the most relevant
    fn detect(&self, image: &GrayImage) -> Result<Vec<Region>, DetectorError>;
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("no image data provided")]
    Missing,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decodes a `data:image/...;base64,` URL or a bare base64 payload
pub fn decode_frame(data: &str) -> Result<DynamicImage, FrameError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(FrameError::Missing);
    }

    let payload = match data.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => payload,
        _ => data,
    };

    let bytes = STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Single-channel luminance with BT.601 weights in 14-bit fixed point
pub fn to_luminance(frame: &DynamicImage) -> GrayImage {
    let rgb = frame.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let value = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192) >> 14;
        Luma([value as u8])
    })
}

/// Mean pixel value, `None` for an empty image
pub fn mean_luminance(image: &GrayImage) -> Option<f64> {
    let pixels = image.as_raw();
    if pixels.is_empty() {
        return None;
    }
    let total: u64 = pixels.iter().map(|&p| p as u64).sum();
    Some(total as f64 / pixels.len() as f64)
}
