//! Code backend trait and shared types.
//!
//! The [`CodeBackend`] trait covers both directions across the pixel
//! boundary: `render` turns a payload into a greyscale symbol image, `decode`
//! finds and reads every symbol in a camera frame.
//!
//! The production implementation is
//! [`QrBackend`](super::qr_backend::QrBackend). Tests use the recording
//! `MockBackend` defined below so issue and scan logic can run without
//! drawing or detecting real symbols.

use super::params::RenderParams;
use image::GrayImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("Image write failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Pixel coordinate within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A symbol found in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub payload: String,
    /// Corners of the symbol, clockwise from top-left.
    pub bounds: [Point; 4],
}

/// Everything read from one frame.
///
/// `unreadable` counts symbols that were located but failed to decode
/// (damaged, partly out of frame, motion blur).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDecode {
    pub codes: Vec<DecodedCode>,
    pub unreadable: usize,
}

/// Trait for symbol backends.
pub trait CodeBackend: Sync {
    /// Lay out `payload` as a greyscale image (dark modules = 0, light = 255).
    fn render(&self, payload: &str, params: &RenderParams) -> Result<GrayImage, BackendError>;

    /// Locate and decode every symbol in `frame`.
    fn decode(&self, frame: &GrayImage) -> FrameDecode;
}
