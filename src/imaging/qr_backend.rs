//! QR backend: `qrcode` for symbol construction, `rqrr` for detection.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Payload → module matrix | `qrcode::QrCode::with_error_correction_level` (auto version) |
//! | Matrix → pixels | [`layout_modules`] into an `image::GrayImage` |
//! | Frame → symbols | `rqrr::PreparedImage::prepare_from_greyscale` + `detect_grids` |
//!
//! Pixel layout is done here rather than through `qrcode`'s renderer so the
//! quiet zone and module size are exact and the `image` version is ours.

use super::backend::{BackendError, CodeBackend, DecodedCode, FrameDecode, Point};
use super::params::{EcLevel, RenderParams};
use image::{GrayImage, Luma};
use qrcode::QrCode;
use qrcode::types::Color;

const DARK: u8 = 0;
const LIGHT: u8 = 255;

/// Production backend. Stateless.
pub struct QrBackend;

impl QrBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::Low => qrcode::EcLevel::L,
            EcLevel::Medium => qrcode::EcLevel::M,
            EcLevel::Quartile => qrcode::EcLevel::Q,
            EcLevel::High => qrcode::EcLevel::H,
        }
    }
}

/// Paint a square module matrix with a light quiet zone around it.
///
/// `colors` is row-major, `modules * modules` long.
fn layout_modules(colors: &[Color], modules: u32, params: &RenderParams) -> GrayImage {
    let scale = params.module_size.max(1);
    let border = params.border;
    let side = (modules + 2 * border) * scale;
    GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        let inside = (border..border + modules).contains(&mx)
            && (border..border + modules).contains(&my);
        if inside {
            let idx = ((my - border) * modules + (mx - border)) as usize;
            if colors[idx] == Color::Dark {
                return Luma([DARK]);
            }
        }
        Luma([LIGHT])
    })
}

impl CodeBackend for QrBackend {
    fn render(&self, payload: &str, params: &RenderParams) -> Result<GrayImage, BackendError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), params.ec_level.into())?;
        let modules = code.width() as u32;
        Ok(layout_modules(&code.to_colors(), modules, params))
    }

    fn decode(&self, frame: &GrayImage) -> FrameDecode {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.get_pixel(x as u32, y as u32)[0],
        );
        let mut result = FrameDecode::default();
        for grid in prepared.detect_grids() {
            match grid.decode() {
                Ok((_meta, payload)) => result.codes.push(DecodedCode {
                    payload,
                    bounds: grid.bounds.map(|p| Point { x: p.x, y: p.y }),
                }),
                Err(_) => result.unreadable += 1,
            }
        }
        result
    }
}
