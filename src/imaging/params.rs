//! Parameter types for rendering credential codes.
//!
//! These structs describe *what* to draw, not *how*. They sit between the
//! issue flow (which decides which credential to render and where) and the
//! [`backend`](super::backend) (which lays out the modules).
//!
//! ## Types
//!
//! - [`EcLevel`]: Error-correction level, `Low` by default.
//! - [`ArtifactFormat`]: On-disk image format, which also picks the extension.
//! - [`RenderParams`]: Error correction, pixels per module, quiet-zone width.

use serde::{Deserialize, Serialize};

/// Error-correction level of the rendered symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EcLevel {
    /// ~7% of codewords recoverable.
    #[default]
    Low,
    /// ~15%.
    Medium,
    /// ~25%.
    Quartile,
    /// ~30%.
    High,
}

/// Image format written for each artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    #[default]
    Png,
    Jpeg,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Jpeg => "jpg",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            ArtifactFormat::Png => image::ImageFormat::Png,
            ArtifactFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// How a payload is laid out as pixels.
///
/// The symbol version is never fixed: the smallest version that holds the
/// payload at `ec_level` is chosen by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    pub ec_level: EcLevel,
    /// Pixels per module edge.
    pub module_size: u32,
    /// Quiet zone width, in modules, on every side.
    pub border: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::Low,
            module_size: 10,
            border: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params() {
        let p = RenderParams::default();
        assert_eq!(p.ec_level, EcLevel::Low);
        assert_eq!(p.module_size, 10);
        assert_eq!(p.border, 4);
    }

    #[test]
    fn format_extensions() {
        assert_eq!(ArtifactFormat::Png.extension(), "png");
        assert_eq!(ArtifactFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn ec_level_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrap {
            level: EcLevel,
        }
        let w: Wrap = toml::from_str(r#"level = "quartile""#).unwrap();
        assert_eq!(w.level, EcLevel::Quartile);
    }
}
