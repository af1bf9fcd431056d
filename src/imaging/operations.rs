//! High-level imaging operations that combine a backend with file I/O.
//!
//! Backends only produce pixels. Persisting those pixels (directory creation,
//! format selection, overwrite semantics) lives here so it behaves the same
//! whichever backend drew the image.

use super::backend::{BackendError, CodeBackend};
use super::params::{ArtifactFormat, RenderParams};
use image::GrayImage;
use std::path::{Path, PathBuf};

/// A rendered credential image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: ArtifactFormat,
}

/// Render `payload` and write it to `output`, replacing any existing file.
///
/// The parent directory is created if missing.
pub fn render_to_file(
    backend: &impl CodeBackend,
    payload: &str,
    params: &RenderParams,
    format: ArtifactFormat,
    output: &Path,
) -> Result<Artifact, BackendError> {
    let img = backend.render(payload, params)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(output, format.image_format())?;
    Ok(Artifact {
        path: output.to_path_buf(),
        width: img.width(),
        height: img.height(),
        format,
    })
}

/// Load an image file as a greyscale frame.
pub fn load_frame(path: &Path) -> Result<GrayImage, image::ImageError> {
    Ok(image::open(path)?.to_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    #[test]
    fn writes_png_and_creates_parent() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("assets/nested/a.png");
        let backend = MockBackend::new();

        let artifact = render_to_file(
            &backend,
            "payload",
            &RenderParams::default(),
            ArtifactFormat::Png,
            &out,
        )
        .unwrap();

        assert!(out.exists());
        assert_eq!(artifact.path, out);
        assert_eq!((artifact.width, artifact.height), (8, 8));
        assert_eq!(load_frame(&out).unwrap().dimensions(), (8, 8));
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Render { payload, .. } if payload == "payload"
        ));
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a.png");
        std::fs::write(&out, b"old contents").unwrap();

        render_to_file(
            &MockBackend::new(),
            "p",
            &RenderParams::default(),
            ArtifactFormat::Png,
            &out,
        )
        .unwrap();

        assert!(load_frame(&out).is_ok());
    }

    #[test]
    fn writes_jpeg() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a.jpg");
        render_to_file(
            &MockBackend::new(),
            "p",
            &RenderParams::default(),
            ArtifactFormat::Jpeg,
            &out,
        )
        .unwrap();
        assert_eq!(
            image::ImageFormat::from_path(&out).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert!(load_frame(&out).is_ok());
    }

    #[test]
    fn load_frame_rejects_non_image() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(load_frame(&path).is_err());
    }
}
