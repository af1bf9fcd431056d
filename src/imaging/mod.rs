//! Credential symbols: rendering and frame decoding.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Render** | `qrcode` matrix, laid out into `image::GrayImage` |
//! | **Persist** | `image` PNG / JPEG encoders |
//! | **Decode** | `rqrr` grid detection on greyscale frames |
//!
//! The module is split into:
//! - **Parameters**: What to draw (error correction, module size, border)
//! - **Backend**: [`CodeBackend`] trait + [`QrBackend`]
//! - **Operations**: File-level functions combining a backend with disk I/O

pub mod backend;
pub mod operations;
mod params;
pub mod qr_backend;

pub use backend::{BackendError, CodeBackend, DecodedCode, FrameDecode, Point};
pub use operations::{Artifact, load_frame, render_to_file};
pub use params::{ArtifactFormat, EcLevel, RenderParams};
pub use qr_backend::QrBackend;
