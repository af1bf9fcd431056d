//! Checkpoint scan loop.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ──(producer thread)──▶ bounded channel ──▶ decode ──▶ validate ──▶ ScanEvent
//! ```
//!
//! Frame acquisition runs on its own thread and hands frames over a small
//! bounded channel. The calling thread decodes each frame and validates every
//! payload in it, one at a time and in order, before taking the next frame.
//! Validation never runs concurrently with itself, and the
//! [`ValidationEngine`] can be exercised without any frame source at all.
//!
//! # Termination
//!
//! The loop ends when:
//!
//! - the source reports the end of its feed (`Ok(None)`),
//! - the operator raises the [`StopSignal`], or
//! - a fault occurs. A [`DeviceError`] (source missing, frame unreadable)
//!   ends the loop immediately and is returned; there are no retries.
//!   Registry faults are returned the same way.
//!
//! # Frame sources
//!
//! Live capture devices are external and plug in through [`FrameSource`].
//! [`ImageFileSource`] replays image files (or directories of them, in
//! sorted order) as frames, which covers photos taken by door staff and
//! recorded test feeds.

use crate::imaging::{CodeBackend, Point, load_frame};
use crate::registry::RegistryError;
use crate::validate::{ValidationEngine, Verdict};
use image::GrayImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, sync_channel};
use thiserror::Error;
use walkdir::WalkDir;

/// Frames buffered between the producer and the validator.
const FRAME_BUFFER: usize = 2;

/// Extensions picked up when a directory is given as a frame source.
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Frame source not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to list frames under {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Failed to read frame {path}: {source}")]
    Frame {
        path: PathBuf,
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Device fault: {0}")]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Human-readable origin (file name, device frame number).
    pub label: String,
    pub image: GrayImage,
}

/// Supplier of frames for the scan loop.
pub trait FrameSource: Send {
    /// Next frame, `Ok(None)` once the feed has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, DeviceError>;
}

/// Replays image files as frames.
#[derive(Debug)]
pub struct ImageFileSource {
    pending: VecDeque<PathBuf>,
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            FRAME_EXTENSIONS
                .iter()
                .any(|ext| e.eq_ignore_ascii_case(ext))
        })
}

impl ImageFileSource {
    /// Resolve `inputs` into an ordered frame list.
    ///
    /// Files are taken as given. Directories are walked recursively and
    /// contribute their image files in sorted path order. A missing input is
    /// a [`DeviceError::NotFound`], reported before any frame is read.
    pub fn open(inputs: &[PathBuf]) -> Result<Self, DeviceError> {
        let mut pending = VecDeque::new();
        for input in inputs {
            if !input.exists() {
                return Err(DeviceError::NotFound(input.clone()));
            }
            if input.is_dir() {
                let mut found = Vec::new();
                for entry in WalkDir::new(input) {
                    let entry = entry.map_err(|source| DeviceError::Walk {
                        path: input.clone(),
                        source,
                    })?;
                    if entry.file_type().is_file() && is_frame_file(entry.path()) {
                        found.push(entry.into_path());
                    }
                }
                found.sort();
                pending.extend(found);
            } else {
                pending.push_back(input.clone());
            }
        }
        Ok(Self { pending })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, DeviceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let image = load_frame(&path).map_err(|source| DeviceError::Frame {
            path: path.clone(),
            source,
        })?;
        let label = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Some(Frame { label, image }))
    }
}

/// Operator stop request, shared between the UI side and the scan loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress event, emitted in processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A frame was decoded. `codes` counts readable symbols.
    Frame {
        /// 1-based.
        index: usize,
        label: String,
        codes: usize,
        unreadable: usize,
    },
    /// A payload from the current frame was validated.
    Validated {
        frame: usize,
        payload: String,
        bounds: [Point; 4],
        verdict: Verdict,
    },
}

/// Totals for a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub frames: usize,
    pub first_use: usize,
    pub duplicates: usize,
    pub unreadable: usize,
    /// The loop ended because the operator asked it to.
    pub stopped: bool,
}

fn produce<S: FrameSource>(
    mut source: S,
    stop: &StopSignal,
    tx: std::sync::mpsc::SyncSender<Result<Frame, DeviceError>>,
) {
    while !stop.is_stopped() {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if tx.send(Ok(frame)).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

fn consume(
    rx: Receiver<Result<Frame, DeviceError>>,
    backend: &impl CodeBackend,
    engine: &ValidationEngine,
    stop: &StopSignal,
    events: Option<&Sender<ScanEvent>>,
) -> Result<ScanSummary, ScanError> {
    let emit = |event: ScanEvent| {
        if let Some(tx) = events {
            let _ = tx.send(event);
        }
    };
    let mut summary = ScanSummary::default();
    for message in rx {
        if stop.is_stopped() {
            break;
        }
        let frame = message?;
        summary.frames += 1;
        let index = summary.frames;
        let decoded = backend.decode(&frame.image);
        summary.unreadable += decoded.unreadable;
        emit(ScanEvent::Frame {
            index,
            label: frame.label,
            codes: decoded.codes.len(),
            unreadable: decoded.unreadable,
        });
        for code in decoded.codes {
            let verdict = engine.validate(&code.payload)?;
            match verdict {
                Verdict::FirstUse => summary.first_use += 1,
                Verdict::Duplicate => summary.duplicates += 1,
            }
            emit(ScanEvent::Validated {
                frame: index,
                payload: code.payload,
                bounds: code.bounds,
                verdict,
            });
        }
    }
    summary.stopped = stop.is_stopped();
    Ok(summary)
}

/// Run the scan loop until the feed ends, the operator stops it, or a
/// fault occurs.
pub fn run_scan<S: FrameSource>(
    source: S,
    backend: &impl CodeBackend,
    engine: &ValidationEngine,
    stop: &StopSignal,
    events: Option<Sender<ScanEvent>>,
) -> Result<ScanSummary, ScanError> {
    let (tx, rx) = sync_channel(FRAME_BUFFER);
    std::thread::scope(|scope| {
        scope.spawn(move || produce(source, stop, tx));
        consume(rx, backend, engine, stop, events.as_ref())
    })
}

/// [`run_scan`] over an engine it owns. The engine is closed whether or not
/// the loop fails; a loop error takes precedence over a close error.
pub fn run_session<S: FrameSource>(
    source: S,
    backend: &impl CodeBackend,
    engine: ValidationEngine,
    stop: &StopSignal,
    events: Option<Sender<ScanEvent>>,
) -> Result<ScanSummary, ScanError> {
    let result = run_scan(source, backend, &engine, stop, events);
    let closed = engine.close();
    let summary = result?;
    closed?;
    Ok(summary)
}
