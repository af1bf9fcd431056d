//! First-use / duplicate decision for presented credentials.
//!
//! Each payload moves through two states, `UNSEEN → SEEN`, and `SEEN` is
//! terminal. [`ValidationEngine::validate`] is the only transition:
//!
//! | Registry contains payload? | Verdict | Side effect |
//! |---|---|---|
//! | no | [`Verdict::FirstUse`] | payload appended to the registry |
//! | yes | [`Verdict::Duplicate`] | none |
//!
//! The engine owns its [`ScanRegistry`] behind a mutex. The registry is
//! refreshed, then checked and appended to, under one lock acquisition.
//! Two threads presenting the same credential at once therefore get exactly
//! one `FirstUse`. Each call first folds in lines other processes appended to the
//! same file, so a credential admitted at another checkpoint is a duplicate
//! here. The lock is in-process only: two processes checking the same new
//! payload at the same instant are not serialized.

use crate::registry::{RegistryError, ScanRegistry};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Never seen before; now recorded.
    FirstUse,
    /// Already admitted earlier.
    Duplicate,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::FirstUse => f.write_str("valid"),
            Verdict::Duplicate => f.write_str("already scanned"),
        }
    }
}

pub struct ValidationEngine {
    registry: Mutex<ScanRegistry>,
}

impl ValidationEngine {
    pub fn new(registry: ScanRegistry) -> Self {
        Self {
            registry: Mutex::new(registry),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScanRegistry> {
        // The set is only touched after a complete append, so a panic
        // under the lock leaves it consistent.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decide whether `payload` is being presented for the first time.
    ///
    /// Storage failures propagate; the registry is never treated as empty
    /// to keep the line moving.
    pub fn validate(&self, payload: &str) -> Result<Verdict, RegistryError> {
        let mut registry = self.lock();
        registry.refresh()?;
        if registry.contains(payload) {
            return Ok(Verdict::Duplicate);
        }
        registry.record(payload)?;
        Ok(Verdict::FirstUse)
    }

    /// Number of distinct admitted payloads.
    pub fn admitted(&self) -> usize {
        self.lock().len()
    }

    /// Release the engine and close its registry.
    pub fn close(self) -> Result<(), RegistryError> {
        self.registry
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .close()
    }
}
