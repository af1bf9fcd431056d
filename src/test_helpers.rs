//! Shared test utilities.

use crate::credential::Attendee;
use std::path::PathBuf;
use tempfile::TempDir;

/// The attendee used throughout the test suite.
pub fn sample_attendee() -> Attendee {
    Attendee::new("Ana López", "42", "ana@x.com")
}

/// A fresh temp directory and a registry path inside it (file not created).
///
/// Keep the `TempDir` alive for as long as the path is used.
pub fn temp_registry() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("scan-registry.txt");
    (tmp, path)
}
