//! Durable registry of credentials that have already been admitted.
//!
//! # Storage
//!
//! The registry is a plain text file, one payload per line, UTF-8, no header:
//!
//! ```text
//! Evento: Persona: Ana López, ID: 42, Correo: ana@x.com
//! Evento: Persona: Luis, ID: 7, Correo: luis@example.org
//! ```
//!
//! It is append-only. Entries are never rewritten, removed, or compacted; a
//! crash can at worst lose the line being written, never an earlier one.
//!
//! # Lifecycle
//!
//! [`ScanRegistry::open`] reads the file into an in-memory set and remembers
//! how many bytes it has consumed. [`ScanRegistry::refresh`] folds in lines
//! appended since then, including lines written by another process sharing
//! the file. [`ScanRegistry::record`] appends to the file and the set
//! together, so after a refresh the set equals what a fresh [`load`] of the
//! file would produce. [`ScanRegistry::close`] flushes and syncs the append
//! handle.
//!
//! A failed append may leave part of a line on disk. The registry then
//! refuses further records until it is reopened, which starts a fresh line
//! after the fragment.
//!
//! Lines are compared in trimmed form, both when loading and when checking
//! membership. A missing file is an empty registry. An unreadable file (bad
//! permissions, not UTF-8, a directory) is an error, never an empty set.
//!
//! No deduplication happens here. Recording the same payload twice writes two
//! lines; membership is unaffected. Deciding *whether* to record is the job of
//! [`ValidationEngine`](crate::validate::ValidationEngine).

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to append to registry {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Registry {path} shrank from {consumed} to {found} bytes")]
    Shrunk {
        path: PathBuf,
        consumed: u64,
        found: u64,
    },
    #[error("Registry {path} has a failed append; reopen it before recording")]
    Faulted { path: PathBuf },
    #[error("Payload spans multiple lines and cannot be recorded")]
    MultiLine,
}

/// Read every recorded payload from `path`.
///
/// Returns an empty set when the file does not exist.
pub fn load(path: &Path) -> Result<HashSet<String>, RegistryError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(source) => {
            return Err(RegistryError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    Ok(content.lines().map(|l| l.trim().to_string()).collect())
}

/// Open registry: the file path, the loaded set, and a lazily opened
/// append handle.
#[derive(Debug)]
pub struct ScanRegistry {
    path: PathBuf,
    seen: HashSet<String>,
    /// Bytes folded into `seen`. Always at a line boundary.
    consumed: u64,
    /// The file ends in a line with no terminator yet.
    open_tail: bool,
    appender: Option<File>,
    faulted: bool,
}

impl ScanRegistry {
    /// Load the registry at `path`. The file is not created until the first
    /// [`record`](Self::record).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let mut registry = Self {
            path: path.into(),
            seen: HashSet::new(),
            consumed: 0,
            open_tail: false,
            appender: None,
            faulted: false,
        };
        registry.refresh()?;
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, source: io::Error) -> RegistryError {
        RegistryError::Read {
            path: self.path.clone(),
            source,
        }
    }

    fn write_error(&self, source: io::Error) -> RegistryError {
        RegistryError::Write {
            path: self.path.clone(),
            source,
        }
    }

    /// Fold in lines appended to the file since the last read, by this
    /// registry or by any other writer. Returns how many payloads were new.
    pub fn refresh(&mut self) -> Result<usize, RegistryError> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.consumed == 0 => return Ok(0),
            Err(e) => return Err(self.read_error(e)),
        };
        let len = file.metadata().map_err(|e| self.read_error(e))?.len();
        if len < self.consumed {
            return Err(RegistryError::Shrunk {
                path: self.path.clone(),
                consumed: self.consumed,
                found: len,
            });
        }
        if len == self.consumed {
            self.open_tail = false;
            return Ok(0);
        }

        let mut tail = Vec::new();
        file.seek(SeekFrom::Start(self.consumed))
            .and_then(|_| file.read_to_end(&mut tail))
            .map_err(|e| self.read_error(e))?;
        let complete = tail.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let lines = std::str::from_utf8(&tail[..complete])
            .map_err(|e| self.read_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let before = self.seen.len();
        self.seen.extend(lines.lines().map(|l| l.trim().to_string()));
        // The unterminated remainder counts as it stands now and is read
        // again once its writer finishes it.
        if let Ok(fragment) = std::str::from_utf8(&tail[complete..])
            && !fragment.is_empty()
        {
            self.seen.insert(fragment.trim().to_string());
        }
        self.open_tail = complete < tail.len();
        self.consumed += complete as u64;
        Ok(self.seen.len() - before)
    }

    pub fn contains(&self, payload: &str) -> bool {
        self.seen.contains(payload.trim())
    }

    /// Number of distinct recorded payloads.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Recorded payloads, sorted for stable display.
    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.seen.iter().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }

    /// Append `payload` as one new line and sync it to disk.
    ///
    /// The in-memory set is updated once the line is written. A failed
    /// write marks the registry faulted; a failed sync after a complete
    /// write still counts the payload as recorded.
    pub fn record(&mut self, payload: &str) -> Result<(), RegistryError> {
        if payload.contains(['\n', '\r']) {
            return Err(RegistryError::MultiLine);
        }
        if self.faulted {
            return Err(RegistryError::Faulted {
                path: self.path.clone(),
            });
        }
        let mut file = match self.appender.take() {
            Some(file) => file,
            None => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| self.write_error(e))?,
        };
        let line = if self.open_tail {
            format!("\n{payload}\n")
        } else {
            format!("{payload}\n")
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            self.faulted = true;
            return Err(self.write_error(e));
        }
        self.open_tail = false;
        self.seen.insert(payload.trim().to_string());
        let synced = file.sync_data();
        self.appender = Some(file);
        synced.map_err(|e| self.write_error(e))
    }

    /// Flush and release the append handle.
    pub fn close(mut self) -> Result<(), RegistryError> {
        if let Some(mut file) = self.appender.take() {
            file.flush()
                .and_then(|()| file.sync_all())
                .map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry_path(tmp: &TempDir) -> PathBuf {
        tmp.path().join("scan-registry.txt")
    }

    // =========================================================================
    // load
    // =========================================================================

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(load(&registry_path(&tmp)).unwrap().is_empty());
    }

    #[test]
    fn load_empty_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "").unwrap();
        assert!(load(&registry_path(&tmp)).unwrap().is_empty());
    }

    #[test]
    fn load_trims_lines() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "  A \nB\r\n").unwrap();
        let set = load(&registry_path(&tmp)).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("A"));
        assert!(set.contains("B"));
    }

    #[test]
    fn load_tolerates_duplicate_lines() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "A\nA\nB\n").unwrap();
        assert_eq!(load(&registry_path(&tmp)).unwrap().len(), 2);
    }

    #[test]
    fn load_non_utf8_is_read_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), [0xff, 0xfe, 0x00, b'\n']).unwrap();
        assert!(matches!(
            load(&registry_path(&tmp)),
            Err(RegistryError::Read { .. })
        ));
    }

    #[test]
    fn load_directory_is_read_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            load(tmp.path()),
            Err(RegistryError::Read { .. })
        ));
    }

    // =========================================================================
    // open / record / close
    // =========================================================================

    #[test]
    fn open_does_not_create_file() {
        let tmp = TempDir::new().unwrap();
        let reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(reg.is_empty());
        assert!(!registry_path(&tmp).exists());
    }

    #[test]
    fn record_then_load_contains_payload() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record("X").unwrap();

        assert!(reg.contains("X"));
        assert!(load(&registry_path(&tmp)).unwrap().contains("X"));
    }

    #[test]
    fn record_appends_exactly_one_line() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "old\n").unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record("new").unwrap();
        reg.close().unwrap();

        assert_eq!(
            fs::read_to_string(registry_path(&tmp)).unwrap(),
            "old\nnew\n"
        );
    }

    #[test]
    fn record_twice_writes_two_lines_one_member() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record("X").unwrap();
        reg.record("X").unwrap();

        assert_eq!(reg.len(), 1);
        assert!(reg.contains("X"));
        assert_eq!(fs::read_to_string(registry_path(&tmp)).unwrap(), "X\nX\n");
    }

    #[test]
    fn empty_payload_is_a_member_after_record() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(!reg.contains(""));
        reg.record("").unwrap();
        assert!(reg.contains(""));

        let reopened = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(reopened.contains(""));
    }

    #[test]
    fn membership_uses_trimmed_form() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record(" padded ").unwrap();
        assert!(reg.contains("padded"));
        assert!(reg.contains(" padded "));

        let reopened = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(reopened.contains(" padded "));
    }

    #[test]
    fn memory_matches_reload_after_records() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        for p in ["a", "b", "a", " c", "Evento: Persona: Ana López, ID: 42, Correo: ana@x.com"] {
            reg.record(p).unwrap();
        }
        let reloaded = load(&registry_path(&tmp)).unwrap();
        let mut in_memory: Vec<&str> = reg.entries();
        let mut from_disk: Vec<&str> = reloaded.iter().map(String::as_str).collect();
        in_memory.sort_unstable();
        from_disk.sort_unstable();
        assert_eq!(in_memory, from_disk);
    }

    #[test]
    fn multi_line_payload_is_rejected_without_write() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(matches!(reg.record("a\nb"), Err(RegistryError::MultiLine)));
        assert!(matches!(reg.record("a\rb"), Err(RegistryError::MultiLine)));
        assert!(reg.is_empty());
        assert!(!registry_path(&tmp).exists());
    }

    #[test]
    fn record_into_missing_directory_is_write_error() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(tmp.path().join("nope/registry.txt")).unwrap();
        assert!(matches!(
            reg.record("X"),
            Err(RegistryError::Write { .. })
        ));
        assert!(!reg.contains("X"));
    }

    #[test]
    fn failed_append_blocks_further_records() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "old\n").unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        // Read-only handle: every append fails.
        reg.appender = Some(File::open(registry_path(&tmp)).unwrap());

        assert!(matches!(reg.record("X"), Err(RegistryError::Write { .. })));
        assert!(!reg.contains("X"));
        assert!(matches!(reg.record("Y"), Err(RegistryError::Faulted { .. })));
        assert!(!reg.contains("Y"));
        assert_eq!(fs::read_to_string(registry_path(&tmp)).unwrap(), "old\n");
        reg.close().unwrap();

        let mut reopened = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reopened.record("Y").unwrap();
        assert_eq!(
            fs::read_to_string(registry_path(&tmp)).unwrap(),
            "old\nY\n"
        );
    }

    #[test]
    fn record_after_partial_line_starts_a_new_line() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "old\nXpa").unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(reg.contains("Xpa"));

        reg.record("Y").unwrap();

        assert_eq!(
            fs::read_to_string(registry_path(&tmp)).unwrap(),
            "old\nXpa\nY\n"
        );
        let reloaded = load(&registry_path(&tmp)).unwrap();
        assert!(reloaded.contains("Y"));
        assert!(reloaded.contains("Xpa"));
        assert_eq!(reloaded.len(), reg.len());
    }

    // =========================================================================
    // refresh
    // =========================================================================

    #[test]
    fn refresh_sees_appends_from_another_handle() {
        let tmp = TempDir::new().unwrap();
        let mut door = ScanRegistry::open(registry_path(&tmp)).unwrap();
        let mut other = ScanRegistry::open(registry_path(&tmp)).unwrap();
        other.record("T").unwrap();
        other.close().unwrap();

        assert!(!door.contains("T"));
        assert_eq!(door.refresh().unwrap(), 1);
        assert!(door.contains("T"));
        assert_eq!(door.refresh().unwrap(), 0);
    }

    #[test]
    fn refresh_after_own_record_finds_nothing_new() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record("X").unwrap();
        assert_eq!(reg.refresh().unwrap(), 0);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn refresh_rereads_a_line_once_it_is_finished() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), "A\nB").unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert!(reg.contains("A"));

        let mut writer = OpenOptions::new()
            .append(true)
            .open(registry_path(&tmp))
            .unwrap();
        writer.write_all(b"C\n").unwrap();

        reg.refresh().unwrap();
        assert!(reg.contains("BC"));
    }

    #[test]
    fn refresh_of_shrunk_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record("abc").unwrap();
        reg.refresh().unwrap();
        fs::write(registry_path(&tmp), "").unwrap();

        assert!(matches!(reg.refresh(), Err(RegistryError::Shrunk { .. })));
    }

    #[test]
    fn open_non_utf8_is_read_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(registry_path(&tmp), [0xff, 0xfe, 0x00, b'\n']).unwrap();
        assert!(matches!(
            ScanRegistry::open(registry_path(&tmp)),
            Err(RegistryError::Read { .. })
        ));
    }

    #[test]
    fn entries_are_sorted() {
        let tmp = TempDir::new().unwrap();
        let mut reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        reg.record("b").unwrap();
        reg.record("a").unwrap();
        assert_eq!(reg.entries(), vec!["a", "b"]);
    }

    #[test]
    fn close_without_records_is_ok() {
        let tmp = TempDir::new().unwrap();
        let reg = ScanRegistry::open(registry_path(&tmp)).unwrap();
        assert_eq!(reg.path(), registry_path(&tmp));
        reg.close().unwrap();
    }
}
