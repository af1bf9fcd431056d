//! Credential issuing: attendee data in, code image on disk out.
//!
//! ## Flow
//!
//! ```text
//! Attendee ──validate──▶ payload ──render──▶ <artifacts_dir>/<name>_qr_code.<ext>
//! ```
//!
//! Validation happens first. An attendee with a missing field is rejected
//! before the artifact directory is even created, so a refused request
//! leaves no trace on disk. Issuing never touches the scan registry.
//!
//! ## Batches
//!
//! [`issue_batch`] issues a whole roster in parallel with
//! [rayon](https://docs.rs/rayon). Each entry succeeds or fails on its own;
//! one bad row does not stop the rest. Entries whose names sanitize to the
//! same filename would overwrite each other, so only the first such entry is
//! issued and later ones fail with [`IssueError::ArtifactClash`].
//!
//! ## Roster format
//!
//! ```toml
//! [[attendee]]
//! name = "Ana López"
//! id = "42"
//! email = "ana@x.com"
//! ```

use crate::config::Config;
use crate::credential::{Attendee, CredentialError, build_payload};
use crate::imaging::{
    Artifact, ArtifactFormat, BackendError, CodeBackend, QrBackend, RenderParams, render_to_file,
};
use crate::naming::artifact_filename;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IssueError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("Rendering failed: {0}")]
    Render(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Roster parse error: {0}")]
    Roster(#[from] toml::de::Error),
    #[error("Artifact {path} is already claimed by roster entry {first}")]
    ArtifactClash { path: PathBuf, first: usize },
}

/// Settings for issuing, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct IssueConfig {
    pub artifacts_dir: PathBuf,
    pub params: RenderParams,
    pub format: ArtifactFormat,
}

impl IssueConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            artifacts_dir: config.storage.artifacts_dir.clone(),
            params: config.render.params(),
            format: config.render.format,
        }
    }

    /// Where the artifact for `attendee` is written.
    pub fn artifact_path(&self, attendee: &Attendee) -> PathBuf {
        self.artifacts_dir
            .join(artifact_filename(&attendee.name, self.format.extension()))
    }
}

/// A credential that has been issued and written to disk.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub attendee: Attendee,
    pub payload: String,
    pub artifact: Artifact,
}

/// Issue one credential with the production QR backend.
pub fn issue(attendee: &Attendee, config: &IssueConfig) -> Result<IssuedCredential, IssueError> {
    issue_with_backend(&QrBackend::new(), attendee, config)
}

/// Issue one credential using a specific backend (allows testing with mock).
pub fn issue_with_backend(
    backend: &impl CodeBackend,
    attendee: &Attendee,
    config: &IssueConfig,
) -> Result<IssuedCredential, IssueError> {
    attendee.validate()?;
    let payload = build_payload(attendee);
    std::fs::create_dir_all(&config.artifacts_dir)?;
    let artifact = render_to_file(
        backend,
        &payload,
        &config.params,
        config.format,
        &config.artifact_path(attendee),
    )?;
    Ok(IssuedCredential {
        attendee: attendee.clone(),
        payload,
        artifact,
    })
}

// ============================================================================
// Batch issuing
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Roster {
    #[serde(default)]
    attendee: Vec<Attendee>,
}

/// Parse a TOML roster of `[[attendee]]` tables.
pub fn parse_roster(content: &str) -> Result<Vec<Attendee>, IssueError> {
    let roster: Roster = toml::from_str(content)?;
    Ok(roster.attendee)
}

/// Read and parse a roster file.
pub fn load_roster(path: &Path) -> Result<Vec<Attendee>, IssueError> {
    let content = std::fs::read_to_string(path)?;
    parse_roster(&content)
}

/// Progress event emitted once per roster entry, in completion order.
#[derive(Debug, Clone)]
pub enum IssueEvent {
    Issued {
        /// 1-based roster position.
        index: usize,
        name: String,
        path: PathBuf,
    },
    Failed {
        index: usize,
        name: String,
        reason: String,
    },
}

/// A roster entry that could not be issued.
#[derive(Debug)]
pub struct BatchFailure {
    /// 1-based roster position.
    pub index: usize,
    pub attendee: Attendee,
    pub error: IssueError,
}

/// Outcome of a batch, both lists in roster order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub issued: Vec<IssuedCredential>,
    pub failures: Vec<BatchFailure>,
}

/// Issue every attendee with the production QR backend.
pub fn issue_batch(
    attendees: &[Attendee],
    config: &IssueConfig,
    events: Option<Sender<IssueEvent>>,
) -> BatchReport {
    issue_batch_with_backend(&QrBackend::new(), attendees, config, events)
}

/// For each attendee, the 1-based index of an earlier entry that already
/// claimed the same artifact path.
fn find_clashes(attendees: &[Attendee], config: &IssueConfig) -> Vec<Option<usize>> {
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    attendees
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let path = config.artifact_path(a);
            match claimed.get(&path) {
                Some(first) => Some(*first),
                None => {
                    claimed.insert(path, i + 1);
                    None
                }
            }
        })
        .collect()
}

/// Issue a batch using a specific backend (allows testing with mock).
pub fn issue_batch_with_backend(
    backend: &impl CodeBackend,
    attendees: &[Attendee],
    config: &IssueConfig,
    events: Option<Sender<IssueEvent>>,
) -> BatchReport {
    let clashes = find_clashes(attendees, config);

    let results: Vec<(usize, Result<IssuedCredential, IssueError>)> = attendees
        .par_iter()
        .zip(clashes.par_iter())
        .enumerate()
        .map(|(i, (attendee, clash))| {
            let index = i + 1;
            let result = match clash {
                Some(first) => Err(IssueError::ArtifactClash {
                    path: config.artifact_path(attendee),
                    first: *first,
                }),
                None => issue_with_backend(backend, attendee, config),
            };
            if let Some(tx) = &events {
                let event = match &result {
                    Ok(issued) => IssueEvent::Issued {
                        index,
                        name: attendee.name.clone(),
                        path: issued.artifact.path.clone(),
                    },
                    Err(e) => IssueEvent::Failed {
                        index,
                        name: attendee.name.clone(),
                        reason: e.to_string(),
                    },
                };
                // Printer may have gone away; the report still carries everything.
                let _ = tx.send(event);
            }
            (index, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for ((index, result), attendee) in results.into_iter().zip(attendees) {
        match result {
            Ok(issued) => report.issued.push(issued),
            Err(error) => report.failures.push(BatchFailure {
                index,
                attendee: attendee.clone(),
                error,
            }),
        }
    }
    report
}
