//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Issued Ana López
//!     Payload: Evento: Persona: Ana López, ID: 42, Correo: ana@x.com
//!     Artifact: assets/Ana_López_qr_code.png (290x290)
//! ```
//!
//! ## Issue batch
//!
//! ```text
//! 001 Ana López → assets/Ana_López_qr_code.png
//! 002 Bea: FAILED (Missing attendee field: email)
//!
//! Issued 1 of 2 credentials
//! ```
//!
//! ## Scan
//!
//! ```text
//! 001 door-cam-0001.png (1 code)
//!     VALID Evento: Persona: Ana López, ID: 42, Correo: ana@x.com
//!         At: (40,40) (250,40) (250,250) (40,250)
//! 002 door-cam-0002.png (1 code, 1 unreadable)
//!     ALREADY SCANNED Evento: Persona: Ana López, ID: 42, Correo: ana@x.com
//!         At: (41,40) (251,40) (251,250) (41,250)
//!
//! 2 frames: 1 admitted, 1 duplicate, 1 unreadable
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and, where the binary needs it, a `print_*` wrapper that
//! writes to stdout. Format functions are pure.

use crate::imaging::Point;
use crate::issue::{BatchReport, IssueEvent, IssuedCredential};
use crate::scan::{ScanEvent, ScanSummary};
use crate::validate::Verdict;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn verdict_label(verdict: Verdict) -> String {
    verdict.to_string().to_uppercase()
}

fn format_bounds(bounds: &[Point; 4]) -> String {
    bounds
        .iter()
        .map(|p| format!("({},{})", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Issuing
// ============================================================================

pub fn format_issued(issued: &IssuedCredential) -> Vec<String> {
    vec![
        format!("Issued {}", issued.attendee.name),
        format!("{}Payload: {}", indent(1), issued.payload),
        format!(
            "{}Artifact: {} ({}x{})",
            indent(1),
            issued.artifact.path.display(),
            issued.artifact.width,
            issued.artifact.height
        ),
    ]
}

pub fn print_issued(issued: &IssuedCredential) {
    for line in format_issued(issued) {
        println!("{}", line);
    }
}

pub fn format_issue_event(event: &IssueEvent) -> Vec<String> {
    match event {
        IssueEvent::Issued { index, name, path } => vec![format!(
            "{} {} → {}",
            format_index(*index),
            name,
            path.display()
        )],
        IssueEvent::Failed {
            index,
            name,
            reason,
        } => vec![format!(
            "{} {}: FAILED ({})",
            format_index(*index),
            name,
            reason
        )],
    }
}

pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let total = report.issued.len() + report.failures.len();
    vec![
        String::new(),
        format!(
            "Issued {} of {}",
            report.issued.len(),
            plural(total, "credential", "credentials")
        ),
    ]
}

pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Scanning
// ============================================================================

pub fn format_scan_event(event: &ScanEvent) -> Vec<String> {
    match event {
        ScanEvent::Frame {
            index,
            label,
            codes,
            unreadable,
        } => {
            let mut detail = plural(*codes, "code", "codes");
            if *unreadable > 0 {
                detail.push_str(&format!(", {} unreadable", unreadable));
            }
            vec![format!("{} {} ({})", format_index(*index), label, detail)]
        }
        ScanEvent::Validated {
            payload,
            bounds,
            verdict,
            ..
        } => vec![
            format!("{}{} {}", indent(1), verdict_label(*verdict), payload),
            format!("{}At: {}", indent(2), format_bounds(bounds)),
        ],
    }
}

pub fn format_scan_summary(summary: &ScanSummary) -> Vec<String> {
    let mut line = format!(
        "{}: {} admitted, {}",
        plural(summary.frames, "frame", "frames"),
        summary.first_use,
        plural(summary.duplicates, "duplicate", "duplicates"),
    );
    if summary.unreadable > 0 {
        line.push_str(&format!(", {} unreadable", summary.unreadable));
    }
    let mut lines = vec![String::new(), line];
    if summary.stopped {
        lines.push("Stopped by operator".to_string());
    }
    lines
}

pub fn print_scan_summary(summary: &ScanSummary) {
    for line in format_scan_summary(summary) {
        println!("{}", line);
    }
}

/// Result of a single `check` against the registry.
pub fn format_check(payload: &str, verdict: Verdict) -> Vec<String> {
    vec![format!("{} {}", verdict_label(verdict), payload)]
}

// ============================================================================
// Registry listing
// ============================================================================

pub fn format_registry(path: &Path, entries: &[&str]) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        path.display(),
        plural(entries.len(), "entry", "entries")
    )];
    lines.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}{} {}", indent(1), format_index(i + 1), e)),
    );
    lines
}
