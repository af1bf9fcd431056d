//! # gatepass
//!
//! Issue event-entry credentials as QR codes, then admit each one exactly
//! once at the door.
//!
//! # Lifecycle
//!
//! ```text
//! 1. Issue     Attendee  →  payload  →  assets/<name>_qr_code.png
//! 2. Scan      frame     →  payload(s)
//! 3. Validate  payload   →  FIRST_USE (recorded) | DUPLICATE
//! ```
//!
//! A credential *is* its payload string. There is no ticket number, no
//! database row, no signature: the registry of admitted payloads is the only
//! state, and it only ever grows.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Filename sanitizer and artifact filename derivation |
//! | [`credential`] | `Attendee`, field validation, payload template |
//! | [`imaging`] | QR rendering and frame decoding behind the `CodeBackend` trait |
//! | [`issue`] | Single and batch issuing to the artifacts directory |
//! | [`registry`] | Append-only file of admitted payloads |
//! | [`validate`] | The first-use / duplicate decision |
//! | [`scan`] | Frame producer → decode → validate loop |
//! | [`config`] | `gatepass.toml` loading, validation, stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Plain-Text Registry
//!
//! The registry is one payload per line, appended and synced on every
//! admission. It can be inspected with `cat`, backed up with `cp`, and
//! survives a crash losing at most the line in flight. Nothing is ever
//! rewritten in place.
//!
//! ## One Lock Around Check-and-Record
//!
//! [`validate::ValidationEngine`] holds the registry behind a mutex so the
//! membership check and the append are a single step. Within one process,
//! a credential can never be admitted twice, no matter how many threads
//! feed it payloads. Before each check the engine reads whatever other
//! processes appended to the same file since its last look.
//!
//! ## Capture Decoupled From Decisions
//!
//! [`scan::run_scan`] reads frames on a producer thread and validates on the
//! caller's thread. Capture devices plug in through [`scan::FrameSource`];
//! tests drive the loop with scripted frames and a mock decoder.

pub mod config;
pub mod credential;
pub mod imaging;
pub mod issue;
pub mod naming;
pub mod output;
pub mod registry;
pub mod scan;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
