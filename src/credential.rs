//! Attendee data and the credential payload built from it.
//!
//! A credential has no identity besides its payload: the exact string
//! produced by [`build_payload`]. Two attendees with identical fields get the
//! same payload, and therefore the same credential.
//!
//! ```text
//! Evento: Persona: {name}, ID: {id}, Correo: {email}
//! ```
//!
//! Fields are substituted verbatim. Nothing is escaped, so a name containing
//! `", ID:"` yields a payload that cannot be split back into fields reliably.
//! The payload is treated as an opaque key and never parsed, which keeps that
//! ambiguity harmless.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// One of the three required attendee fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Id,
    Email,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name => f.write_str("name"),
            Field::Id => f.write_str("id"),
            Field::Email => f.write_str("email"),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Missing attendee field: {0}")]
    MissingField(Field),
}

/// Person a credential is issued to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Attendee {
    pub name: String,
    pub id: String,
    pub email: String,
}

impl Attendee {
    pub fn new(name: impl Into<String>, id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            email: email.into(),
        }
    }

    /// Check that every field is non-empty after trimming.
    ///
    /// Reports the first missing field in `name`, `id`, `email` order.
    pub fn validate(&self) -> Result<(), CredentialError> {
        for (field, value) in [
            (Field::Name, &self.name),
            (Field::Id, &self.id),
            (Field::Email, &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// Build the canonical payload for an attendee.
///
/// Pure and deterministic. Callers are expected to have run
/// [`Attendee::validate`] first.
pub fn build_payload(attendee: &Attendee) -> String {
    format!(
        "Evento: Persona: {}, ID: {}, Correo: {}",
        attendee.name, attendee.id, attendee.email
    )
}
