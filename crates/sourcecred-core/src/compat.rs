//! Versioned JSON envelopes.
//!
//! Every serialized artifact is wrapped as `{"type", "version", "payload"}`.
//! The `type` string identifies the payload shape (for example
//! `"sourcecred/graph"`) and must match exactly. Versions are semver-ish
//! strings compared on their major component: any same-major version is
//! accepted, anything else is rejected with [`CredError::IncompatibleVersion`].

use serde::{Deserialize, Serialize};

use crate::errors::CredError;

/// Version written into every envelope produced by this crate.
pub const FORMAT_VERSION: &str = "0.1.0";

/// Envelope `type` for serialized graphs.
pub const GRAPH_TYPE: &str = "sourcecred/graph";
/// Envelope `type` for serialized weighted graphs.
pub const WEIGHTED_GRAPH_TYPE: &str = "sourcecred/weightedGraph";
/// Envelope `type` for serialized cred results.
pub const CRED_RESULT_TYPE: &str = "sourcecred/credResult";

/// A versioned wrapper around a serializable payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Wraps a payload under the given type string at [`FORMAT_VERSION`].
    pub fn new(kind: &str, payload: T) -> Self {
        Envelope {
            kind: kind.to_string(),
            version: FORMAT_VERSION.to_string(),
            payload,
        }
    }

    /// Checks the type string and version, then yields the payload.
    pub fn open(self, expected_kind: &str) -> Result<T, CredError> {
        if self.kind != expected_kind {
            return Err(CredError::IncompatibleType {
                expected: expected_kind.to_string(),
                found: self.kind,
            });
        }
        check_version(&self.version)?;
        Ok(self.payload)
    }
}

fn expected_major() -> &'static str {
    match FORMAT_VERSION.split('.').next() {
        Some(m) => m,
        None => FORMAT_VERSION,
    }
}

fn check_version(found: &str) -> Result<(), CredError> {
    let major = found.split('.').next().unwrap_or("");
    let well_formed = !major.is_empty() && major.bytes().all(|b| b.is_ascii_digit());
    if well_formed && major == expected_major() {
        Ok(())
    } else {
        Err(CredError::IncompatibleVersion {
            expected: expected_major().to_string(),
            found: found.to_string(),
        })
    }
}
