//! Error types for graph construction, serialization, and cred computation.

use thiserror::Error;

impl From<serde_json::Error> for CredError {
    fn from(err: serde_json::Error) -> Self {
        CredError::Parse(err.to_string())
    }
}

/// Errors raised while building graphs, translating them into Markov chains,
/// or running the cred pipeline.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Every variant maps to a stable machine-readable tag via [`CredError::kind`],
/// so callers can branch on failures without string-matching the display text.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CredError {
    /// Syntax error while reading a serialized document.
    #[error("parse error: {0}")]
    Parse(String),

    /// Malformed address: empty part list, empty part, or a part containing
    /// the separator byte.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A weight was negative, NaN, or infinite.
    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    /// A configuration or solver option was out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An operation referenced a node address not present in the graph.
    #[error("no node registered at {0}")]
    MissingNode(String),

    /// An operation referenced an edge address not present in the graph.
    #[error("no edge registered at {0}")]
    MissingEdge(String),

    /// A node removal was refused because edges still reference it.
    #[error("node still referenced by edges: {0}")]
    NodeInUse(String),

    /// Two distinct records were inserted at the same address.
    #[error("address collision: {0}")]
    AddressCollision(String),

    /// Merge inputs carried conflicting records at the same address.
    #[error("merge conflict: {0}")]
    MergeConflict(String),

    /// A node contraction produced colliding addresses or records.
    #[error("contraction collision: {0}")]
    ContractionCollision(String),

    /// An edge record without a timestamp was deserialized.
    #[error("edge is missing a timestamp: {0}")]
    MissingTimestamp(String),

    /// The stationary solver hit its iteration cap before converging.
    #[error("solver failed to converge after {iterations} iterations (delta = {delta:e})")]
    Diverged { iterations: u32, delta: f64 },

    /// The stationary solver detected a non-converging oscillation.
    #[error("solver is oscillating after {iterations} iterations (delta = {delta:e})")]
    Oscillating { iterations: u32, delta: f64 },

    /// A serialized envelope carried an unexpected `type` field.
    #[error("incompatible type: expected {expected:?}, found {found:?}")]
    IncompatibleType { expected: String, found: String },

    /// A serialized envelope carried an incompatible version.
    #[error("incompatible version: expected major {expected}, found {found:?}")]
    IncompatibleVersion { expected: String, found: String },

    /// A long-running computation observed its cancellation token.
    #[error("computation cancelled")]
    Cancelled,

    /// Internal invariant violation (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CredError {
    /// Stable tag identifying the failure class. Unlike the display text,
    /// these strings never change across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            CredError::Parse(_) => "parse",
            CredError::InvalidAddress(_) => "invalid-address",
            CredError::InvalidWeight(_) => "invalid-weight",
            CredError::InvalidConfig(_) => "invalid-config",
            CredError::MissingNode(_) => "missing-node",
            CredError::MissingEdge(_) => "missing-edge",
            CredError::NodeInUse(_) => "node-in-use",
            CredError::AddressCollision(_) => "address-collision",
            CredError::MergeConflict(_) => "merge-conflict",
            CredError::ContractionCollision(_) => "contraction-collision",
            CredError::MissingTimestamp(_) => "missing-timestamp",
            CredError::Diverged { .. } => "diverged",
            CredError::Oscillating { .. } => "oscillating",
            CredError::IncompatibleType { .. } => "incompatible-type",
            CredError::IncompatibleVersion { .. } => "incompatible-version",
            CredError::Cancelled => "cancelled",
            CredError::Internal(_) => "internal",
        }
    }
}
