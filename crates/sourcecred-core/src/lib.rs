//! # SourceCred Core
//!
//! Core engine for computing cred scores over contribution graphs.

pub mod address;
pub mod compat;
pub mod declaration;
pub mod errors;
pub mod graph;
pub mod markov;
pub mod timeline;
pub mod weighted_graph;
pub mod weights;

// Re-export commonly used types
pub use address::{EdgeAddress, NodeAddress};
pub use errors::CredError;
pub use graph::{Direction, Edge, Graph, Node};
pub use timeline::cred::{compute_cred, CredConfig, CredResult};
pub use weighted_graph::WeightedGraph;
pub use weights::{EdgeWeight, Weights};

/// Parse a weighted graph from its serialized envelope form.
///
/// This is a convenience function that combines deserialization and
/// envelope validation, converting the JSON error to a core error.
pub fn parse_weighted_graph(source: &str) -> Result<WeightedGraph, CredError> {
    let json: weighted_graph::WeightedGraphJson = serde_json::from_str(source)?;
    WeightedGraph::from_json(json)
}
