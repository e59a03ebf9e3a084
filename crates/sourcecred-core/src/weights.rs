//! Weights assigned to address prefixes.
//!
//! A weights map does not name concrete nodes and edges one by one; it
//! assigns multipliers to address prefixes. The effective weight of a node
//! is the product of every entry whose key prefixes its address, so a
//! plugin-wide entry, a type-wide entry, and a node-specific entry compose
//! multiplicatively. An entry at a node's exact address is special: it
//! replaces the prefix product outright.
//!
//! Edge weights are pairs: `forwards` scales flow in the edge's direction,
//! `backwards` against it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::{EdgeAddress, NodeAddress, SEPARATOR};
use crate::errors::CredError;

/// Multiplier applied to a node's intrinsic weight.
pub type NodeWeight = f64;

/// Directional multipliers for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub forwards: f64,
    pub backwards: f64,
}

impl Default for EdgeWeight {
    fn default() -> Self {
        EdgeWeight {
            forwards: 1.0,
            backwards: 1.0,
        }
    }
}

/// Weight assignments keyed by address prefix.
///
/// `BTreeMap` keeps the entries address-ordered, so serialization and
/// iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weights {
    pub node_weights: BTreeMap<NodeAddress, NodeWeight>,
    pub edge_weights: BTreeMap<EdgeAddress, EdgeWeight>,
}

/// Proper prefixes of a raw joined address, shortest first. The full
/// address itself is not yielded.
fn proper_prefixes(raw: &str) -> impl Iterator<Item = &str> + '_ {
    let boundaries = raw
        .char_indices()
        .filter(|(_, c)| *c == SEPARATOR)
        .map(|(i, _)| i);
    std::iter::once("").chain(boundaries.map(move |i| &raw[..i]))
}

impl Weights {
    pub fn new() -> Self {
        Weights::default()
    }

    pub fn set_node_weight(&mut self, address: NodeAddress, weight: NodeWeight) {
        self.node_weights.insert(address, weight);
    }

    pub fn set_edge_weight(&mut self, address: EdgeAddress, weight: EdgeWeight) {
        self.edge_weights.insert(address, weight);
    }

    /// Effective weight for a node: the entry at the exact address if one
    /// exists, otherwise the product of all matching prefix entries
    /// (1 when nothing matches).
    pub fn node_weight(&self, address: &NodeAddress) -> NodeWeight {
        if let Some(&weight) = self.node_weights.get(address.raw()) {
            return weight;
        }
        let mut weight = 1.0;
        for prefix in proper_prefixes(address.raw()) {
            if let Some(&w) = self.node_weights.get(prefix) {
                weight *= w;
            }
        }
        weight
    }

    /// Effective weight for an edge, composed the same way as
    /// [`Weights::node_weight`] but componentwise on the pair.
    pub fn edge_weight(&self, address: &EdgeAddress) -> EdgeWeight {
        if let Some(&weight) = self.edge_weights.get(address.raw()) {
            return weight;
        }
        let mut weight = EdgeWeight::default();
        for prefix in proper_prefixes(address.raw()) {
            if let Some(w) = self.edge_weights.get(prefix) {
                weight.forwards *= w.forwards;
                weight.backwards *= w.backwards;
            }
        }
        weight
    }

    /// Pointwise union of several weight maps. When the same key appears
    /// more than once, the later entry wins.
    pub fn merge<'a, I>(all: I) -> Weights
    where
        I: IntoIterator<Item = &'a Weights>,
    {
        let mut result = Weights::new();
        for weights in all {
            for (address, weight) in &weights.node_weights {
                result.node_weights.insert(address.clone(), *weight);
            }
            for (address, weight) in &weights.edge_weights {
                result.edge_weights.insert(address.clone(), *weight);
            }
        }
        result
    }

    /// Checks that every entry is finite and non-negative.
    pub fn validate(&self) -> Result<(), CredError> {
        for (address, weight) in &self.node_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(CredError::InvalidWeight(format!(
                    "node weight {weight} at {address}"
                )));
            }
        }
        for (address, weight) in &self.edge_weights {
            for (label, value) in [("forwards", weight.forwards), ("backwards", weight.backwards)]
            {
                if !value.is_finite() || value < 0.0 {
                    return Err(CredError::InvalidWeight(format!(
                        "{label} edge weight {value} at {address}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Converts to the serialized form, with addresses as raw string keys.
    pub fn to_payload(&self) -> WeightsPayload {
        WeightsPayload {
            node_weights: self
                .node_weights
                .iter()
                .map(|(a, w)| (a.raw().to_string(), *w))
                .collect(),
            edge_weights: self
                .edge_weights
                .iter()
                .map(|(a, w)| (a.raw().to_string(), *w))
                .collect(),
        }
    }

    /// Parses and validates the serialized form.
    pub fn from_payload(payload: WeightsPayload) -> Result<Weights, CredError> {
        let mut weights = Weights::new();
        for (raw, weight) in payload.node_weights {
            weights
                .node_weights
                .insert(NodeAddress::from_raw(&raw)?, weight);
        }
        for (raw, weight) in payload.edge_weights {
            weights
                .edge_weights
                .insert(EdgeAddress::from_raw(&raw)?, weight);
        }
        weights.validate()?;
        Ok(weights)
    }
}

/// Serialized form of [`Weights`]. Keys are the separator-joined raw
/// addresses; JSON escapes the separator byte as `\u0000`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightsPayload {
    pub node_weights: BTreeMap<String, f64>,
    pub edge_weights: BTreeMap<String, EdgeWeight>,
}
