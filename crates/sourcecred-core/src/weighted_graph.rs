//! A graph bundled with the weights used to evaluate it.
//!
//! The pair travels together through the whole pipeline: plugins produce
//! weighted graphs, users layer overrides on top, and the Markov translation
//! consumes the result.

use serde::{Deserialize, Serialize};

use crate::compat::{Envelope, WEIGHTED_GRAPH_TYPE};
use crate::errors::CredError;
use crate::graph::{Graph, GraphPayload, NodeContraction};
use crate::weights::{Weights, WeightsPayload};

/// A graph and its weights.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedGraph {
    pub graph: Graph,
    pub weights: Weights,
}

impl WeightedGraph {
    /// Bundles a graph with weights, validating the weights.
    pub fn new(graph: Graph, weights: Weights) -> Result<WeightedGraph, CredError> {
        weights.validate()?;
        Ok(WeightedGraph { graph, weights })
    }

    /// Merges several weighted graphs: graphs by set union, weights
    /// pointwise with later entries winning.
    pub fn merge<'a, I>(all: I) -> Result<WeightedGraph, CredError>
    where
        I: IntoIterator<Item = &'a WeightedGraph>,
    {
        let all: Vec<&WeightedGraph> = all.into_iter().collect();
        let graph = Graph::merge(all.iter().map(|wg| &wg.graph))?;
        let weights = Weights::merge(all.iter().map(|wg| &wg.weights));
        Ok(WeightedGraph { graph, weights })
    }

    /// Returns a copy whose weights have `overrides` layered on top. Keys
    /// present in the overrides replace the originals; everything else is
    /// kept.
    pub fn override_weights(&self, overrides: &Weights) -> Result<WeightedGraph, CredError> {
        let weights = Weights::merge([&self.weights, overrides]);
        WeightedGraph::new(self.graph.clone(), weights)
    }

    /// Contracts identity nodes, keeping the weights unchanged.
    ///
    /// Fails with [`CredError::ContractionCollision`] when a contracted
    /// address carries an explicit node-weight entry, since silently
    /// dropping or rebinding that entry would change scores in a way the
    /// caller never asked for.
    pub fn contract_identities(
        &self,
        contractions: &[NodeContraction],
    ) -> Result<WeightedGraph, CredError> {
        for contraction in contractions {
            for old in &contraction.old {
                if self.weights.node_weights.contains_key(old) {
                    return Err(CredError::ContractionCollision(format!(
                        "explicit weight entry at contracted address {old}"
                    )));
                }
            }
        }
        let graph = self.graph.contract_nodes(contractions)?;
        Ok(WeightedGraph {
            graph,
            weights: self.weights.clone(),
        })
    }

    /// Serializes into a versioned envelope.
    pub fn to_json(&self) -> WeightedGraphJson {
        Envelope::new(
            WEIGHTED_GRAPH_TYPE,
            WeightedGraphPayload {
                graph: self.graph.to_json().payload,
                weights: self.weights.to_payload(),
            },
        )
    }

    /// Deserializes from a versioned envelope, re-validating graph records
    /// and weights.
    pub fn from_json(json: WeightedGraphJson) -> Result<WeightedGraph, CredError> {
        let payload = json.open(WEIGHTED_GRAPH_TYPE)?;
        let graph = Graph::from_payload(payload.graph)?;
        let weights = Weights::from_payload(payload.weights)?;
        Ok(WeightedGraph { graph, weights })
    }
}

/// Payload of a serialized weighted graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedGraphPayload {
    pub graph: GraphPayload,
    pub weights: WeightsPayload,
}

/// A weighted graph wrapped in its versioned envelope.
pub type WeightedGraphJson = Envelope<WeightedGraphPayload>;
