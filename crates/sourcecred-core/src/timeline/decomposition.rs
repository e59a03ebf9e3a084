//! Decomposes a stationary distribution into per-connection flows.
//!
//! For every node, the score received through each adjacent edge (and the
//! synthetic self-loop) is reconstructed from the same transition
//! probabilities the chain was built with. Under a zero teleport
//! probability the connection scores of a node sum back to its score;
//! teleportation injects mass the connections cannot account for.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::address::{EdgeAddress, NodeAddress};
use crate::errors::CredError;
use crate::markov::process::{
    resolve_edge_masses, resolve_node_masses, source_masses, NodeIndex,
};
use crate::weighted_graph::WeightedGraph;

/// How a connection reaches its target node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "edge", rename_all = "camelCase")]
pub enum Adjacency {
    /// The node's own synthetic self-loop.
    SyntheticLoop,
    /// An edge pointing at the target; score flows along its forward weight.
    InEdge(EdgeAddress),
    /// An edge pointing away from the target; score flows back along its
    /// backward weight.
    OutEdge(EdgeAddress),
}

/// One inbound flow of score into a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredConnection {
    pub adjacency: Adjacency,
    /// The node the score flows from.
    pub source: NodeAddress,
    /// Transition probability from the source into the target.
    pub connection_weight: f64,
    /// Score transferred: the source's score times the connection weight.
    pub connection_score: f64,
}

/// A node's score and the connections that produced it, largest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDecomposition {
    pub score: f64,
    pub scored_connections: Vec<ScoredConnection>,
}

fn adjacency_hash(connection: &ScoredConnection) -> u64 {
    let mut hasher = FxHasher::default();
    match &connection.adjacency {
        Adjacency::SyntheticLoop => connection.source.hash(&mut hasher),
        Adjacency::InEdge(edge) | Adjacency::OutEdge(edge) => edge.hash(&mut hasher),
    }
    hasher.finish()
}

/// Orders connections by descending score, breaking ties by a hash of the
/// edge address (the loop hashes its node address) so equal-scored
/// connections land in a stable order unrelated to insertion.
fn connection_order(a: &ScoredConnection, b: &ScoredConnection) -> std::cmp::Ordering {
    b.connection_score
        .total_cmp(&a.connection_score)
        .then_with(|| adjacency_hash(a).cmp(&adjacency_hash(b)))
}

/// Decomposes one interval's stationary distribution over the graph it was
/// computed from. `pi` must be indexed by `index`'s numbering.
pub fn decompose(
    wg: &WeightedGraph,
    index: &NodeIndex,
    pi: &[f64],
) -> Result<BTreeMap<NodeAddress, NodeDecomposition>, CredError> {
    if pi.len() != index.len() {
        return Err(CredError::Internal(
            "decompose: distribution does not match node numbering".into(),
        ));
    }
    let node_masses = resolve_node_masses(wg, index)?;
    let edge_masses = resolve_edge_masses(wg, index)?;
    let out_masses = source_masses(&node_masses, &edge_masses);

    // Probability of moving from `source`, given `mass` of the transition.
    // A zero total implies every mass at that source is zero too.
    let transition = |source: u32, mass: f64| -> f64 {
        let total = out_masses[source as usize];
        if total > 0.0 {
            mass / total
        } else {
            0.0
        }
    };

    let mut connections: Vec<Vec<ScoredConnection>> = (0..index.len())
        .map(|target| {
            // The synthetic loop is always reported, even at zero weight.
            let t = target as u32;
            let weight = if out_masses[target] > 0.0 {
                node_masses[target] / out_masses[target]
            } else {
                // A zero-mass source is absorbing, so all its score
                // self-recirculates.
                1.0
            };
            vec![ScoredConnection {
                adjacency: Adjacency::SyntheticLoop,
                source: index.address(t).clone(),
                connection_weight: weight,
                connection_score: pi[target] * weight,
            }]
        })
        .collect();

    for (position, edge) in wg.graph.edges().enumerate() {
        let mass = edge_masses[position];
        // Forward mass flows src -> dst, backward mass flows dst -> src.
        let forward_weight = transition(mass.src, mass.forwards);
        connections[mass.dst as usize].push(ScoredConnection {
            adjacency: Adjacency::InEdge(edge.address.clone()),
            source: index.address(mass.src).clone(),
            connection_weight: forward_weight,
            connection_score: pi[mass.src as usize] * forward_weight,
        });
        let backward_weight = transition(mass.dst, mass.backwards);
        connections[mass.src as usize].push(ScoredConnection {
            adjacency: Adjacency::OutEdge(edge.address.clone()),
            source: index.address(mass.dst).clone(),
            connection_weight: backward_weight,
            connection_score: pi[mass.dst as usize] * backward_weight,
        });
    }

    let mut decompositions = BTreeMap::new();
    for (target, mut list) in connections.into_iter().enumerate() {
        list.sort_by(connection_order);
        decompositions.insert(
            index.address(target as u32).clone(),
            NodeDecomposition {
                score: pi[target],
                scored_connections: list,
            },
        );
    }
    Ok(decompositions)
}
