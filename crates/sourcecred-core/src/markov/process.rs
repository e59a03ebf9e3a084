//! Translation from a weighted graph into a Markov chain.
//!
//! Every node receives a synthetic self-loop carrying its own weight, so no
//! node has zero outgoing mass while it has weight. Each edge contributes
//! its `forwards` weight as a transition from `src` to `dst` and its
//! `backwards` weight as a transition from `dst` to `src`. Outgoing masses
//! are then normalized per source; a source with zero total mass becomes
//! absorbing (a self-loop with probability 1).
//!
//! The node numbering follows graph insertion order, so repeated
//! translations of equal graphs produce identical chains.

use rustc_hash::FxHashMap;

use crate::address::NodeAddress;
use crate::errors::CredError;
use crate::graph::Graph;
use crate::markov::chain::SparseMarkovChain;
use crate::markov::distribution::{weighted_distribution, Distribution};
use crate::weighted_graph::WeightedGraph;

/// Dense numbering of a graph's nodes in insertion order.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    order: Vec<NodeAddress>,
    lookup: FxHashMap<NodeAddress, u32>,
}

impl NodeIndex {
    pub fn from_graph(graph: &Graph) -> NodeIndex {
        let order: Vec<NodeAddress> = graph.nodes().map(|n| n.address.clone()).collect();
        let lookup = order
            .iter()
            .enumerate()
            .map(|(i, a)| (a.clone(), i as u32))
            .collect();
        NodeIndex { order, lookup }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The address numbered `index`.
    pub fn address(&self, index: u32) -> &NodeAddress {
        &self.order[index as usize]
    }

    pub fn index_of(&self, address: &NodeAddress) -> Option<u32> {
        self.lookup.get(address).copied()
    }

    /// Addresses in numbering order.
    pub fn addresses(&self) -> impl Iterator<Item = &NodeAddress> + '_ {
        self.order.iter()
    }
}

/// Resolved transition mass contributed by one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeMass {
    pub src: u32,
    pub dst: u32,
    pub forwards: f64,
    pub backwards: f64,
    pub timestamp_ms: i64,
}

/// A chain plus the node numbering and seed it was built with.
#[derive(Debug, Clone)]
pub struct OrderedSparseMarkovChain {
    pub index: NodeIndex,
    pub chain: SparseMarkovChain,
    pub seed: Distribution,
}

/// Resolves every node's effective weight, in numbering order.
pub fn resolve_node_masses(
    wg: &WeightedGraph,
    index: &NodeIndex,
) -> Result<Vec<f64>, CredError> {
    let mut masses = Vec::with_capacity(index.len());
    for address in index.addresses() {
        let mass = wg.weights.node_weight(address);
        if !mass.is_finite() {
            return Err(CredError::InvalidWeight(format!(
                "node weight product at {address} is {mass}"
            )));
        }
        masses.push(mass);
    }
    Ok(masses)
}

/// Resolves every edge's effective weight pair, in edge insertion order.
pub fn resolve_edge_masses(
    wg: &WeightedGraph,
    index: &NodeIndex,
) -> Result<Vec<EdgeMass>, CredError> {
    let mut masses = Vec::with_capacity(wg.graph.edge_count());
    for edge in wg.graph.edges() {
        let weight = wg.weights.edge_weight(&edge.address);
        if !weight.forwards.is_finite() || !weight.backwards.is_finite() {
            return Err(CredError::InvalidWeight(format!(
                "edge weight product at {} is ({}, {})",
                edge.address, weight.forwards, weight.backwards
            )));
        }
        let src = index
            .index_of(&edge.src)
            .ok_or_else(|| CredError::Internal(format!("unindexed endpoint {}", edge.src)))?;
        let dst = index
            .index_of(&edge.dst)
            .ok_or_else(|| CredError::Internal(format!("unindexed endpoint {}", edge.dst)))?;
        masses.push(EdgeMass {
            src,
            dst,
            forwards: weight.forwards,
            backwards: weight.backwards,
            timestamp_ms: edge.timestamp_ms,
        });
    }
    Ok(masses)
}

/// Total outgoing mass per source: the synthetic self-loop plus every edge
/// contribution leaving that source.
pub fn source_masses(node_masses: &[f64], edge_masses: &[EdgeMass]) -> Vec<f64> {
    let mut out = node_masses.to_vec();
    for edge in edge_masses {
        out[edge.src as usize] += edge.forwards;
        out[edge.dst as usize] += edge.backwards;
    }
    out
}

/// Builds the row-stochastic chain from resolved masses.
///
/// Within each target row, the synthetic self-loop comes first, followed by
/// edge contributions in edge insertion order.
pub fn build_chain(node_masses: &[f64], edge_masses: &[EdgeMass]) -> SparseMarkovChain {
    let n = node_masses.len();
    let out_masses = source_masses(node_masses, edge_masses);
    let mut rows: Vec<Vec<(u32, f64)>> = (0..n)
        .map(|t| {
            let total = out_masses[t];
            // A source with no mass anywhere becomes absorbing through its
            // synthetic loop; real edges from it carry probability 0.
            let p = if total > 0.0 { node_masses[t] / total } else { 1.0 };
            vec![(t as u32, p)]
        })
        .collect();
    for edge in edge_masses {
        let src_total = out_masses[edge.src as usize];
        let dst_total = out_masses[edge.dst as usize];
        let forward = if src_total > 0.0 {
            edge.forwards / src_total
        } else {
            0.0
        };
        let backward = if dst_total > 0.0 {
            edge.backwards / dst_total
        } else {
            0.0
        };
        rows[edge.dst as usize].push((edge.src, forward));
        rows[edge.src as usize].push((edge.dst, backward));
    }
    SparseMarkovChain::from_rows(rows)
}

/// Seed distribution proportional to node weight, uniform when every
/// weight is zero.
pub fn build_seed(node_masses: &[f64]) -> Distribution {
    weighted_distribution(node_masses)
}

/// Full translation of a weighted graph: numbering, chain, and seed.
pub fn graph_to_markov_chain(
    wg: &WeightedGraph,
) -> Result<OrderedSparseMarkovChain, CredError> {
    wg.weights.validate()?;
    let index = NodeIndex::from_graph(&wg.graph);
    let node_masses = resolve_node_masses(wg, &index)?;
    let edge_masses = resolve_edge_masses(wg, &index)?;
    let chain = build_chain(&node_masses, &edge_masses);
    let seed = build_seed(&node_masses);
    Ok(OrderedSparseMarkovChain { index, chain, seed })
}
