//! # Contribution Graph
//!
//! This module implements the core graph data structure: a typed, directed
//! multigraph of contributions and the relationships between them.
//!
//! ## Key Components
//!
//! - **Node**: an addressed entity (a commit, a post, a user) with a
//!   human-readable description and an optional creation timestamp
//! - **Edge**: an addressed, directed connection between two nodes, always
//!   timestamped
//! - **Graph**: the container, with address-indexed lookup, prefix-filtered
//!   iteration, and neighbor queries
//!
//! ## Design
//!
//! - Nodes and edges live in slot vectors; removal leaves a tombstone so the
//!   insertion order of the remaining entries never shifts
//! - O(1) node/edge lookups via `FxHashMap` indexes from address to slot
//! - Per-node adjacency lists record incident edges in insertion order, so
//!   neighbor queries are deterministic
//! - Every edge's endpoints must be present in the graph; removing a node
//!   that still has incident edges is refused
//! - Failed operations leave the graph untouched
//!
//! ## Example
//!
//! ```rust,ignore
//! use sourcecred_core::graph::{Graph, Node, Edge};
//!
//! let mut graph = Graph::new();
//! graph.add_node(Node { address: a.clone(), description: "a".into(), timestamp_ms: None })?;
//! graph.add_node(Node { address: b.clone(), description: "b".into(), timestamp_ms: Some(0) })?;
//! graph.add_edge(Edge { address: e, src: a, dst: b, timestamp_ms: 0 })?;
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::address::{EdgeAddress, NodeAddress};
use crate::compat::{Envelope, GRAPH_TYPE};
use crate::errors::CredError;

/// A node in the contribution graph.
///
/// `timestamp_ms` is `None` for timeless nodes (users, projects) that exist
/// across the whole history, and `Some` for nodes created at a specific
/// moment (commits, posts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub address: NodeAddress,
    pub description: String,
    pub timestamp_ms: Option<i64>,
}

/// A directed edge between two nodes. Unlike nodes, edges always carry a
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub address: EdgeAddress,
    pub src: NodeAddress,
    pub dst: NodeAddress,
    pub timestamp_ms: i64,
}

/// Direction filter for neighbor queries, relative to the queried node.
///
/// `In` selects edges pointing at the node, `Out` edges leaving it, and
/// `Any` both. A self-loop matches every direction but is yielded only once
/// per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Any,
}

/// Filter options for [`Graph::neighbors`]. A `None` prefix imposes no
/// restriction.
#[derive(Debug, Clone)]
pub struct NeighborsOptions {
    pub direction: Direction,
    pub node_prefix: Option<NodeAddress>,
    pub edge_prefix: Option<EdgeAddress>,
}

impl Default for NeighborsOptions {
    fn default() -> Self {
        NeighborsOptions {
            direction: Direction::Any,
            node_prefix: None,
            edge_prefix: None,
        }
    }
}

/// Filter options for [`Graph::edges_matching`]. A `None` prefix imposes no
/// restriction; `Default` matches every edge.
#[derive(Debug, Clone, Default)]
pub struct EdgesOptions {
    pub address_prefix: Option<EdgeAddress>,
    pub src_prefix: Option<NodeAddress>,
    pub dst_prefix: Option<NodeAddress>,
}

/// One entry yielded by [`Graph::neighbors`]: the incident edge and the node
/// at its far end (the queried node itself for a self-loop).
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub edge: &'a Edge,
    pub node: &'a Node,
}

/// A directive for [`Graph::contract_nodes`]: every node addressed in `old`
/// is replaced by `replacement`, and incident edges are rewritten to point
/// at the replacement.
#[derive(Debug, Clone)]
pub struct NodeContraction {
    pub old: Vec<NodeAddress>,
    pub replacement: Node,
}

/// Incidence record stored on a node's adjacency list. `Loop` is used for
/// self-loops so that an `Any`-direction query yields the edge once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdjacencyEntry {
    In(usize),
    Out(usize),
    Loop(usize),
}

impl AdjacencyEntry {
    fn slot(self) -> usize {
        match self {
            AdjacencyEntry::In(s) | AdjacencyEntry::Out(s) | AdjacencyEntry::Loop(s) => s,
        }
    }

    fn matches(self, direction: Direction) -> bool {
        match (self, direction) {
            (_, Direction::Any) => true,
            (AdjacencyEntry::Loop(_), _) => true,
            (AdjacencyEntry::In(_), Direction::In) => true,
            (AdjacencyEntry::Out(_), Direction::Out) => true,
            _ => false,
        }
    }
}

/// The core graph structure.
///
/// Iteration over nodes and edges follows insertion order, and removals do
/// not perturb the order of the remaining entries. Equality is set-based:
/// two graphs are equal when they hold the same node and edge records,
/// regardless of insertion or removal history.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    node_index: FxHashMap<NodeAddress, usize>,
    edge_index: FxHashMap<EdgeAddress, usize>,
    adjacency: Vec<SmallVec<[AdjacencyEntry; 4]>>,
    modification_count: u64,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Graph::default()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    /// Counts every successful state-changing operation. Useful as a cheap
    /// version stamp for caches layered on top of the graph; Rust's borrow
    /// rules already prevent mutation while an iterator is live.
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    pub fn has_node(&self, address: &NodeAddress) -> bool {
        self.node_index.contains_key(address)
    }

    pub fn node(&self, address: &NodeAddress) -> Option<&Node> {
        let slot = *self.node_index.get(address)?;
        self.nodes[slot].as_ref()
    }

    pub fn has_edge(&self, address: &EdgeAddress) -> bool {
        self.edge_index.contains_key(address)
    }

    pub fn edge(&self, address: &EdgeAddress) -> Option<&Edge> {
        let slot = *self.edge_index.get(address)?;
        self.edges[slot].as_ref()
    }

    /// Adds a node. Re-adding an identical record is a no-op; adding a
    /// different record at an existing address fails with
    /// [`CredError::AddressCollision`].
    pub fn add_node(&mut self, node: Node) -> Result<(), CredError> {
        if let Some(&slot) = self.node_index.get(&node.address) {
            let existing = self.node_at(slot);
            if *existing == node {
                return Ok(());
            }
            return Err(CredError::AddressCollision(format!(
                "conflicting records at {}",
                node.address
            )));
        }
        let slot = self.nodes.len();
        self.node_index.insert(node.address.clone(), slot);
        self.nodes.push(Some(node));
        self.adjacency.push(SmallVec::new());
        self.modification_count += 1;
        Ok(())
    }

    /// Removes a node. Fails with [`CredError::NodeInUse`] while any edge
    /// still references it, and with [`CredError::MissingNode`] if no node
    /// exists at the address.
    pub fn remove_node(&mut self, address: &NodeAddress) -> Result<(), CredError> {
        let slot = match self.node_index.get(address) {
            Some(&slot) => slot,
            None => return Err(CredError::MissingNode(address.to_string())),
        };
        if !self.adjacency[slot].is_empty() {
            return Err(CredError::NodeInUse(format!(
                "{} has {} incident edge(s)",
                address,
                self.adjacency[slot].len()
            )));
        }
        self.node_index.remove(address);
        self.nodes[slot] = None;
        self.modification_count += 1;
        Ok(())
    }

    /// Adds an edge. Both endpoints must already be present. Re-adding an
    /// identical record is a no-op; adding a different record at an existing
    /// address fails with [`CredError::AddressCollision`].
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), CredError> {
        if let Some(&slot) = self.edge_index.get(&edge.address) {
            let existing = self.edge_at(slot);
            if *existing == edge {
                return Ok(());
            }
            return Err(CredError::AddressCollision(format!(
                "conflicting records at {}",
                edge.address
            )));
        }
        let src_slot = match self.node_index.get(&edge.src) {
            Some(&slot) => slot,
            None => return Err(CredError::MissingNode(edge.src.to_string())),
        };
        let dst_slot = match self.node_index.get(&edge.dst) {
            Some(&slot) => slot,
            None => return Err(CredError::MissingNode(edge.dst.to_string())),
        };
        let slot = self.edges.len();
        self.edge_index.insert(edge.address.clone(), slot);
        self.edges.push(Some(edge));
        if src_slot == dst_slot {
            self.adjacency[src_slot].push(AdjacencyEntry::Loop(slot));
        } else {
            self.adjacency[src_slot].push(AdjacencyEntry::Out(slot));
            self.adjacency[dst_slot].push(AdjacencyEntry::In(slot));
        }
        self.modification_count += 1;
        Ok(())
    }

    /// Removes an edge. Fails with [`CredError::MissingEdge`] if no edge
    /// exists at the address.
    pub fn remove_edge(&mut self, address: &EdgeAddress) -> Result<(), CredError> {
        let slot = match self.edge_index.get(address) {
            Some(&slot) => slot,
            None => return Err(CredError::MissingEdge(address.to_string())),
        };
        let (src, dst) = {
            let edge = self.edge_at(slot);
            (edge.src.clone(), edge.dst.clone())
        };
        for endpoint in [&src, &dst] {
            if let Some(&node_slot) = self.node_index.get(endpoint) {
                self.adjacency[node_slot].retain(|entry| entry.slot() != slot);
            }
        }
        self.edge_index.remove(address);
        self.edges[slot] = None;
        self.modification_count += 1;
        Ok(())
    }

    /// Iterates over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter_map(|slot| slot.as_ref())
    }

    /// Iterates over nodes whose address starts with `prefix`, in insertion
    /// order. The returned iterator does not borrow `prefix`.
    pub fn nodes_with_prefix(&self, prefix: &NodeAddress) -> impl Iterator<Item = &Node> + '_ {
        let prefix = prefix.clone();
        self.nodes().filter(move |n| n.address.has_prefix(&prefix))
    }

    /// Iterates over edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter_map(|slot| slot.as_ref())
    }

    /// Iterates over edges matching every given filter, in insertion order.
    pub fn edges_matching(&self, options: EdgesOptions) -> impl Iterator<Item = &Edge> + '_ {
        self.edges().filter(move |e| {
            options
                .address_prefix
                .as_ref()
                .map_or(true, |p| e.address.has_prefix(p))
                && options
                    .src_prefix
                    .as_ref()
                    .map_or(true, |p| e.src.has_prefix(p))
                && options
                    .dst_prefix
                    .as_ref()
                    .map_or(true, |p| e.dst.has_prefix(p))
        })
    }

    /// Nodes sorted by address. This is the canonical order serialization
    /// uses.
    pub fn nodes_sorted(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes().collect();
        nodes.sort_by(|a, b| a.address.cmp(&b.address));
        nodes
    }

    /// Edges sorted by address. This is the canonical order serialization
    /// uses.
    pub fn edges_sorted(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges().collect();
        edges.sort_by(|a, b| a.address.cmp(&b.address));
        edges
    }

    /// Iterates over the neighbors of a node, in edge-insertion order.
    ///
    /// Each yielded entry pairs an incident edge with the node at its far
    /// end. A self-loop is yielded exactly once, whatever the direction
    /// filter.
    ///
    /// # Errors
    ///
    /// Fails with [`CredError::MissingNode`] when no node exists at
    /// `address`.
    pub fn neighbors(
        &self,
        address: &NodeAddress,
        options: NeighborsOptions,
    ) -> Result<Neighbors<'_>, CredError> {
        let slot = match self.node_index.get(address) {
            Some(&slot) => slot,
            None => return Err(CredError::MissingNode(address.to_string())),
        };
        Ok(Neighbors {
            graph: self,
            entries: self.adjacency[slot].iter(),
            options,
        })
    }

    /// Merges graphs into a new graph containing the union of their nodes
    /// and edges. Identical records at the same address are deduplicated;
    /// conflicting records fail with [`CredError::MergeConflict`].
    pub fn merge<'a, I>(graphs: I) -> Result<Graph, CredError>
    where
        I: IntoIterator<Item = &'a Graph>,
    {
        let graphs: Vec<&Graph> = graphs.into_iter().collect();
        let mut result = Graph::new();
        // All nodes first, so cross-graph edges resolve their endpoints.
        for graph in &graphs {
            for node in graph.nodes() {
                result.add_node(node.clone()).map_err(merge_conflict)?;
            }
        }
        for graph in &graphs {
            for edge in graph.edges() {
                result.add_edge(edge.clone()).map_err(merge_conflict)?;
            }
        }
        Ok(result)
    }

    /// Builds a new graph in which every node listed in a contraction is
    /// replaced by that contraction's replacement node, with incident edges
    /// rewritten to the replacement's address. An edge between two
    /// contracted nodes becomes a self-loop.
    ///
    /// The replacement nodes appear first in the result's insertion order
    /// (in contraction order), followed by the retained nodes in this
    /// graph's order.
    ///
    /// # Errors
    ///
    /// - [`CredError::MissingNode`] when an `old` address is absent
    /// - [`CredError::ContractionCollision`] when an address appears in two
    ///   contractions, a replacement collides with a retained node, or edge
    ///   rewriting produces conflicting records at one address
    pub fn contract_nodes(&self, contractions: &[NodeContraction]) -> Result<Graph, CredError> {
        let mut rewrite: FxHashMap<&NodeAddress, &NodeAddress> = FxHashMap::default();
        for contraction in contractions {
            for old in &contraction.old {
                if !self.has_node(old) {
                    return Err(CredError::MissingNode(old.to_string()));
                }
                if rewrite.insert(old, &contraction.replacement.address).is_some() {
                    return Err(CredError::ContractionCollision(format!(
                        "{old} appears in more than one contraction"
                    )));
                }
            }
        }
        for contraction in contractions {
            let replacement = &contraction.replacement.address;
            if self.has_node(replacement) && !rewrite.contains_key(replacement) {
                return Err(CredError::ContractionCollision(format!(
                    "replacement {replacement} collides with a retained node"
                )));
            }
        }

        let mut result = Graph::new();
        for contraction in contractions {
            result
                .add_node(contraction.replacement.clone())
                .map_err(contraction_collision)?;
        }
        for node in self.nodes() {
            if rewrite.contains_key(&node.address) {
                continue;
            }
            result.add_node(node.clone()).map_err(contraction_collision)?;
        }
        for edge in self.edges() {
            let src = rewrite.get(&edge.src).map_or(&edge.src, |a| *a).clone();
            let dst = rewrite.get(&edge.dst).map_or(&edge.dst, |a| *a).clone();
            result
                .add_edge(Edge {
                    address: edge.address.clone(),
                    src,
                    dst,
                    timestamp_ms: edge.timestamp_ms,
                })
                .map_err(contraction_collision)?;
        }
        Ok(result)
    }

    /// Serializes into a versioned envelope, with nodes and edges sorted by
    /// address so equal graphs serialize identically.
    pub fn to_json(&self) -> GraphJson {
        let nodes: Vec<Node> = self.nodes_sorted().into_iter().cloned().collect();
        let edges: Vec<EdgeRecord> = self
            .edges_sorted()
            .into_iter()
            .map(|e| EdgeRecord {
                address: e.address.clone(),
                src: e.src.clone(),
                dst: e.dst.clone(),
                timestamp_ms: Some(e.timestamp_ms),
            })
            .collect();
        Envelope::new(GRAPH_TYPE, GraphPayload { nodes, edges })
    }

    /// Deserializes from a versioned envelope, re-validating every record.
    pub fn from_json(json: GraphJson) -> Result<Graph, CredError> {
        let payload = json.open(GRAPH_TYPE)?;
        Graph::from_payload(payload)
    }

    pub(crate) fn from_payload(payload: GraphPayload) -> Result<Graph, CredError> {
        let mut graph = Graph::new();
        for node in payload.nodes {
            graph.add_node(node)?;
        }
        for record in payload.edges {
            let timestamp_ms = record
                .timestamp_ms
                .ok_or_else(|| CredError::MissingTimestamp(record.address.to_string()))?;
            graph.add_edge(Edge {
                address: record.address,
                src: record.src,
                dst: record.dst,
                timestamp_ms,
            })?;
        }
        Ok(graph)
    }

    /// Slot-position lookup used by the Markov translation, which needs a
    /// dense numbering of nodes in insertion order.
    pub(crate) fn node_slot(&self, address: &NodeAddress) -> Option<usize> {
        self.node_index.get(address).copied()
    }

    fn node_at(&self, slot: usize) -> &Node {
        self.nodes[slot]
            .as_ref()
            .expect("index entries only reference live nodes")
    }

    fn edge_at(&self, slot: usize) -> &Edge {
        self.edges[slot]
            .as_ref()
            .expect("adjacency entries only reference live edges")
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Graph) -> bool {
        self.node_count() == other.node_count()
            && self.edge_count() == other.edge_count()
            && self.nodes().all(|n| other.node(&n.address) == Some(n))
            && self.edges().all(|e| other.edge(&e.address) == Some(e))
    }
}

impl Eq for Graph {}

fn merge_conflict(err: CredError) -> CredError {
    match err {
        CredError::AddressCollision(msg) => CredError::MergeConflict(msg),
        other => other,
    }
}

fn contraction_collision(err: CredError) -> CredError {
    match err {
        CredError::AddressCollision(msg) => CredError::ContractionCollision(msg),
        other => other,
    }
}

/// Iterator returned by [`Graph::neighbors`].
pub struct Neighbors<'a> {
    graph: &'a Graph,
    entries: std::slice::Iter<'a, AdjacencyEntry>,
    options: NeighborsOptions,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = Neighbor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = *self.entries.next()?;
            if !entry.matches(self.options.direction) {
                continue;
            }
            let edge = self.graph.edge_at(entry.slot());
            if let Some(prefix) = &self.options.edge_prefix {
                if !edge.address.has_prefix(prefix) {
                    continue;
                }
            }
            let neighbor_address = match entry {
                AdjacencyEntry::In(_) => &edge.src,
                AdjacencyEntry::Out(_) | AdjacencyEntry::Loop(_) => &edge.dst,
            };
            if let Some(prefix) = &self.options.node_prefix {
                if !neighbor_address.has_prefix(prefix) {
                    continue;
                }
            }
            let slot = self
                .graph
                .node_slot(neighbor_address)
                .expect("edge endpoints are always present");
            return Some(Neighbor {
                edge,
                node: self.graph.node_at(slot),
            });
        }
    }
}

/// Serialized edge record. `timestamp_ms` is optional only at the wire
/// level, so a missing timestamp can be reported as
/// [`CredError::MissingTimestamp`] instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub address: EdgeAddress,
    pub src: NodeAddress,
    pub dst: NodeAddress,
    pub timestamp_ms: Option<i64>,
}

/// Payload of a serialized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeRecord>,
}

/// A graph wrapped in its versioned envelope.
pub type GraphJson = Envelope<GraphPayload>;
