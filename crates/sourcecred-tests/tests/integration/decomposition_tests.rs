//! Score decomposition over solved graphs.

use sourcecred_core::markov::process::graph_to_markov_chain;
use sourcecred_core::markov::solver::{find_stationary_distribution, SolverOptions};
use sourcecred_core::timeline::decomposition::{decompose, Adjacency};
use sourcecred_core::{
    Edge, EdgeAddress, Graph, Node, NodeAddress, WeightedGraph, Weights,
};

fn node_addr(name: &str) -> NodeAddress {
    NodeAddress::from_parts(["ring", name]).unwrap()
}

fn edge_addr(name: &str) -> EdgeAddress {
    EdgeAddress::from_parts(["ring", name]).unwrap()
}

/// A four-node ring with one chord and uneven node weights.
fn ring_graph() -> WeightedGraph {
    let mut g = Graph::new();
    for name in ["a", "b", "c", "d"] {
        g.add_node(Node {
            address: node_addr(name),
            description: name.to_string(),
            timestamp_ms: None,
        })
        .unwrap();
    }
    for (name, src, dst) in [
        ("ab", "a", "b"),
        ("bc", "b", "c"),
        ("cd", "c", "d"),
        ("da", "d", "a"),
        ("ac", "a", "c"),
    ] {
        g.add_edge(Edge {
            address: edge_addr(name),
            src: node_addr(src),
            dst: node_addr(dst),
            timestamp_ms: 0,
        })
        .unwrap();
    }
    let mut weights = Weights::new();
    weights.set_node_weight(node_addr("a"), 4.0);
    weights.set_node_weight(node_addr("c"), 0.5);
    WeightedGraph::new(g, weights).unwrap()
}

#[test]
fn flows_account_for_every_score_without_teleport() {
    let wg = ring_graph();
    let ordered = graph_to_markov_chain(&wg).unwrap();
    let options = SolverOptions {
        alpha: 0.0,
        convergence_epsilon: 1e-12,
        max_iterations: 100_000,
    };
    let result =
        find_stationary_distribution(&ordered.chain, &ordered.seed, &options).unwrap();
    let decomposition = decompose(&wg, &ordered.index, &result.pi).unwrap();

    assert_eq!(decomposition.len(), 4);
    for (address, entry) in &decomposition {
        let flowed: f64 = entry.scored_connections.iter().map(|c| c.connection_score).sum();
        assert!(
            (flowed - entry.score).abs() < 1e-9,
            "unaccounted flow at {address}"
        );
        assert!(entry
            .scored_connections
            .iter()
            .any(|c| c.adjacency == Adjacency::SyntheticLoop));
        for pair in entry.scored_connections.windows(2) {
            assert!(pair[0].connection_score >= pair[1].connection_score);
        }
    }
}

#[test]
fn in_and_out_edges_are_distinguished() {
    let wg = ring_graph();
    let ordered = graph_to_markov_chain(&wg).unwrap();
    let result = find_stationary_distribution(
        &ordered.chain,
        &ordered.seed,
        &SolverOptions::default(),
    )
    .unwrap();
    let decomposition = decompose(&wg, &ordered.index, &result.pi).unwrap();

    let c = &decomposition[&node_addr("c")];
    // c receives forward flow along bc and ac, and backward flow along cd.
    let kinds: Vec<&Adjacency> = c.scored_connections.iter().map(|x| &x.adjacency).collect();
    assert!(kinds.contains(&&Adjacency::InEdge(edge_addr("bc"))));
    assert!(kinds.contains(&&Adjacency::InEdge(edge_addr("ac"))));
    assert!(kinds.contains(&&Adjacency::OutEdge(edge_addr("cd"))));
    assert_eq!(c.scored_connections.len(), 4);

    let bc = c
        .scored_connections
        .iter()
        .find(|x| x.adjacency == Adjacency::InEdge(edge_addr("bc")))
        .unwrap();
    assert_eq!(bc.source, node_addr("b"));
}

#[test]
fn decomposition_weights_are_probabilities() {
    let wg = ring_graph();
    let ordered = graph_to_markov_chain(&wg).unwrap();
    let result = find_stationary_distribution(
        &ordered.chain,
        &ordered.seed,
        &SolverOptions::default(),
    )
    .unwrap();
    let decomposition = decompose(&wg, &ordered.index, &result.pi).unwrap();
    for entry in decomposition.values() {
        for connection in &entry.scored_connections {
            assert!(connection.connection_weight >= 0.0);
            assert!(connection.connection_weight <= 1.0);
        }
    }
}
