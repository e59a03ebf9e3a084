//! Chain translation and stationary solving over whole graphs.

use sourcecred_core::markov::distribution::uniform_distribution;
use sourcecred_core::markov::process::graph_to_markov_chain;
use sourcecred_core::markov::solver::{find_stationary_distribution, SolverOptions};
use sourcecred_core::{
    CredError, Edge, EdgeAddress, Graph, Node, NodeAddress, WeightedGraph, Weights,
};

fn node_addr(name: &str) -> NodeAddress {
    NodeAddress::from_parts(["proj", name]).unwrap()
}

fn node(name: &str) -> Node {
    Node {
        address: node_addr(name),
        description: name.to_string(),
        timestamp_ms: None,
    }
}

fn edge(name: &str, src: &str, dst: &str) -> Edge {
    Edge {
        address: EdgeAddress::from_parts(["proj", name]).unwrap(),
        src: node_addr(src),
        dst: node_addr(dst),
        timestamp_ms: 0,
    }
}

#[test]
fn empty_graph_yields_empty_chain_and_distribution() {
    let wg = WeightedGraph::new(Graph::new(), Weights::new()).unwrap();
    let ordered = graph_to_markov_chain(&wg).unwrap();
    assert_eq!(ordered.chain.n(), 0);
    assert!(ordered.seed.is_empty());

    let result =
        find_stationary_distribution(&ordered.chain, &ordered.seed, &SolverOptions::default())
            .unwrap();
    assert!(result.pi.is_empty());
    assert_eq!(result.iterations, 0);
}

#[test]
fn single_node_graph_concentrates_everything() {
    let mut g = Graph::new();
    g.add_node(node("only")).unwrap();
    let wg = WeightedGraph::new(g, Weights::new()).unwrap();
    let ordered = graph_to_markov_chain(&wg).unwrap();
    let result =
        find_stationary_distribution(&ordered.chain, &ordered.seed, &SolverOptions::default())
            .unwrap();
    assert_eq!(result.pi, vec![1.0]);
}

#[test]
fn all_zero_weights_produce_the_uniform_distribution() {
    let mut g = Graph::new();
    g.add_node(node("a")).unwrap();
    g.add_node(node("b")).unwrap();
    g.add_node(node("c")).unwrap();
    g.add_edge(edge("ab", "a", "b")).unwrap();
    let mut weights = Weights::new();
    // Zeroing the root prefix zeroes every node weight beneath it.
    weights.set_node_weight(NodeAddress::from_parts(["proj"]).unwrap(), 0.0);
    weights.set_edge_weight(
        EdgeAddress::from_parts(["proj", "ab"]).unwrap(),
        sourcecred_core::EdgeWeight {
            forwards: 0.0,
            backwards: 0.0,
        },
    );
    let wg = WeightedGraph::new(g, weights).unwrap();

    let ordered = graph_to_markov_chain(&wg).unwrap();
    assert_eq!(ordered.seed, uniform_distribution(3));
    let result =
        find_stationary_distribution(&ordered.chain, &ordered.seed, &SolverOptions::default())
            .unwrap();
    for (p, u) in result.pi.iter().zip(uniform_distribution(3)) {
        assert!((p - u).abs() < 1e-12);
    }
}

#[test]
fn prefix_weights_amplify_whole_subtrees() {
    let mut g = Graph::new();
    g.add_node(node("a")).unwrap();
    g.add_node(node("b")).unwrap();
    let mut weights = Weights::new();
    // Every node under proj/ is doubled; a gets a further 3x.
    weights.set_node_weight(NodeAddress::from_parts(["proj"]).unwrap(), 2.0);
    let wg = WeightedGraph::new(g, weights).unwrap();
    assert_eq!(wg.weights.node_weight(&node_addr("a")), 2.0);

    let ordered = graph_to_markov_chain(&wg).unwrap();
    // Equal amplification leaves the seed uniform.
    assert_eq!(ordered.seed, vec![0.5, 0.5]);

    let mut weights = Weights::new();
    weights.set_node_weight(NodeAddress::from_parts(["proj"]).unwrap(), 2.0);
    weights.set_node_weight(node_addr("a"), 6.0);
    let wg = WeightedGraph::new(wg.graph, weights).unwrap();
    // The exact entry replaces the prefix product outright.
    assert_eq!(wg.weights.node_weight(&node_addr("a")), 6.0);
    let ordered = graph_to_markov_chain(&wg).unwrap();
    assert_eq!(ordered.seed, vec![0.75, 0.25]);
}

#[test]
fn chains_built_from_graphs_validate() {
    let mut g = Graph::new();
    g.add_node(node("a")).unwrap();
    g.add_node(node("b")).unwrap();
    g.add_node(node("c")).unwrap();
    g.add_edge(edge("ab", "a", "b")).unwrap();
    g.add_edge(edge("bc", "b", "c")).unwrap();
    g.add_edge(edge("ca", "c", "a")).unwrap();
    g.add_edge(edge("aa", "a", "a")).unwrap();
    let wg = WeightedGraph::new(g, Weights::new()).unwrap();
    let ordered = graph_to_markov_chain(&wg).unwrap();
    ordered.chain.validate().unwrap();
}

#[test]
fn solver_reports_iterations_and_final_delta() {
    let mut g = Graph::new();
    g.add_node(node("a")).unwrap();
    g.add_node(node("b")).unwrap();
    g.add_edge(edge("ab", "a", "b")).unwrap();
    let wg = WeightedGraph::new(g, Weights::new()).unwrap();
    let ordered = graph_to_markov_chain(&wg).unwrap();

    let options = SolverOptions {
        alpha: 0.1,
        convergence_epsilon: 1e-10,
        max_iterations: 1000,
    };
    let result =
        find_stationary_distribution(&ordered.chain, &ordered.seed, &options).unwrap();
    assert!(result.iterations > 0);
    assert!(result.final_delta < 1e-10);
    let total: f64 = result.pi.iter().sum();
    assert!((total - 1.0).abs() < 1e-12);
}

#[test]
fn iteration_cap_is_reported_as_divergence() {
    let mut g = Graph::new();
    g.add_node(node("a")).unwrap();
    g.add_node(node("b")).unwrap();
    g.add_edge(edge("ab", "a", "b")).unwrap();
    let mut weights = Weights::new();
    // One-way flow, so the iteration actually has to drain mass.
    weights.set_edge_weight(
        EdgeAddress::from_parts(["proj", "ab"]).unwrap(),
        sourcecred_core::EdgeWeight {
            forwards: 1.0,
            backwards: 0.0,
        },
    );
    let wg = WeightedGraph::new(g, weights).unwrap();
    let ordered = graph_to_markov_chain(&wg).unwrap();

    let options = SolverOptions {
        alpha: 0.0,
        convergence_epsilon: 1e-18,
        max_iterations: 2,
    };
    let err = find_stationary_distribution(&ordered.chain, &ordered.seed, &options).unwrap_err();
    match err {
        CredError::Diverged { iterations, .. } => assert_eq!(iterations, 2),
        other => panic!("expected divergence, got {other}"),
    }
}

#[test]
fn invalid_weights_fail_chain_translation() {
    let mut g = Graph::new();
    g.add_node(node("a")).unwrap();
    let mut weights = Weights::new();
    weights.set_node_weight(node_addr("a"), -1.0);
    let wg = WeightedGraph { graph: g, weights };
    let err = graph_to_markov_chain(&wg).unwrap_err();
    assert_eq!(err.kind(), "invalid-weight");
}
