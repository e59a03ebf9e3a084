//! Time slicing, decay, node presence, and the computation hooks.

use sourcecred_core::timeline::cred::{
    compute_cred, compute_cred_with_options, CancellationToken, ComputeOptions, CredConfig,
    Progress,
};
use sourcecred_core::timeline::interval::{graph_intervals, interval_sequence};
use sourcecred_core::{
    Edge, EdgeAddress, EdgeWeight, Graph, Node, NodeAddress, WeightedGraph, Weights,
};

const WIDTH: i64 = 500_000;

fn node_addr(name: &str) -> NodeAddress {
    NodeAddress::from_parts(["proj", name]).unwrap()
}

fn edge_addr(name: &str) -> EdgeAddress {
    EdgeAddress::from_parts(["proj", name]).unwrap()
}

fn node(name: &str, timestamp_ms: Option<i64>) -> Node {
    Node {
        address: node_addr(name),
        description: name.to_string(),
        timestamp_ms,
    }
}

fn edge(name: &str, src: &str, dst: &str, timestamp_ms: i64) -> Edge {
    Edge {
        address: edge_addr(name),
        src: node_addr(src),
        dst: node_addr(dst),
        timestamp_ms,
    }
}

fn config() -> CredConfig {
    let mut config = CredConfig::new(vec![NodeAddress::from_parts(["proj"]).unwrap()]);
    config.interval_width_ms = WIDTH;
    config
}

#[test]
fn boundary_timestamp_lands_in_the_later_interval() {
    let mut g = Graph::new();
    g.add_node(node("a", None)).unwrap();
    g.add_node(node("b", None)).unwrap();
    // Exactly on the boundary between the first and second interval.
    g.add_edge(edge("ab", "a", "b", WIDTH)).unwrap();
    g.add_edge(edge("ba", "b", "a", 0)).unwrap();
    let intervals = graph_intervals(&g, WIDTH).unwrap();
    assert_eq!(intervals.len(), 2);
    assert!(intervals[0].contains(0));
    assert!(!intervals[0].contains(WIDTH));
    assert!(intervals[1].contains(WIDTH));
}

#[test]
fn intervals_align_to_width_multiples_for_negative_times() {
    let intervals = interval_sequence(-2_600_000, -300_000, 1_000_000).unwrap();
    assert_eq!(intervals.len(), 3);
    assert_eq!(intervals[0].start_time_ms, -3_000_000);
    assert_eq!(intervals[2].end_time_ms, 0);
}

#[test]
fn nodes_score_nothing_before_their_birth() {
    let mut g = Graph::new();
    g.add_node(node("veteran", None)).unwrap();
    g.add_node(node("newcomer", Some(2 * WIDTH))).unwrap();
    g.add_edge(edge("greets", "veteran", "newcomer", 2 * WIDTH))
        .unwrap();
    g.add_edge(edge("anchor", "veteran", "veteran", 0)).unwrap();
    let wg = WeightedGraph::new(g, Weights::new()).unwrap();

    let result = compute_cred(&wg, &[], &config()).unwrap();
    assert_eq!(result.intervals.len(), 3);
    let newcomer = &result.scores[&node_addr("newcomer")];
    assert_eq!(newcomer[0], 0.0);
    assert_eq!(newcomer[1], 0.0);
    assert!(newcomer[2] > 0.0);

    let veteran = &result.scores[&node_addr("veteran")];
    for k in 0..3 {
        assert!((veteran[k] + newcomer[k] - 1000.0).abs() < 1e-9);
    }
}

#[test]
fn decay_spreads_an_edge_over_later_intervals() {
    let mut g = Graph::new();
    g.add_node(node("a", None)).unwrap();
    g.add_node(node("b", None)).unwrap();
    g.add_edge(edge("ab", "a", "b", 0)).unwrap();
    let mut weights = Weights::new();
    weights.set_edge_weight(
        edge_addr("ab"),
        EdgeWeight {
            forwards: 1.0,
            backwards: 0.0,
        },
    );
    // Keep the time range three intervals wide.
    g.add_edge(edge("marker", "a", "a", 2 * WIDTH)).unwrap();
    weights.set_edge_weight(
        edge_addr("marker"),
        EdgeWeight {
            forwards: 0.0,
            backwards: 0.0,
        },
    );
    let wg = WeightedGraph::new(g, weights).unwrap();

    // Without decay the edge only acts in its own interval.
    let no_decay = compute_cred(&wg, &[], &config()).unwrap();
    let b = &no_decay.scores[&node_addr("b")];
    assert!(b[0] > 500.0);
    assert!((b[1] - 500.0).abs() < 1e-9);
    assert!((b[2] - 500.0).abs() < 1e-9);

    // With decay it keeps pulling score in later intervals, more weakly.
    let mut decayed_config = config();
    decayed_config.decay_lambda = std::f64::consts::LN_2 / WIDTH as f64;
    let decayed = compute_cred(&wg, &[], &decayed_config).unwrap();
    let b = &decayed.scores[&node_addr("b")];
    assert!(b[0] > 500.0);
    assert!(b[1] > 500.0);
    assert!(b[2] > 500.0);
    assert!(b[0] > b[1] && b[1] > b[2]);
}

#[test]
fn cancellation_from_the_progress_callback_stops_the_run() {
    let mut g = Graph::new();
    g.add_node(node("a", None)).unwrap();
    g.add_node(node("b", None)).unwrap();
    g.add_edge(edge("early", "a", "b", 0)).unwrap();
    g.add_edge(edge("late", "a", "b", 3 * WIDTH)).unwrap();
    let wg = WeightedGraph::new(g, Weights::new()).unwrap();

    let token = CancellationToken::new();
    let cancel_handle = token.clone();
    let mut completed = 0usize;
    let mut callback = |p: Progress| {
        completed = p.completed;
        cancel_handle.cancel();
    };
    let err = compute_cred_with_options(
        &wg,
        &[],
        &config(),
        ComputeOptions {
            cancellation: Some(&token),
            progress: Some(&mut callback),
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), "cancelled");
    assert_eq!(completed, 1);
}

#[test]
fn progress_covers_every_interval_exactly_once() {
    let mut g = Graph::new();
    g.add_node(node("a", None)).unwrap();
    g.add_node(node("b", None)).unwrap();
    g.add_edge(edge("early", "a", "b", 0)).unwrap();
    g.add_edge(edge("late", "a", "b", 2 * WIDTH)).unwrap();
    let wg = WeightedGraph::new(g, Weights::new()).unwrap();

    let mut seen = Vec::new();
    let mut callback = |p: Progress| seen.push(p);
    compute_cred_with_options(
        &wg,
        &[],
        &config(),
        ComputeOptions {
            cancellation: None,
            progress: Some(&mut callback),
        },
    )
    .unwrap();
    assert_eq!(
        seen,
        vec![
            Progress {
                completed: 1,
                total: 3
            },
            Progress {
                completed: 2,
                total: 3
            },
            Progress {
                completed: 3,
                total: 3
            },
        ]
    );
}
