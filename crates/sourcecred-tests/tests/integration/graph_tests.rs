//! Graph construction, adjacency queries, merging, and contraction through
//! the public API.

use sourcecred_core::graph::{Direction, EdgesOptions, NeighborsOptions, NodeContraction};
use sourcecred_core::{
    Edge, EdgeAddress, Graph, Node, NodeAddress, WeightedGraph, Weights,
};

fn node_addr(parts: &[&str]) -> NodeAddress {
    NodeAddress::from_parts(parts).unwrap()
}

fn edge_addr(parts: &[&str]) -> EdgeAddress {
    EdgeAddress::from_parts(parts).unwrap()
}

fn node(parts: &[&str]) -> Node {
    Node {
        address: node_addr(parts),
        description: parts.join("/"),
        timestamp_ms: None,
    }
}

fn edge(parts: &[&str], src: &[&str], dst: &[&str], timestamp_ms: i64) -> Edge {
    Edge {
        address: edge_addr(parts),
        src: node_addr(src),
        dst: node_addr(dst),
        timestamp_ms,
    }
}

/// A two-plugin graph: a forum whose posts are authored by users, plus a
/// repo whose commits are authored by the same users.
fn two_plugin_graph() -> Graph {
    let mut g = Graph::new();
    g.add_node(node(&["forum", "user", "alice"])).unwrap();
    g.add_node(node(&["forum", "post", "1"])).unwrap();
    g.add_node(node(&["repo", "commit", "c1"])).unwrap();
    g.add_edge(edge(
        &["forum", "authors", "1"],
        &["forum", "user", "alice"],
        &["forum", "post", "1"],
        100,
    ))
    .unwrap();
    g.add_edge(edge(
        &["repo", "authors", "c1"],
        &["forum", "user", "alice"],
        &["repo", "commit", "c1"],
        200,
    ))
    .unwrap();
    g
}

#[test]
fn prefix_queries_partition_by_plugin() {
    let g = two_plugin_graph();
    let forum_nodes: Vec<_> = g.nodes_with_prefix(&node_addr(&["forum"])).collect();
    assert_eq!(forum_nodes.len(), 2);
    let repo_edges: Vec<_> = g
        .edges_matching(EdgesOptions {
            address_prefix: Some(edge_addr(&["repo"])),
            ..Default::default()
        })
        .collect();
    assert_eq!(repo_edges.len(), 1);
    assert_eq!(repo_edges[0].address, edge_addr(&["repo", "authors", "c1"]));

    // Both plugins attach edges to alice, so a src filter spans plugins.
    let by_alice = g
        .edges_matching(EdgesOptions {
            src_prefix: Some(node_addr(&["forum", "user"])),
            ..Default::default()
        })
        .count();
    assert_eq!(by_alice, 2);
}

#[test]
fn neighbors_filter_by_direction_and_prefix() {
    let g = two_plugin_graph();
    let alice = node_addr(&["forum", "user", "alice"]);

    let all: Vec<_> = g
        .neighbors(&alice, NeighborsOptions::default())
        .unwrap()
        .map(|n| n.node.address.clone())
        .collect();
    assert_eq!(
        all,
        vec![
            node_addr(&["forum", "post", "1"]),
            node_addr(&["repo", "commit", "c1"]),
        ]
    );

    let forum_only: Vec<_> = g
        .neighbors(
            &alice,
            NeighborsOptions {
                direction: Direction::Out,
                node_prefix: Some(node_addr(&["forum"])),
                edge_prefix: None,
            },
        )
        .unwrap()
        .map(|n| n.node.address.clone())
        .collect();
    assert_eq!(forum_only, vec![node_addr(&["forum", "post", "1"])]);

    let inbound: Vec<_> = g
        .neighbors(
            &alice,
            NeighborsOptions {
                direction: Direction::In,
                node_prefix: None,
                edge_prefix: None,
            },
        )
        .unwrap()
        .collect();
    assert!(inbound.is_empty());
}

#[test]
fn removal_is_strict_and_order_preserving() {
    let mut g = two_plugin_graph();
    let alice = node_addr(&["forum", "user", "alice"]);

    // Alice still has incident edges.
    assert_eq!(g.remove_node(&alice).unwrap_err().kind(), "node-in-use");

    g.remove_edge(&edge_addr(&["forum", "authors", "1"])).unwrap();
    g.remove_edge(&edge_addr(&["repo", "authors", "c1"])).unwrap();
    g.remove_node(&alice).unwrap();
    assert_eq!(g.remove_node(&alice).unwrap_err().kind(), "missing-node");

    // Remaining nodes keep their insertion order.
    let order: Vec<_> = g.nodes().map(|n| n.address.clone()).collect();
    assert_eq!(
        order,
        vec![node_addr(&["forum", "post", "1"]), node_addr(&["repo", "commit", "c1"])]
    );
}

#[test]
fn merge_combines_plugin_graphs() {
    let mut forum = Graph::new();
    forum.add_node(node(&["forum", "user", "alice"])).unwrap();
    forum.add_node(node(&["forum", "post", "1"])).unwrap();
    forum
        .add_edge(edge(
            &["forum", "authors", "1"],
            &["forum", "user", "alice"],
            &["forum", "post", "1"],
            100,
        ))
        .unwrap();

    let mut repo = Graph::new();
    repo.add_node(node(&["forum", "user", "alice"])).unwrap();
    repo.add_node(node(&["repo", "commit", "c1"])).unwrap();
    repo.add_edge(edge(
        &["repo", "authors", "c1"],
        &["forum", "user", "alice"],
        &["repo", "commit", "c1"],
        200,
    ))
    .unwrap();

    let merged = Graph::merge([&forum, &repo]).unwrap();
    assert_eq!(merged, two_plugin_graph());

    // Order of inputs does not change the merged contents.
    let reversed = Graph::merge([&repo, &forum]).unwrap();
    assert_eq!(reversed, merged);
}

#[test]
fn merge_rejects_conflicting_records() {
    let mut a = Graph::new();
    a.add_node(node(&["forum", "post", "1"])).unwrap();
    let mut b = Graph::new();
    b.add_node(Node {
        address: node_addr(&["forum", "post", "1"]),
        description: "a different description".into(),
        timestamp_ms: None,
    })
    .unwrap();
    let err = Graph::merge([&a, &b]).unwrap_err();
    assert_eq!(err.kind(), "merge-conflict");
}

#[test]
fn identity_contraction_rejects_explicit_weights() {
    let mut g = Graph::new();
    g.add_node(node(&["forum", "user", "alice"])).unwrap();
    g.add_node(node(&["repo", "user", "alice"])).unwrap();
    let mut weights = Weights::new();
    weights.set_node_weight(node_addr(&["repo", "user", "alice"]), 2.0);
    let wg = WeightedGraph::new(g, weights).unwrap();

    let contraction = NodeContraction {
        old: vec![
            node_addr(&["forum", "user", "alice"]),
            node_addr(&["repo", "user", "alice"]),
        ],
        replacement: node(&["identity", "alice"]),
    };
    let err = wg.contract_identities(&[contraction.clone()]).unwrap_err();
    assert_eq!(err.kind(), "contraction-collision");

    // The plain graph-level contraction has no such restriction.
    assert!(wg.graph.contract_nodes(&[contraction]).is_ok());
}

#[test]
fn contraction_rewrites_cross_plugin_edges() {
    let g = two_plugin_graph();
    let contracted = g
        .contract_nodes(&[NodeContraction {
            old: vec![node_addr(&["forum", "user", "alice"])],
            replacement: node(&["identity", "alice"]),
        }])
        .unwrap();

    assert!(!contracted.has_node(&node_addr(&["forum", "user", "alice"])));
    let identity = node_addr(&["identity", "alice"]);
    let out: Vec<_> = contracted
        .neighbors(
            &identity,
            NeighborsOptions {
                direction: Direction::Out,
                node_prefix: None,
                edge_prefix: None,
            },
        )
        .unwrap()
        .map(|n| n.node.address.clone())
        .collect();
    assert_eq!(
        out,
        vec![
            node_addr(&["forum", "post", "1"]),
            node_addr(&["repo", "commit", "c1"]),
        ]
    );
}

#[test]
fn modification_counter_tracks_structural_changes() {
    let mut g = Graph::new();
    let before = g.modification_count();
    g.add_node(node(&["forum", "user", "alice"])).unwrap();
    assert!(g.modification_count() > before);

    // Re-adding the identical node is a no-op.
    let counted = g.modification_count();
    g.add_node(node(&["forum", "user", "alice"])).unwrap();
    assert_eq!(g.modification_count(), counted);
}
