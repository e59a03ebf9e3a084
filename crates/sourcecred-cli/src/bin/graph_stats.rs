use std::env;

fn main() {
    let path = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: graph_stats <graph.json>");
        std::process::exit(2);
    });
    let src = std::fs::read_to_string(&path).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {}", path, e);
        std::process::exit(1);
    });
    match sourcecred_core::parse_weighted_graph(&src) {
        Ok(wg) => {
            println!("nodes: {}", wg.graph.node_count());
            println!("edges: {}", wg.graph.edge_count());
            let timestamps: Vec<i64> = wg.graph.edges().map(|e| e.timestamp_ms).collect();
            if let (Some(min), Some(max)) =
                (timestamps.iter().min(), timestamps.iter().max())
            {
                println!("edge timestamps: {} .. {}", min, max);
            }
            let timeless = wg
                .graph
                .nodes()
                .filter(|n| n.timestamp_ms.is_none())
                .count();
            println!("timeless nodes: {}", timeless);
            println!("node weight entries: {}", wg.weights.node_weights.len());
            println!("edge weight entries: {}", wg.weights.edge_weights.len());
        }
        Err(e) => {
            eprintln!("parse error: {}", e);
            std::process::exit(1);
        }
    }
}
