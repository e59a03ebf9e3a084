//! SourceCred CLI - Command-line interface for computing cred scores
//!
//! Usage:
//!   sourcecred <graph.json>                                # Validate a weighted graph file
//!   sourcecred <graph.json> --score-prefix sourcecred/demo # Compute cred
//!   sourcecred <graph.json> --config cred.json -o json     # Output the full result as JSON

use clap::Parser;
use sourcecred_core::parse_weighted_graph;
use sourcecred_core::timeline::cred::{
    compute_cred_with_options, ComputeOptions, CredConfig, CredResult, Progress,
};
use sourcecred_core::NodeAddress;
use std::process;

#[derive(Parser)]
#[command(name = "sourcecred")]
#[command(version)]
#[command(about = "SourceCred - contribution scoring over weighted graphs")]
#[command(
    long_about = "Load a serialized weighted graph and attribute cred scores across its nodes"
)]
struct Cli {
    /// Input weighted graph JSON file
    #[arg(value_name = "FILE")]
    file: String,

    /// Computation config JSON file (optional - defaults are used if not provided)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Address prefix whose nodes share the normalized score total, with
    /// parts separated by '/'. Repeatable; overrides the config file's
    /// prefixes when given.
    #[arg(short = 'p', long = "score-prefix", value_name = "PREFIX")]
    score_prefixes: Vec<String>,

    /// Output format: summary, json, or debug
    #[arg(short, long, default_value = "summary", value_name = "FORMAT")]
    output: String,

    /// Number of nodes shown in the summary
    #[arg(long, default_value_t = 10, value_name = "N")]
    top: usize,

    /// Report per-interval progress on stderr
    #[arg(long)]
    progress: bool,
}

fn main() {
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    let wg = match parse_weighted_graph(&source) {
        Ok(wg) => wg,
        Err(e) => {
            eprintln!("Parse/validation error: {}", e);
            process::exit(1);
        }
    };

    // Just validate when no computation was requested
    if cli.config.is_none() && cli.score_prefixes.is_empty() {
        println!("✓ Weighted graph validated successfully");
        println!(
            "  {} nodes, {} edges",
            wg.graph.node_count(),
            wg.graph.edge_count()
        );
        println!("\nRun with --score-prefix <prefix> or --config <file> to compute cred");
        return;
    }

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            process::exit(1);
        }
    };

    let mut report = |p: Progress| eprintln!("interval {}/{}", p.completed, p.total);
    let options = ComputeOptions {
        cancellation: None,
        progress: cli.progress.then_some(&mut report as &mut dyn FnMut(Progress)),
    };
    match compute_cred_with_options(&wg, &[], &config, options) {
        Ok(result) => match cli.output.as_str() {
            "json" => match serde_json::to_string_pretty(&result.to_json()) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing to JSON: {}", e);
                    process::exit(1);
                }
            },
            "debug" => {
                println!("{:#?}", result);
            }
            _ => {
                print_summary(&result, cli.top);
            }
        },
        Err(e) => {
            eprintln!("Error computing cred: {}", e);
            process::exit(1);
        }
    }
}

/// Builds the computation config from the config file and CLI flags. Prefix
/// flags win over the file's prefixes.
fn build_config(cli: &Cli) -> Result<CredConfig, String> {
    let prefixes = cli
        .score_prefixes
        .iter()
        .map(|raw| {
            NodeAddress::from_parts(raw.split('/'))
                .map_err(|e| format!("bad --score-prefix '{}': {}", raw, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading '{}': {}", path, e))?;
            serde_json::from_str::<CredConfig>(&text)
                .map_err(|e| format!("parsing '{}': {}", path, e))?
        }
        None => CredConfig::new(prefixes.clone()),
    };
    if !prefixes.is_empty() {
        config.score_prefixes = prefixes;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn print_summary(result: &CredResult, top: usize) {
    println!(
        "✓ Computed cred over {} intervals\n",
        result.intervals.len()
    );
    if let (Some(first), Some(last)) = (result.intervals.first(), result.intervals.last()) {
        println!(
            "Time range: [{}, {}) ms",
            first.start_time_ms, last.end_time_ms
        );
    }

    let mut totals: Vec<(&NodeAddress, f64)> = result
        .scores
        .iter()
        .map(|(address, row)| (address, row.iter().sum::<f64>()))
        .collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    println!("Top {} nodes by total cred:", top.min(totals.len()));
    for (address, total) in totals.iter().take(top) {
        println!("  {:>12.2}  {}", total, address);
    }
}
