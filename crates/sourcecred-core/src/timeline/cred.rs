//! The cred computation pipeline.
//!
//! One interval at a time: scale the resolved node and edge masses by the
//! interval's presence and decay factors, translate into a chain, solve for
//! the stationary distribution, then rescale so the total score of the
//! configured participant prefixes is a fixed constant. Any failure aborts
//! the whole run; no partial result is ever returned.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::address::NodeAddress;
use crate::compat::{Envelope, CRED_RESULT_TYPE};
use crate::declaration::PluginDeclaration;
use crate::errors::CredError;
use crate::markov::distribution::Distribution;
use crate::markov::process::{
    build_chain, build_seed, resolve_edge_masses, resolve_node_masses, EdgeMass, NodeIndex,
};
use crate::markov::solver::{find_stationary_distribution, SolverOptions};
use crate::timeline::interval::{
    edge_decay_factor, graph_intervals, node_presence_factor, Interval,
};
use crate::weighted_graph::WeightedGraph;

/// Every interval's scores are rescaled so the nodes matching the
/// configured prefixes sum to this constant.
pub const SCORE_TOTAL: f64 = 1000.0;

/// One week, the default interval width.
const DEFAULT_INTERVAL_WIDTH_MS: i64 = 7 * 86_400_000;

fn default_interval_width_ms() -> i64 {
    DEFAULT_INTERVAL_WIDTH_MS
}

fn default_alpha() -> f64 {
    0.05
}

fn default_convergence_epsilon() -> f64 {
    1e-7
}

fn default_max_iterations() -> u32 {
    255
}

/// Configuration for a cred computation. Every field except
/// `score_prefixes` has a default, so a serialized config may name only
/// the options it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredConfig {
    /// Width of one time slice.
    #[serde(default = "default_interval_width_ms")]
    pub interval_width_ms: i64,
    /// Teleport probability in [0, 1).
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Per-millisecond edge weight decay; zero confines each edge to the
    /// interval it was created in.
    #[serde(default)]
    pub decay_lambda: f64,
    /// Solver convergence threshold.
    #[serde(default = "default_convergence_epsilon")]
    pub convergence_epsilon: f64,
    /// Solver iteration cap.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Address prefixes whose total score is normalized to
    /// [`SCORE_TOTAL`]. Required and non-empty.
    pub score_prefixes: Vec<NodeAddress>,
}

impl CredConfig {
    /// A config with default options for the given participant prefixes.
    pub fn new(score_prefixes: Vec<NodeAddress>) -> CredConfig {
        CredConfig {
            interval_width_ms: default_interval_width_ms(),
            alpha: default_alpha(),
            decay_lambda: 0.0,
            convergence_epsilon: default_convergence_epsilon(),
            max_iterations: default_max_iterations(),
            score_prefixes,
        }
    }

    pub fn validate(&self) -> Result<(), CredError> {
        if self.interval_width_ms <= 0 {
            return Err(CredError::InvalidConfig(
                "cred: interval_width_ms must be positive".into(),
            ));
        }
        if self.decay_lambda < 0.0 || !self.decay_lambda.is_finite() {
            return Err(CredError::InvalidConfig(
                "cred: decay_lambda must be finite and >= 0".into(),
            ));
        }
        if self.score_prefixes.is_empty() {
            return Err(CredError::InvalidConfig(
                "cred: score_prefixes must name at least one prefix".into(),
            ));
        }
        self.solver_options().validate()?;
        Ok(())
    }

    fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            alpha: self.alpha,
            convergence_epsilon: self.convergence_epsilon,
            max_iterations: self.max_iterations,
        }
    }
}

/// Cooperative cancellation flag, checked between intervals. Clones share
/// the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Progress of a running computation, reported after each solved interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Optional hooks for a cred computation.
///
/// When a progress callback is set, intervals are solved sequentially so
/// reports arrive in order; without one, builds with the `rayon` feature
/// solve intervals in parallel. The outputs are identical either way.
#[derive(Default)]
pub struct ComputeOptions<'a> {
    pub cancellation: Option<&'a CancellationToken>,
    pub progress: Option<&'a mut dyn FnMut(Progress)>,
}

/// The output of a cred computation: one score per node per interval.
#[derive(Debug, Clone, PartialEq)]
pub struct CredResult {
    pub intervals: Vec<Interval>,
    pub scores: BTreeMap<NodeAddress, Vec<f64>>,
    pub plugins: Vec<PluginDeclaration>,
}

impl CredResult {
    /// A node's score summed over all intervals.
    pub fn total_cred(&self, address: &NodeAddress) -> Option<f64> {
        self.scores.get(address).map(|row| row.iter().sum())
    }

    /// Serializes into a versioned envelope.
    pub fn to_json(&self) -> CredResultJson {
        Envelope::new(
            CRED_RESULT_TYPE,
            CredResultPayload {
                intervals: self.intervals.clone(),
                scores: self
                    .scores
                    .iter()
                    .map(|(a, row)| (a.raw().to_string(), row.clone()))
                    .collect(),
                plugins: self.plugins.clone(),
            },
        )
    }

    /// Deserializes from a versioned envelope.
    pub fn from_json(json: CredResultJson) -> Result<CredResult, CredError> {
        let payload = json.open(CRED_RESULT_TYPE)?;
        let mut scores = BTreeMap::new();
        for (raw, row) in payload.scores {
            scores.insert(NodeAddress::from_raw(&raw)?, row);
        }
        Ok(CredResult {
            intervals: payload.intervals,
            scores,
            plugins: payload.plugins,
        })
    }
}

/// Payload of a serialized cred result. Score map keys are raw joined
/// addresses, and every score row has one entry per interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredResultPayload {
    pub intervals: Vec<Interval>,
    pub scores: BTreeMap<String, Vec<f64>>,
    pub plugins: Vec<PluginDeclaration>,
}

/// A cred result wrapped in its versioned envelope.
pub type CredResultJson = Envelope<CredResultPayload>;

/// Computes cred with default hooks.
pub fn compute_cred(
    wg: &WeightedGraph,
    declarations: &[PluginDeclaration],
    config: &CredConfig,
) -> Result<CredResult, CredError> {
    compute_cred_with_options(wg, declarations, config, ComputeOptions::default())
}

/// Computes cred with explicit cancellation and progress hooks.
pub fn compute_cred_with_options(
    wg: &WeightedGraph,
    declarations: &[PluginDeclaration],
    config: &CredConfig,
    mut options: ComputeOptions<'_>,
) -> Result<CredResult, CredError> {
    config.validate()?;
    for declaration in declarations {
        declaration.validate()?;
    }
    wg.weights.validate()?;

    let index = NodeIndex::from_graph(&wg.graph);
    let base_node_masses = resolve_node_masses(wg, &index)?;
    let base_edge_masses = resolve_edge_masses(wg, &index)?;
    let birth_timestamps: Vec<Option<i64>> =
        wg.graph.nodes().map(|n| n.timestamp_ms).collect();
    let matched: Vec<bool> = index
        .addresses()
        .map(|a| config.score_prefixes.iter().any(|p| a.has_prefix(p)))
        .collect();

    let intervals = graph_intervals(&wg.graph, config.interval_width_ms)?;
    #[cfg(feature = "tracing")]
    tracing::debug!(
        nodes = index.len(),
        edges = base_edge_masses.len(),
        intervals = intervals.len(),
        "starting cred computation"
    );

    let distributions = solve_all_intervals(
        &intervals,
        &base_node_masses,
        &base_edge_masses,
        &birth_timestamps,
        config,
        &mut options,
    )?;

    let mut scores: BTreeMap<NodeAddress, Vec<f64>> = index
        .addresses()
        .map(|a| (a.clone(), Vec::with_capacity(intervals.len())))
        .collect();
    for pi in &distributions {
        let rescaled = rescale_to_constant_total(pi, &matched);
        for (position, address) in index.addresses().enumerate() {
            if let Some(row) = scores.get_mut(address) {
                row.push(rescaled[position]);
            }
        }
    }

    Ok(CredResult {
        intervals,
        scores,
        plugins: declarations.to_vec(),
    })
}

/// Rescales one interval's distribution so the scores of matched nodes sum
/// to [`SCORE_TOTAL`]. The same factor applies to every node; when the
/// matched total is zero, scores pass through unscaled.
pub fn rescale_to_constant_total(pi: &[f64], matched: &[bool]) -> Vec<f64> {
    let matched_total: f64 = pi
        .iter()
        .zip(matched.iter())
        .filter(|(_, m)| **m)
        .map(|(p, _)| *p)
        .sum();
    let factor = if matched_total > 0.0 {
        SCORE_TOTAL / matched_total
    } else {
        1.0
    };
    pi.iter().map(|p| p * factor).collect()
}

fn check_cancelled(token: Option<&CancellationToken>) -> Result<(), CredError> {
    match token {
        Some(token) if token.is_cancelled() => Err(CredError::Cancelled),
        _ => Ok(()),
    }
}

fn solve_one_interval(
    interval: &Interval,
    base_node_masses: &[f64],
    base_edge_masses: &[EdgeMass],
    birth_timestamps: &[Option<i64>],
    solver_options: &SolverOptions,
    decay_lambda: f64,
) -> Result<Distribution, CredError> {
    let node_masses: Vec<f64> = base_node_masses
        .iter()
        .zip(birth_timestamps.iter())
        .map(|(mass, birth)| mass * node_presence_factor(interval, *birth))
        .collect();
    let edge_masses: Vec<EdgeMass> = base_edge_masses
        .iter()
        .map(|edge| {
            let factor = edge_decay_factor(interval, edge.timestamp_ms, decay_lambda);
            EdgeMass {
                forwards: edge.forwards * factor,
                backwards: edge.backwards * factor,
                ..*edge
            }
        })
        .collect();
    let chain = build_chain(&node_masses, &edge_masses);
    let seed = build_seed(&node_masses);
    find_stationary_distribution(&chain, &seed, solver_options).map(|result| result.pi)
}

fn solve_all_intervals(
    intervals: &[Interval],
    base_node_masses: &[f64],
    base_edge_masses: &[EdgeMass],
    birth_timestamps: &[Option<i64>],
    config: &CredConfig,
    options: &mut ComputeOptions<'_>,
) -> Result<Vec<Distribution>, CredError> {
    let solver_options = config.solver_options();
    let cancellation = options.cancellation;

    #[cfg(feature = "rayon")]
    if options.progress.is_none() {
        let results: Vec<Result<Distribution, CredError>> = intervals
            .par_iter()
            .map(|interval| {
                check_cancelled(cancellation)?;
                solve_one_interval(
                    interval,
                    base_node_masses,
                    base_edge_masses,
                    birth_timestamps,
                    &solver_options,
                    config.decay_lambda,
                )
            })
            .collect();
        // Surface the earliest interval's failure, whatever finished first.
        return results.into_iter().collect();
    }

    let mut distributions = Vec::with_capacity(intervals.len());
    for (position, interval) in intervals.iter().enumerate() {
        check_cancelled(cancellation)?;
        distributions.push(solve_one_interval(
            interval,
            base_node_masses,
            base_edge_masses,
            birth_timestamps,
            &solver_options,
            config.decay_lambda,
        )?);
        if let Some(progress) = options.progress.as_mut() {
            progress(Progress {
                completed: position + 1,
                total: intervals.len(),
            });
        }
    }
    Ok(distributions)
}
