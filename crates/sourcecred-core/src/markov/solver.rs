//! Stationary-distribution solver.
//!
//! Runs the damped power method: each step computes
//! `π' = (1 - α)·πᵀM + α·seed`, where α is the teleport probability. The
//! solve succeeds when the largest componentwise change drops below the
//! convergence epsilon, and fails loudly when the iteration cap is reached
//! or the deltas settle into a non-converging oscillation.

use std::collections::VecDeque;

use crate::errors::CredError;
use crate::markov::chain::SparseMarkovChain;
use crate::markov::distribution::{max_delta, renormalize, Distribution};

/// Number of recent deltas inspected for oscillation.
const OSCILLATION_WINDOW: usize = 8;

/// Iterations between renormalization passes. Each stochastic step only
/// drifts the total mass by rounding error, so an occasional cleanup keeps
/// π a probability distribution over long runs.
const RENORMALIZATION_PERIOD: u32 = 16;

/// Configuration for the stationary solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Teleport probability in [0, 1). Each step blends this much of the
    /// seed back into the distribution.
    pub alpha: f64,
    /// Convergence threshold on the max absolute componentwise delta.
    pub convergence_epsilon: f64,
    /// Iteration cap; hitting it fails with [`CredError::Diverged`].
    pub max_iterations: u32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            convergence_epsilon: 1e-7,
            max_iterations: 255,
        }
    }
}

impl SolverOptions {
    pub fn validate(self) -> Result<Self, CredError> {
        if !(0.0..1.0).contains(&self.alpha) {
            return Err(CredError::InvalidConfig(
                "solver: alpha must be in [0, 1)".into(),
            ));
        }
        if self.convergence_epsilon <= 0.0 || !self.convergence_epsilon.is_finite() {
            return Err(CredError::InvalidConfig(
                "solver: convergence_epsilon must be finite and > 0".into(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(CredError::InvalidConfig(
                "solver: max_iterations must be > 0".into(),
            ));
        }
        Ok(self)
    }
}

/// A converged stationary distribution with solve diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct StationaryResult {
    /// The stationary distribution, renormalized to unit mass.
    pub pi: Distribution,
    /// Number of iterations actually executed.
    pub iterations: u32,
    /// Max absolute componentwise delta of the final iteration.
    pub final_delta: f64,
}

/// Iterates `π' = (1 - α)·πᵀM + α·seed` from the seed until convergence.
///
/// The empty chain trivially succeeds with an empty distribution.
///
/// # Errors
///
/// - [`CredError::InvalidConfig`] for out-of-range options
/// - [`CredError::Diverged`] when `max_iterations` is exhausted
/// - [`CredError::Oscillating`] when the recent deltas stop improving
///   without converging, as happens on periodic chains with α = 0
pub fn find_stationary_distribution(
    chain: &SparseMarkovChain,
    seed: &[f64],
    options: &SolverOptions,
) -> Result<StationaryResult, CredError> {
    let options = options.validate()?;
    if seed.len() != chain.n() {
        return Err(CredError::Internal(format!(
            "seed length {} does not match chain size {}",
            seed.len(),
            chain.n()
        )));
    }
    if chain.n() == 0 {
        return Ok(StationaryResult {
            pi: Vec::new(),
            iterations: 0,
            final_delta: 0.0,
        });
    }

    let mut pi = seed.to_vec();
    let mut next = vec![0.0; chain.n()];
    let mut window: VecDeque<f64> = VecDeque::with_capacity(OSCILLATION_WINDOW);
    let mut delta = f64::INFINITY;

    for iteration in 1..=options.max_iterations {
        chain.apply(&pi, &mut next)?;
        if options.alpha > 0.0 {
            for (slot, seeded) in next.iter_mut().zip(seed.iter()) {
                *slot = (1.0 - options.alpha) * *slot + options.alpha * seeded;
            }
        }
        delta = max_delta(&next, &pi);
        std::mem::swap(&mut pi, &mut next);

        if delta < options.convergence_epsilon {
            renormalize(&mut pi);
            #[cfg(feature = "tracing")]
            tracing::debug!(iterations = iteration, delta, "stationary solve converged");
            return Ok(StationaryResult {
                pi,
                iterations: iteration,
                final_delta: delta,
            });
        }

        if iteration % RENORMALIZATION_PERIOD == 0 {
            renormalize(&mut pi);
        }

        if window.len() == OSCILLATION_WINDOW {
            window.pop_front();
        }
        window.push_back(delta);
        if window.len() == OSCILLATION_WINDOW && is_oscillating(&window, options.convergence_epsilon)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(iterations = iteration, delta, "stationary solve oscillating");
            return Err(CredError::Oscillating {
                iterations: iteration,
                delta,
            });
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        iterations = options.max_iterations,
        delta,
        "stationary solve exhausted its iteration cap"
    );
    Err(CredError::Diverged {
        iterations: options.max_iterations,
        delta,
    })
}

/// A full window of above-epsilon deltas oscillates when it is not strictly
/// decreasing and the net improvement across the window is below epsilon.
fn is_oscillating(window: &VecDeque<f64>, epsilon: f64) -> bool {
    let strictly_decreasing = window
        .iter()
        .zip(window.iter().skip(1))
        .all(|(previous, current)| current < previous);
    if strictly_decreasing {
        return false;
    }
    match (window.front(), window.back()) {
        (Some(oldest), Some(newest)) => oldest - newest < epsilon,
        _ => false,
    }
}
