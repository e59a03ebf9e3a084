//! Sparse row-stochastic Markov chains.
//!
//! The chain is stored transposed, in compressed sparse row form grouped by
//! *target*: row `t` lists the `(source, probability)` pairs of transitions
//! into `t`. One pass over that layout computes the full product πᵀM, which
//! is the inner loop of the stationary solver.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::errors::CredError;

/// Tolerance for checking that per-source probabilities sum to 1.
const STOCHASTIC_TOLERANCE: f64 = 1e-12;

/// A sparse Markov chain over `n` dense node indices.
///
/// Rows are stored back to back: the entries of target `t` occupy
/// `row_offsets[t]..row_offsets[t + 1]` in the `sources` and
/// `probabilities` arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMarkovChain {
    n: usize,
    row_offsets: Vec<usize>,
    sources: Vec<u32>,
    probabilities: Vec<f64>,
}

impl SparseMarkovChain {
    /// Builds a chain from per-target rows of `(source, probability)`
    /// pairs. Entry order within each row is preserved.
    pub fn from_rows(rows: Vec<Vec<(u32, f64)>>) -> SparseMarkovChain {
        let n = rows.len();
        let mut row_offsets = Vec::with_capacity(n + 1);
        let mut sources = Vec::new();
        let mut probabilities = Vec::new();
        row_offsets.push(0);
        for row in rows {
            for (source, probability) in row {
                sources.push(source);
                probabilities.push(probability);
            }
            row_offsets.push(sources.len());
        }
        SparseMarkovChain {
            n,
            row_offsets,
            sources,
            probabilities,
        }
    }

    /// Builds a chain from a dense transition matrix where `matrix[s][t]`
    /// is the probability of moving from `s` to `t`. Zero entries are
    /// dropped.
    ///
    /// Intended for tests and benchmarks; fails when the matrix is not
    /// square or a row is not a probability distribution.
    pub fn from_transition_matrix(matrix: &[Vec<f64>]) -> Result<SparseMarkovChain, CredError> {
        let n = matrix.len();
        for (s, row) in matrix.iter().enumerate() {
            if row.len() != n {
                return Err(CredError::Internal(format!(
                    "transition matrix row {s} has length {} in a matrix of size {n}",
                    row.len()
                )));
            }
            if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(CredError::Internal(format!(
                    "transition matrix row {s} has a negative or non-finite entry"
                )));
            }
            let total: f64 = row.iter().sum();
            if (total - 1.0).abs() > STOCHASTIC_TOLERANCE {
                return Err(CredError::Internal(format!(
                    "transition matrix row {s} sums to {total}, expected 1"
                )));
            }
        }
        let mut rows: Vec<Vec<(u32, f64)>> = vec![Vec::new(); n];
        for (s, row) in matrix.iter().enumerate() {
            for (t, p) in row.iter().enumerate() {
                if *p != 0.0 {
                    rows[t].push((s as u32, *p));
                }
            }
        }
        Ok(SparseMarkovChain::from_rows(rows))
    }

    /// Number of nodes.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The `(sources, probabilities)` slices of transitions into `target`.
    pub fn in_neighbors(&self, target: usize) -> (&[u32], &[f64]) {
        let lo = self.row_offsets[target];
        let hi = self.row_offsets[target + 1];
        (&self.sources[lo..hi], &self.probabilities[lo..hi])
    }

    /// One multiplication step: `out[t] = Σ pi[source] * probability` over
    /// the entries of target `t`. No teleportation is applied here. Fails
    /// when either slice length does not match the chain size.
    pub fn apply(&self, pi: &[f64], out: &mut [f64]) -> Result<(), CredError> {
        if pi.len() != self.n || out.len() != self.n {
            return Err(CredError::Internal(format!(
                "apply: slice lengths {} and {} do not match chain size {}",
                pi.len(),
                out.len(),
                self.n
            )));
        }
        #[cfg(feature = "rayon")]
        {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(target, slot)| *slot = self.mass_into(target, pi));
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (target, slot) in out.iter_mut().enumerate() {
                *slot = self.mass_into(target, pi);
            }
        }
        Ok(())
    }

    fn mass_into(&self, target: usize, pi: &[f64]) -> f64 {
        let (sources, probabilities) = self.in_neighbors(target);
        let mut mass = 0.0;
        for (source, probability) in sources.iter().zip(probabilities.iter()) {
            mass += pi[*source as usize] * probability;
        }
        mass
    }

    /// Checks the stochastic invariant: every source index is in range,
    /// every probability lies in `[0, 1]`, and the outgoing probabilities
    /// of each source sum to 1.
    pub fn validate(&self) -> Result<(), CredError> {
        let mut out_sums = vec![0.0; self.n];
        for (source, probability) in self.sources.iter().zip(self.probabilities.iter()) {
            if *source as usize >= self.n {
                return Err(CredError::Internal(format!(
                    "chain references source {source} outside 0..{}",
                    self.n
                )));
            }
            if !probability.is_finite() || *probability < 0.0 || *probability > 1.0 {
                return Err(CredError::Internal(format!(
                    "chain probability {probability} from source {source} is outside [0, 1]"
                )));
            }
            out_sums[*source as usize] += probability;
        }
        for (source, total) in out_sums.iter().enumerate() {
            if (total - 1.0).abs() > STOCHASTIC_TOLERANCE {
                return Err(CredError::Internal(format!(
                    "outgoing probabilities of source {source} sum to {total}, expected 1"
                )));
            }
        }
        Ok(())
    }
}
