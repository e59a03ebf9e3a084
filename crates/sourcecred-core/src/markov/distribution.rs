//! Probability distributions over dense node indices.

/// A probability distribution: entries are non-negative and sum to 1
/// (within floating-point tolerance). The empty vector is the distribution
/// over zero nodes.
pub type Distribution = Vec<f64>;

/// The uniform distribution over `n` indices.
pub fn uniform_distribution(n: usize) -> Distribution {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Normalizes non-negative weights into a distribution. Falls back to the
/// uniform distribution when every weight is zero.
pub fn weighted_distribution(weights: &[f64]) -> Distribution {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return uniform_distribution(weights.len());
    }
    weights.iter().map(|w| w / total).collect()
}

/// Largest absolute componentwise difference between two equal-length
/// distributions.
pub(crate) fn max_delta(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "distributions must have equal length");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Rescales entries so they sum to 1, leaving an all-zero slice unchanged.
pub(crate) fn renormalize(pi: &mut [f64]) {
    let total: f64 = pi.iter().sum();
    if total > 0.0 {
        for x in pi.iter_mut() {
            *x /= total;
        }
    }
}
