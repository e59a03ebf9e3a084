//! Half-open time intervals and temporal weight factors.
//!
//! The interval grid is aligned to multiples of the interval width using
//! floored division, so the same timestamps always land in the same
//! intervals regardless of where the observed range happens to start, and
//! negative timestamps are handled correctly.

use serde::{Deserialize, Serialize};

use crate::errors::CredError;
use crate::graph::Graph;

/// A half-open time window `[start_time_ms, end_time_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

impl Interval {
    /// True when `timestamp_ms` falls inside this interval.
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_time_ms <= timestamp_ms && timestamp_ms < self.end_time_ms
    }

    /// The interval's midpoint, the reference instant for decay.
    pub fn midpoint_ms(&self) -> i64 {
        self.start_time_ms + (self.end_time_ms - self.start_time_ms) / 2
    }
}

/// The ascending sequence of width-aligned intervals covering
/// `[min_timestamp_ms, max_timestamp_ms]`. Returns no intervals when the
/// range is empty (`max < min`).
pub fn interval_sequence(
    min_timestamp_ms: i64,
    max_timestamp_ms: i64,
    interval_width_ms: i64,
) -> Result<Vec<Interval>, CredError> {
    if interval_width_ms <= 0 {
        return Err(CredError::InvalidConfig(format!(
            "interval width must be positive, got {interval_width_ms}"
        )));
    }
    let mut intervals = Vec::new();
    let mut start = min_timestamp_ms.div_euclid(interval_width_ms) * interval_width_ms;
    while start <= max_timestamp_ms {
        intervals.push(Interval {
            start_time_ms: start,
            end_time_ms: start + interval_width_ms,
        });
        start += interval_width_ms;
    }
    Ok(intervals)
}

/// The interval sequence spanning all edge timestamps of a graph. A graph
/// with no edges has no intervals.
pub fn graph_intervals(graph: &Graph, interval_width_ms: i64) -> Result<Vec<Interval>, CredError> {
    let mut range: Option<(i64, i64)> = None;
    for edge in graph.edges() {
        let ts = edge.timestamp_ms;
        range = Some(match range {
            None => (ts, ts),
            Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
        });
    }
    match range {
        None => {
            // Still reject a bad width, so misconfiguration surfaces even
            // on an edgeless graph.
            interval_sequence(0, -1, interval_width_ms)
        }
        Some((lo, hi)) => interval_sequence(lo, hi, interval_width_ms),
    }
}

/// Scale factor an edge's weight receives in `interval`.
///
/// An edge contributes nothing before the interval containing its
/// timestamp. In its own interval it contributes at full weight when
/// `lambda` is zero, and decayed by the age at the interval midpoint
/// otherwise (clamped so an edge younger than the midpoint is not decayed
/// below full weight). With `lambda` zero, nothing carries into later
/// intervals; with positive `lambda`, later intervals see
/// `exp(-lambda * age_ms)`.
pub fn edge_decay_factor(interval: &Interval, timestamp_ms: i64, lambda: f64) -> f64 {
    if timestamp_ms >= interval.end_time_ms {
        return 0.0;
    }
    if lambda == 0.0 {
        return if timestamp_ms >= interval.start_time_ms {
            1.0
        } else {
            0.0
        };
    }
    let age_ms = (interval.midpoint_ms() - timestamp_ms).max(0) as f64;
    (-lambda * age_ms).exp()
}

/// Scale factor a node's weight receives in `interval`: timeless nodes
/// carry full weight everywhere, timestamped nodes none until the interval
/// they are born in.
pub fn node_presence_factor(interval: &Interval, timestamp_ms: Option<i64>) -> f64 {
    match timestamp_ms {
        None => 1.0,
        Some(ts) if ts < interval.end_time_ms => 1.0,
        Some(_) => 0.0,
    }
}
