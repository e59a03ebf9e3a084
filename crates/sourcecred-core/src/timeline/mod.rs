//! Time-sliced cred computation.
//!
//! This module provides:
//! - **interval**: Half-open time windows and temporal weight factors
//! - **cred**: The orchestrator that solves one chain per interval and
//!   normalizes scores
//! - **decomposition**: Per-node breakdown of a score into the connections
//!   that produced it

pub mod cred;
pub mod decomposition;
pub mod interval;
