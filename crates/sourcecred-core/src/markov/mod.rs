//! Markov chain machinery for the cred computation.
//!
//! This module provides:
//! - **distribution**: Probability distributions over dense node indices
//! - **chain**: Sparse row-stochastic transition chains, stored transposed
//! - **process**: Translation from a weighted graph into a chain and seed
//! - **solver**: Iterative stationary-distribution solver with teleportation

pub mod chain;
pub mod distribution;
pub mod process;
pub mod solver;
