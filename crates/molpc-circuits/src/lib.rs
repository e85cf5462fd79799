//! # molpc-circuits
//!
//! The boundary between the mixture models and the probabilistic circuits
//! that score and sample each variable group.
//!
//! - [`CircuitEngine`]: per-component scoring with marginalization, and
//!   conditional sampling with evidence copy-through
//! - [`CircuitArgs`]: scope, dimensionality, component count and leaf family
//! - [`FactorizedCircuit`]: reference engine whose components are products of
//!   independent leaves
//!
//! Any engine that honours the [`CircuitEngine`] contract can be plugged into
//! a model in place of [`FactorizedCircuit`].

#![recursion_limit = "256"] // Required for burn-wgpu

pub mod engine;
pub mod factorized;

pub use engine::*;
pub use factorized::*;
