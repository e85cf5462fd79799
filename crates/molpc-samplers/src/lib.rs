//! # molpc-samplers
//!
//! Sampling primitives for mixture-of-circuits graph models:
//!
//! - [`categorical_sample`]: Gumbel-max categorical draws, one per row of logits
//! - [`standard_normal`]: Gaussian noise for continuous leaves
//! - [`ChunkPlan`] / [`run_chunked`]: partition a large request into bounded chunks
//!
//! All draws come from a caller-owned [`rand::RngCore`], usually built from an
//! [`molpc_core::RngKey`]:
//!
//! ```rust
//! use molpc_samplers::ChunkPlan;
//!
//! let plan = ChunkPlan::new(5000, 2000).unwrap();
//! assert_eq!(plan.sizes(), vec![2000, 2000, 1000]);
//! ```

#![recursion_limit = "256"] // Required for burn-wgpu

pub mod categorical;
pub mod chunk;

pub use categorical::*;
pub use chunk::*;
