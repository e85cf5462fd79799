//! # molpc-core
//!
//! Foundational pieces for mixture-of-circuits molecular graph models:
//!
//! - [`TriangularMask`]: the fixed codec between symmetric `N x N` edge matrices
//!   and flat vectors of their `N(N-1)/2` strictly-lower entries
//! - [`Regime`] / [`RegimeAdapter`]: categorical, binomial-style and dequantized
//!   encodings, plus the [`LeafFamily`] each one asks the circuits for
//! - [`ModelConfig`] / [`HyperParams`]: TOML-backed configuration
//! - [`MolGraphError`]: the workspace error type
//! - [`RngKey`]: reproducible random streams for sampling
//!
//! ## Label conventions
//!
//! | Constant | Value | Meaning |
//! |----------|-------|---------|
//! | [`UNKNOWN`] | `-1` | unobserved evidence position |
//! | [`PADDING`] | `0` | "no atom" node label (size-prior models) |
//! | [`NO_BOND`] | `0` | "no bond" edge label, also the matrix diagonal |
//!
//! ```rust
//! use molpc_core::TriangularMask;
//!
//! let mask = TriangularMask::new(4);
//! assert_eq!(mask.len(), 6);
//! assert_eq!(mask.positions()[0], (1, 0));
//! ```

#![recursion_limit = "256"] // Required for burn-wgpu

pub mod backend;
pub mod config;
pub mod error;
pub mod regime;
pub mod rng;
pub mod tensor_ops;
pub mod triangular;

pub use backend::*;
pub use config::*;
pub use error::*;
pub use regime::*;
pub use rng::*;
pub use triangular::*;

/// Evidence sentinel for an unobserved node or edge.
pub const UNKNOWN: i64 = -1;
/// Node label for an absent atom.
pub const PADDING: i64 = 0;
/// Edge label for an absent bond.
pub const NO_BOND: i64 = 0;
