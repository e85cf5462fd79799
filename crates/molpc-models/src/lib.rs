//! # molpc-models
//!
//! Mixture-of-circuits molecular graph models.
//!
//! A model combines a node circuit and an edge circuit through learned
//! mixture weights. Two variants exist:
//!
//! - [`MixtureVariant::Plain`](molpc_core::MixtureVariant::Plain) (`molspn_zero_sort`):
//!   fixed-size graphs, padding is an ordinary node category
//! - [`MixtureVariant::SizePrior`](molpc_core::MixtureVariant::SizePrior) (`marg_sort`):
//!   padding is summed out of both circuits and a categorical prior scores the
//!   number of present nodes
//!
//! ```rust
//! use molpc_core::backend::{init_cpu_device, CpuBackend};
//! use molpc_core::{MixtureVariant, ModelConfig, Regime, RngKey, DEFAULT_CHUNK_SIZE};
//! use molpc_models::{GraphEvidence, MolGraphModel};
//!
//! let device = init_cpu_device();
//! let config = ModelConfig::new(4, 5, 3, 3, MixtureVariant::SizePrior, Regime::Categorical);
//! let model = MolGraphModel::<CpuBackend>::factorized(config, &device).unwrap();
//!
//! let mut rng = RngKey::new(0).into_rng();
//! let batch = model
//!     .sample(8, &GraphEvidence::none(), DEFAULT_CHUNK_SIZE, &mut rng)
//!     .unwrap();
//! assert_eq!(batch.edges.dims(), [8, 5, 5]);
//! ```

#![recursion_limit = "256"] // Required for burn-wgpu

pub mod batch;
pub mod conditional;
pub mod evidence;
pub mod mixture;
pub mod model;
pub mod pair;
pub mod registry;

pub use batch::*;
pub use conditional::ConditionalSampler;
pub use evidence::GraphEvidence;
pub use mixture::*;
pub use model::*;
pub use pair::*;
pub use registry::*;
