//! Circuit engine capability interface.
//!
//! A circuit engine is an opaque model over a fixed set of `V` variables, each
//! of dimensionality `D`, with `C` independent sub-circuits (components). The
//! mixture models only ever talk to an engine through [`CircuitEngine`]:
//!
//! - `log_likelihood` scores a batch under every component, summing out the
//!   variables flagged in a marginalization mask
//! - `sample` draws one assignment per requested component, copying observed
//!   evidence through unchanged
//!
//! Failures are precondition violations (shape mismatch, component index out
//! of range) and are returned as errors, never retried.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};
use molpc_core::error::{ensure_shape, MolGraphError, Result};
use molpc_core::regime::LeafFamily;
use molpc_core::tensor_ops::index_tensor;
use molpc_core::CircuitStructure;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Construction arguments of a circuit engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitArgs {
    /// Number of variables `V` in the engine's scope
    pub num_var: usize,
    /// Per-variable dimensionality `D`
    pub num_dims: usize,
    /// Number of components `C`
    pub num_classes: usize,
    /// Leaf distribution family and its parameters
    pub family: LeafFamily,
    /// Structural parameters, forwarded opaquely
    pub structure: CircuitStructure,
}

impl CircuitArgs {
    pub fn new(
        num_var: usize,
        num_dims: usize,
        num_classes: usize,
        family: LeafFamily,
        structure: CircuitStructure,
    ) -> Self {
        Self {
            num_var,
            num_dims,
            num_classes,
            family,
            structure,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(MolGraphError::InvalidConfig(
                "circuit needs at least one component".into(),
            ));
        }
        match self.family {
            LeafFamily::Categorical { categories } if categories < 1 => Err(
                MolGraphError::InvalidConfig("categorical leaves need at least one category".into()),
            ),
            LeafFamily::Categorical { .. } | LeafFamily::Binomial { .. } if self.num_dims != 1 => {
                Err(MolGraphError::InvalidConfig(format!(
                    "discrete leaves are one-dimensional, got num_dims = {}",
                    self.num_dims
                )))
            }
            LeafFamily::Normal { min_var, max_var } if !(0.0 < min_var && min_var <= max_var) => {
                Err(MolGraphError::InvalidConfig(format!(
                    "normal leaves need 0 < min_var <= max_var, got {min_var} and {max_var}"
                )))
            }
            LeafFamily::Normal { .. } if self.num_dims == 0 => Err(MolGraphError::InvalidConfig(
                "normal leaves need num_dims >= 1".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Expected `[batch, V, D]` shape of a value tensor.
    pub const fn value_shape(&self, batch: usize) -> [usize; 3] {
        [batch, self.num_var, self.num_dims]
    }

    /// Fail with [`MolGraphError::InvalidComponent`] unless every index is `< C`.
    pub fn check_components(&self, components: &[usize]) -> Result<()> {
        match components.iter().find(|&&c| c >= self.num_classes) {
            Some(&index) => Err(MolGraphError::InvalidComponent {
                index,
                components: self.num_classes,
            }),
            None => Ok(()),
        }
    }
}

/// Partial observation of an engine's variables.
///
/// Positions flagged in `marginalized` are unobserved; their entries in
/// `values` are ignored and may hold any finite placeholder.
#[derive(Debug, Clone)]
pub struct Evidence<B: Backend> {
    /// `[batch, V, D]`
    pub values: Tensor<B, 3>,
    /// `[batch, V]`, `true` = unobserved
    pub marginalized: Tensor<B, 2, Bool>,
}

impl<B: Backend> Evidence<B> {
    pub fn new(values: Tensor<B, 3>, marginalized: Tensor<B, 2, Bool>) -> Self {
        Self {
            values,
            marginalized,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.values.dims()[0]
    }

    /// Rows `start..start + len` of the evidence.
    pub fn narrow(&self, start: usize, len: usize) -> Self {
        Self {
            values: self.values.clone().narrow(0, start, len),
            marginalized: self.marginalized.clone().narrow(0, start, len),
        }
    }

    pub fn validate(&self, args: &CircuitArgs) -> Result<()> {
        let batch = self.batch_size();
        ensure_shape("evidence values", &args.value_shape(batch), &self.values.dims())?;
        ensure_shape(
            "evidence mask",
            &[batch, args.num_var],
            &self.marginalized.dims(),
        )
    }
}

/// Scoring and sampling capability of one circuit over one variable group.
pub trait CircuitEngine<B: Backend> {
    fn args(&self) -> &CircuitArgs;

    fn device(&self) -> B::Device;

    /// Per-component log-likelihood of `values`.
    ///
    /// # Arguments
    ///
    /// * `values` - `[batch, V, D]` circuit inputs
    /// * `marginalized` - `[batch, V]`, `true` positions are summed out
    ///
    /// # Returns
    ///
    /// `[batch, C]`. With no position marginalized this is the joint
    /// log-likelihood; with every position marginalized it is `0`.
    fn log_likelihood(
        &self,
        values: Tensor<B, 3>,
        marginalized: Tensor<B, 2, Bool>,
    ) -> Result<Tensor<B, 2>>;

    /// Draw one `[V, D]` assignment per entry of `components`.
    ///
    /// Observed evidence positions are copied through unchanged; the rest are
    /// sampled from the named component. Returns `[components.len(), V, D]`.
    fn sample(
        &self,
        components: &[usize],
        evidence: Option<&Evidence<B>>,
        rng: &mut dyn RngCore,
    ) -> Result<Tensor<B, 3>>;

    /// Number of learnable scalars.
    fn num_parameters(&self) -> usize;

    /// Log-likelihood restricted to the listed components, `[batch, components.len()]`.
    fn score(
        &self,
        values: Tensor<B, 3>,
        components: &[usize],
        marginalized: Tensor<B, 2, Bool>,
    ) -> Result<Tensor<B, 2>> {
        self.args().check_components(components)?;
        let ll = self.log_likelihood(values, marginalized)?;
        let device = ll.device();
        Ok(ll.select(1, index_tensor::<B>(components, &device)))
    }
}
