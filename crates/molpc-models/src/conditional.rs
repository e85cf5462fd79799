//! Conditional sampling of whole graphs.
//!
//! One call runs, for a chunk of rows:
//!
//! 1. evidence resolution into circuit inputs and marginalization masks
//! 2. a component draw from `softmax(ll_x + ll_a + log softmax(w))`
//! 3. a size draw from the node-count prior restricted to the sizes the
//!    evidence admits (size-prior models only)
//! 4. node and edge draws from the chosen components, evidence copied through
//! 5. padding of every node at or beyond the size, and of every edge touching one
//! 6. reconstruction of the symmetric edge matrices

use crate::batch::MolGraphBatch;
use crate::evidence::{resolve, GraphEvidence};
use crate::mixture::{MixtureCombiner, NodeCountPrior};
use crate::pair::CircuitPair;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use molpc_core::error::{MolGraphError, Result};
use molpc_core::tensor_ops::{from_host_bool, to_host_i64};
use molpc_core::{MixtureVariant, ModelConfig, RegimeAdapter, TriangularMask, VariableGroup, NO_BOND};
use molpc_samplers::categorical_sample;
use rand::RngCore;

/// Borrowed view of a model's parts used for one sampling call.
pub struct ConditionalSampler<'a, B: Backend> {
    pub config: &'a ModelConfig,
    pub mask: &'a TriangularMask,
    pub adapter: &'a RegimeAdapter,
    pub circuits: &'a CircuitPair<B>,
    pub mixture: &'a MixtureCombiner<B>,
    pub prior: Option<&'a NodeCountPrior<B>>,
}

impl<B: Backend> ConditionalSampler<'_, B> {
    /// Sample `count` graphs given `evidence` rows for exactly those graphs.
    ///
    /// With evidence, `count` must equal its number of rows. `offset` is the
    /// position of the first row in the overall request and only appears in
    /// error reports.
    pub fn sample(
        &self,
        count: usize,
        evidence: &GraphEvidence<B>,
        offset: usize,
        rng: &mut dyn RngCore,
    ) -> Result<MolGraphBatch<B>> {
        if let Some(rows) = evidence.batch_size()? {
            if rows != count {
                return Err(MolGraphError::CountMismatch {
                    requested: count,
                    evidence: rows,
                });
            }
        }
        evidence.validate(self.config, self.mask)?;

        let device = self.circuits.engine(VariableGroup::Nodes).device();
        if count == 0 {
            return Ok(MolGraphBatch::empty(self.mask.size(), &device));
        }
        let variant = self.config.variant;
        let resolved = resolve(evidence, count, offset, variant, self.adapter, self.mask)?;

        let components = self.mixture.num_components();
        let unconditional = || Tensor::<B, 2>::zeros([count, components], &device);
        let ll_nodes = match &resolved.nodes {
            Some(ev) => self.circuits.score(
                VariableGroup::Nodes,
                ev.values.clone(),
                ev.marginalized.clone(),
            )?,
            None => unconditional(),
        };
        let ll_edges = match &resolved.edges {
            Some(ev) => self.circuits.score(
                VariableGroup::Edges,
                ev.values.clone(),
                ev.marginalized.clone(),
            )?,
            None => unconditional(),
        };
        let posterior = self.mixture.joint(ll_nodes, ll_edges)?.detach();
        let chosen: Vec<usize> = to_host_i64(categorical_sample(posterior, rng))?
            .into_iter()
            .map(|c| c as usize)
            .collect();

        let sizes = match (variant, self.prior) {
            (MixtureVariant::Plain, _) => None,
            (MixtureVariant::SizePrior, Some(prior)) => {
                Some(self.sample_sizes(prior, &resolved.size_bounds, rng)?)
            }
            (MixtureVariant::SizePrior, None) => {
                return Err(MolGraphError::InvalidConfig(
                    "size-prior sampling needs a node-count prior".into(),
                ))
            }
        };

        let x = self
            .circuits
            .sample(VariableGroup::Nodes, &chosen, resolved.nodes.as_ref(), rng)?;
        let l = self
            .circuits
            .sample(VariableGroup::Edges, &chosen, resolved.edges.as_ref(), rng)?;
        let (x, l) = self.adapter.invert(x, l);

        let (x, l) = match sizes {
            Some(sizes) => self.pad_beyond_size(x, l, &sizes)?,
            None => (x, l),
        };
        let a = self.mask.unflatten(l, NO_BOND as f32)?;

        Ok(MolGraphBatch {
            nodes: x.int(),
            edges: a.int(),
        })
    }

    fn sample_sizes(
        &self,
        prior: &NodeCountPrior<B>,
        bounds: &[(usize, usize)],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<usize>> {
        let n = self.mask.size();
        let device = prior.logits().device();
        // logit k scores size k + 1
        let forbidden: Vec<bool> = bounds
            .iter()
            .flat_map(|&(lower, upper)| (1..=n).map(move |s| s < lower || s > upper))
            .collect();
        let forbidden = from_host_bool::<B, 2>(forbidden, [bounds.len(), n], &device);

        let drawn = categorical_sample(prior.masked_logits(forbidden)?, rng);
        let sizes: Vec<usize> = to_host_i64(drawn)?
            .into_iter()
            .map(|k| k as usize + 1)
            .collect();
        log::debug!("Resolved graph sizes for {} rows", sizes.len());
        Ok(sizes)
    }

    /// Shift sampled node labels back above padding and zero everything beyond
    /// each row's size.
    fn pad_beyond_size(
        &self,
        x: Tensor<B, 2>,
        l: Tensor<B, 2>,
        sizes: &[usize],
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>)> {
        let n = self.mask.size();
        let device = x.device();
        let present: Vec<bool> = sizes
            .iter()
            .flat_map(|&s| (0..n).map(move |i| i < s))
            .collect();
        let present = from_host_bool::<B, 2>(present, [sizes.len(), n], &device);
        let pairs = self.mask.pair_mask(present.clone())?.float();

        let nodes = x.add_scalar(1.0) * present.float();
        Ok((nodes, l * pairs))
    }
}
