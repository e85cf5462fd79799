//! Mixture-of-circuits molecular graph model.
//!
//! [`MolGraphModel`] owns the fixed triangular mask, the regime adapter, the
//! node and edge circuits, the mixture weights and (for size-prior models) the
//! node-count prior. Scoring is differentiable under an autodiff backend;
//! sampling never records gradients.

use crate::batch::MolGraphBatch;
use crate::conditional::ConditionalSampler;
use crate::evidence::{check_labels, GraphEvidence};
use crate::mixture::{MixtureCombiner, NodeCountPrior};
use crate::pair::CircuitPair;
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Int, Tensor};
use molpc_circuits::CircuitEngine;
use molpc_core::error::{ensure_shape, MolGraphError, Result};
use molpc_core::tensor_ops::{from_host_bool, to_host_i64};
use molpc_core::{MixtureVariant, ModelConfig, RegimeAdapter, TriangularMask, VariableGroup};
use molpc_samplers::{run_chunked, ChunkPlan};
use rand::RngCore;

/// Learnable tensors owned by the model itself (engines keep their own).
#[derive(Debug, Clone)]
pub struct ModelParams<B: Backend> {
    /// `[C]` mixture logits
    pub mixture_logits: Tensor<B, 1>,
    /// `[N]` node-count logits, size-prior models only
    pub node_count_logits: Option<Tensor<B, 1>>,
}

pub struct MolGraphModel<B: Backend> {
    config: ModelConfig,
    mask: TriangularMask,
    adapter: RegimeAdapter,
    circuits: CircuitPair<B>,
    mixture: MixtureCombiner<B>,
    prior: Option<NodeCountPrior<B>>,
    device: B::Device,
}

impl<B: Backend> MolGraphModel<B> {
    /// Assemble a model around two externally built circuit engines.
    pub fn new(
        config: ModelConfig,
        node_engine: Box<dyn CircuitEngine<B>>,
        edge_engine: Box<dyn CircuitEngine<B>>,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;
        let adapter = RegimeAdapter::new(
            config.regime,
            config.node_categories,
            config.edge_categories,
        )?;
        let circuits = CircuitPair::new(&config, &adapter, node_engine, edge_engine)?;
        Ok(Self::assemble(config, adapter, circuits, device))
    }

    /// Model whose circuits are both [`molpc_circuits::FactorizedCircuit`]s.
    pub fn factorized(config: ModelConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let adapter = RegimeAdapter::new(
            config.regime,
            config.node_categories,
            config.edge_categories,
        )?;
        let circuits = CircuitPair::factorized(&config, &adapter, device)?;
        Ok(Self::assemble(config, adapter, circuits, device))
    }

    fn assemble(
        config: ModelConfig,
        adapter: RegimeAdapter,
        circuits: CircuitPair<B>,
        device: &B::Device,
    ) -> Self {
        let prior = match config.variant {
            MixtureVariant::Plain => None,
            MixtureVariant::SizePrior => Some(NodeCountPrior::new(config.max_nodes, device)),
        };
        let model = Self {
            mask: TriangularMask::new(config.max_nodes),
            mixture: MixtureCombiner::new(config.num_components, device),
            adapter,
            circuits,
            prior,
            config,
            device: device.clone(),
        };
        log::info!(
            "Built {:?} model ({} regime): {} components, {} nodes, {} edges, {} parameters",
            model.config.variant,
            model.config.regime,
            model.config.num_components,
            model.config.max_nodes,
            model.mask.len(),
            model.num_parameters()
        );
        model
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn mask(&self) -> &TriangularMask {
        &self.mask
    }

    pub fn adapter(&self) -> &RegimeAdapter {
        &self.adapter
    }

    pub fn circuits(&self) -> &CircuitPair<B> {
        &self.circuits
    }

    pub fn mixture(&self) -> &MixtureCombiner<B> {
        &self.mixture
    }

    pub fn prior(&self) -> Option<&NodeCountPrior<B>> {
        self.prior.as_ref()
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Every learnable scalar: mixture logits, node-count logits and both engines.
    pub fn num_parameters(&self) -> usize {
        self.config.num_components
            + self.prior.as_ref().map_or(0, NodeCountPrior::max_nodes)
            + self.circuits.num_parameters()
    }

    pub fn params(&self) -> ModelParams<B> {
        ModelParams {
            mixture_logits: self.mixture.logits(),
            node_count_logits: self.prior.as_ref().map(NodeCountPrior::logits),
        }
    }

    pub fn set_params(&mut self, params: ModelParams<B>) -> Result<()> {
        self.mixture.set_logits(params.mixture_logits)?;
        match (&mut self.prior, params.node_count_logits) {
            (Some(prior), Some(logits)) => prior.set_logits(logits),
            (None, None) => Ok(()),
            (Some(_), None) | (None, Some(_)) => Err(MolGraphError::InvalidConfig(
                "node-count logits must be given exactly for size-prior models".into(),
            )),
        }
    }

    /// Per-example log-density `[batch]` of node labels `[batch, N]` and
    /// symmetric edge matrices `[batch, N, N]`.
    ///
    /// Every node label and every strictly-lower edge label must lie in the
    /// model's label range; the diagonal and upper triangle are not read.
    pub fn forward(&self, nodes: Tensor<B, 2, Int>, edges: Tensor<B, 3, Int>) -> Result<Tensor<B, 1>> {
        let n = self.config.max_nodes;
        let [batch, _] = nodes.dims();
        ensure_shape("node labels", &[batch, n], &nodes.dims())?;
        ensure_shape("edge labels", &[batch, n, n], &edges.dims())?;
        self.check_scored_labels(&nodes, &edges)?;

        let x = nodes.float();
        let l = self.mask.flatten(edges.float())?;

        match (self.config.variant, &self.prior) {
            (MixtureVariant::Plain, _) => {
                let nothing = |vars: usize| -> Tensor<B, 2, Bool> {
                    from_host_bool(vec![false; batch * vars], [batch, vars], &self.device)
                };
                let (xv, lv) = self.adapter.adapt(x, l);
                let ll_nodes = self.circuits.score(VariableGroup::Nodes, xv, nothing(n))?;
                let ll_edges =
                    self.circuits
                        .score(VariableGroup::Edges, lv, nothing(self.mask.len()))?;
                self.mixture.combine(ll_nodes, ll_edges)
            }
            (MixtureVariant::SizePrior, Some(prior)) => {
                let present = x.clone().greater_equal_elem(1.0);
                let counts: Vec<usize> = to_host_i64(present.clone().int().sum_dim(1))?
                    .into_iter()
                    .map(|c| c as usize)
                    .collect();
                let log_size = prior.log_prob(&counts, 0)?;

                let marginalized_edges = self.mask.pair_mask(present.clone())?.bool_not();
                let (xv, lv) = self.adapter.adapt(x.sub_scalar(1.0), l);
                let ll_nodes =
                    self.circuits
                        .score(VariableGroup::Nodes, xv, present.bool_not())?;
                let ll_edges = self
                    .circuits
                    .score(VariableGroup::Edges, lv, marginalized_edges)?;
                Ok(log_size + self.mixture.combine(ll_nodes, ll_edges)?)
            }
            (MixtureVariant::SizePrior, None) => Err(MolGraphError::InvalidConfig(
                "size-prior scoring needs a node-count prior".into(),
            )),
        }
    }

    fn check_scored_labels(&self, nodes: &Tensor<B, 2, Int>, edges: &Tensor<B, 3, Int>) -> Result<()> {
        let n = self.config.max_nodes;
        let slots: Vec<usize> = (0..n).collect();
        check_labels(
            "node",
            &to_host_i64(nodes.clone())?,
            n,
            &slots,
            self.config.max_node_label(),
            false,
        )?;
        check_labels(
            "edge",
            &to_host_i64(edges.clone())?,
            n * n,
            &self.mask.flat_indices(),
            self.config.max_edge_label(),
            false,
        )
    }

    /// Training objective: the batch mean of [`forward`](Self::forward), shape `[1]`.
    pub fn logpdf(&self, nodes: Tensor<B, 2, Int>, edges: Tensor<B, 3, Int>) -> Result<Tensor<B, 1>> {
        Ok(self.forward(nodes, edges)?.mean())
    }

    /// Sample `count` graphs, `chunk_size` rows at a time.
    ///
    /// With evidence, `count` must equal the number of evidence rows and each
    /// chunk sees the node and edge evidence of exactly its own rows.
    pub fn sample(
        &self,
        count: usize,
        evidence: &GraphEvidence<B>,
        chunk_size: usize,
        rng: &mut dyn RngCore,
    ) -> Result<MolGraphBatch<B>> {
        let plan = ChunkPlan::new(count, chunk_size)?;
        if let Some(rows) = evidence.batch_size()? {
            if rows != count {
                return Err(MolGraphError::CountMismatch {
                    requested: count,
                    evidence: rows,
                });
            }
        }
        evidence.validate(&self.config, &self.mask)?;
        if plan.is_empty() {
            return Ok(MolGraphBatch::empty(self.config.max_nodes, &self.device));
        }

        let sampler = ConditionalSampler {
            config: &self.config,
            mask: &self.mask,
            adapter: &self.adapter,
            circuits: &self.circuits,
            mixture: &self.mixture,
            prior: self.prior.as_ref(),
        };
        let parts = run_chunked(&plan, |rows| {
            let chunk = if evidence.is_empty() {
                GraphEvidence::none()
            } else {
                evidence.narrow(rows.start, rows.len())
            };
            sampler.sample(rows.len(), &chunk, rows.start, &mut *rng)
        })?;
        Ok(MolGraphBatch::cat(parts))
    }
}
