//! Node and edge circuits of one model.

use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};
use molpc_circuits::{CircuitArgs, CircuitEngine, Evidence, FactorizedCircuit};
use molpc_core::error::{MolGraphError, Result};
use molpc_core::{ModelConfig, RegimeAdapter, VariableGroup};
use rand::RngCore;

/// Two independent circuits: one over the `N` node variables, one over the
/// `N(N-1)/2` flattened edge variables. Both share the component count `C`.
pub struct CircuitPair<B: Backend> {
    nodes: Box<dyn CircuitEngine<B>>,
    edges: Box<dyn CircuitEngine<B>>,
}

impl<B: Backend> CircuitPair<B> {
    /// Pair two engines, checking each against the scope the model needs.
    pub fn new(
        config: &ModelConfig,
        adapter: &RegimeAdapter,
        nodes: Box<dyn CircuitEngine<B>>,
        edges: Box<dyn CircuitEngine<B>>,
    ) -> Result<Self> {
        for (group, engine) in [(VariableGroup::Nodes, &nodes), (VariableGroup::Edges, &edges)] {
            let expected = expected_args(config, adapter, group);
            let actual = engine.args();
            if actual.num_var != expected.num_var
                || actual.num_dims != expected.num_dims
                || actual.num_classes != expected.num_classes
                || actual.family != expected.family
            {
                return Err(MolGraphError::InvalidConfig(format!(
                    "{group:?} engine has {} vars x {} dims x {} components ({:?}), \
                     model needs {} x {} x {} ({:?})",
                    actual.num_var,
                    actual.num_dims,
                    actual.num_classes,
                    actual.family,
                    expected.num_var,
                    expected.num_dims,
                    expected.num_classes,
                    expected.family
                )));
            }
        }
        Ok(Self { nodes, edges })
    }

    /// Pair of [`FactorizedCircuit`]s built from the config's circuit sections.
    pub fn factorized(
        config: &ModelConfig,
        adapter: &RegimeAdapter,
        device: &B::Device,
    ) -> Result<Self> {
        let nodes = FactorizedCircuit::<B>::new(
            expected_args(config, adapter, VariableGroup::Nodes),
            device,
        )?;
        let edges = FactorizedCircuit::<B>::new(
            expected_args(config, adapter, VariableGroup::Edges),
            device,
        )?;
        Self::new(config, adapter, Box::new(nodes), Box::new(edges))
    }

    pub fn engine(&self, group: VariableGroup) -> &dyn CircuitEngine<B> {
        match group {
            VariableGroup::Nodes => self.nodes.as_ref(),
            VariableGroup::Edges => self.edges.as_ref(),
        }
    }

    /// `[batch, C]` log-likelihoods of one group under every component.
    pub fn score(
        &self,
        group: VariableGroup,
        values: Tensor<B, 3>,
        marginalized: Tensor<B, 2, Bool>,
    ) -> Result<Tensor<B, 2>> {
        self.engine(group).log_likelihood(values, marginalized)
    }

    pub fn sample(
        &self,
        group: VariableGroup,
        components: &[usize],
        evidence: Option<&Evidence<B>>,
        rng: &mut dyn RngCore,
    ) -> Result<Tensor<B, 3>> {
        self.engine(group).sample(components, evidence, rng)
    }

    pub fn num_parameters(&self) -> usize {
        self.nodes.num_parameters() + self.edges.num_parameters()
    }
}

/// Engine arguments a model expects for one variable group.
pub fn expected_args(
    config: &ModelConfig,
    adapter: &RegimeAdapter,
    group: VariableGroup,
) -> CircuitArgs {
    let (num_var, structure) = match group {
        VariableGroup::Nodes => (config.max_nodes, config.node_circuit),
        VariableGroup::Edges => (config.num_edges(), config.edge_circuit),
    };
    CircuitArgs::new(
        num_var,
        adapter.num_dims(group),
        config.num_components,
        adapter.leaf_family(group),
        structure,
    )
}
