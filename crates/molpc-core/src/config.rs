//! Model and sampling configuration.
//!
//! Configurations are plain TOML files, one per dataset and model:
//!
//! ```toml
//! name = "marg_sort"
//!
//! [model]
//! num_components = 64
//! max_nodes = 9
//! node_categories = 4
//! edge_categories = 4
//! variant = "size_prior"
//! regime = { kind = "categorical" }
//!
//! [model.node_circuit]
//! num_sums = 16
//! num_input_distributions = 16
//!
//! [sampling]
//! chunk_size = 2000
//! seed = 0
//! ```
//!
//! Every field of the circuit sections has a default, so they can be omitted.

use crate::error::{MolGraphError, Result};
use crate::regime::Regime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default number of samples per chunk during generation.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// How graph size is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixtureVariant {
    /// Fixed-size graphs; padding is an ordinary node category.
    Plain,
    /// Variable true size under fixed padding, with a categorical prior over
    /// the number of present nodes.
    SizePrior,
}

/// Structural parameters forwarded unchanged to a circuit engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitStructure {
    /// Sum nodes per region
    pub num_sums: usize,
    /// Leaf distributions per region
    pub num_input_distributions: usize,
    /// Independent random region graphs
    pub num_repetitions: usize,
    /// Region graph depth
    pub depth: usize,
    /// Topology and parameter initialization seed
    pub seed: u64,
}

impl Default for CircuitStructure {
    fn default() -> Self {
        Self {
            num_sums: 10,
            num_input_distributions: 10,
            num_repetitions: 1,
            depth: 2,
            seed: 0,
        }
    }
}

impl CircuitStructure {
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of mixture components `C`
    pub num_components: usize,
    /// Maximum node count `N`
    pub max_nodes: usize,
    /// Node categories `K_x` modelled by the node circuit
    pub node_categories: usize,
    /// Edge categories `K_e`, including the reserved no-bond label
    pub edge_categories: usize,
    pub variant: MixtureVariant,
    pub regime: Regime,
    #[serde(default)]
    pub node_circuit: CircuitStructure,
    #[serde(default = "default_edge_circuit")]
    pub edge_circuit: CircuitStructure,
}

fn default_edge_circuit() -> CircuitStructure {
    CircuitStructure::default().with_seed(1)
}

impl ModelConfig {
    pub fn new(
        num_components: usize,
        max_nodes: usize,
        node_categories: usize,
        edge_categories: usize,
        variant: MixtureVariant,
        regime: Regime,
    ) -> Self {
        Self {
            num_components,
            max_nodes,
            node_categories,
            edge_categories,
            variant,
            regime,
            node_circuit: CircuitStructure::default(),
            edge_circuit: default_edge_circuit(),
        }
    }

    /// Number of unordered node pairs, `N(N-1)/2`.
    pub const fn num_edges(&self) -> usize {
        self.max_nodes * self.max_nodes.saturating_sub(1) / 2
    }

    /// Largest caller-facing node label. Size-prior models reserve `0` for
    /// padding on top of the `K_x` modelled categories.
    pub const fn max_node_label(&self) -> i64 {
        match self.variant {
            MixtureVariant::Plain => self.node_categories as i64 - 1,
            MixtureVariant::SizePrior => self.node_categories as i64,
        }
    }

    /// Largest edge label, `K_e - 1`.
    pub const fn max_edge_label(&self) -> i64 {
        self.edge_categories as i64 - 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_components == 0 {
            return Err(MolGraphError::InvalidConfig(
                "num_components must be at least 1".into(),
            ));
        }
        if self.max_nodes == 0 {
            return Err(MolGraphError::InvalidConfig(
                "max_nodes must be at least 1".into(),
            ));
        }
        if self.node_categories < 2 || self.edge_categories < 2 {
            return Err(MolGraphError::InvalidConfig(format!(
                "node and edge categories must be at least 2, got {} and {}",
                self.node_categories, self.edge_categories
            )));
        }
        self.regime.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub chunk_size: usize,
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            seed: None,
        }
    }
}

/// A complete run configuration: which model, how it is built, how it samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    /// Registry name of the model, e.g. `marg_sort`
    pub name: String,
    pub model: ModelConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl HyperParams {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let params: HyperParams = toml::from_str(contents)?;
        params.model.validate()?;
        if params.sampling.chunk_size == 0 {
            return Err(MolGraphError::ZeroChunkSize);
        }
        Ok(params)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        log::debug!("Loaded configuration from {:?}", path);
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MolGraphError::InvalidConfig(e.to_string()))
    }
}
