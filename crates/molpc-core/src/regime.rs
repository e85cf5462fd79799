//! Numeric encoding regimes.
//!
//! A regime decides how integer labels are presented to the circuits and which
//! leaf family the circuits use:
//!
//! | Regime | Circuit input | Leaf family |
//! |--------|---------------|-------------|
//! | [`Regime::Categorical`] | label index | Categorical over `K` |
//! | [`Regime::Binomial`] | label index | Binomial with `K - 1` trials |
//! | [`Regime::Dequantized`] | one-hot + uniform noise | Normal, bounded variance |
//!
//! The regime is picked once when a model is built and the resulting
//! [`RegimeAdapter`] is used unchanged for the lifetime of the model.

use crate::error::{MolGraphError, Result};
use crate::tensor_ops::{argmax_lowest, one_hot};
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower variance bound of dequantized normal leaves.
pub const DEQ_MIN_VAR: f32 = 1e-3;
/// Upper variance bound of dequantized normal leaves.
pub const DEQ_MAX_VAR: f32 = 1e-1;
/// Default dequantization noise coefficient for nodes and edges.
pub const DEFAULT_NOISE: f32 = 0.6;

const fn default_noise() -> f32 {
    DEFAULT_NOISE
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regime {
    Categorical,
    Binomial,
    Dequantized {
        #[serde(default = "default_noise")]
        node_noise: f32,
        #[serde(default = "default_noise")]
        edge_noise: f32,
    },
}

impl Regime {
    pub const fn dequantized() -> Self {
        Regime::Dequantized {
            node_noise: DEFAULT_NOISE,
            edge_noise: DEFAULT_NOISE,
        }
    }

    /// Leaf family the circuits use for a variable with `k` categories.
    pub fn leaf_family(&self, k: usize) -> LeafFamily {
        match self {
            Regime::Categorical => LeafFamily::Categorical { categories: k },
            Regime::Binomial => LeafFamily::Binomial {
                trials: k.saturating_sub(1),
            },
            Regime::Dequantized { .. } => LeafFamily::Normal {
                min_var: DEQ_MIN_VAR,
                max_var: DEQ_MAX_VAR,
            },
        }
    }

    /// Per-variable dimensionality of circuit inputs.
    pub const fn num_dims(&self, k: usize) -> usize {
        match self {
            Regime::Categorical | Regime::Binomial => 1,
            Regime::Dequantized { .. } => k,
        }
    }

    pub const fn is_continuous(&self) -> bool {
        matches!(self, Regime::Dequantized { .. })
    }

    pub fn validate(&self) -> Result<()> {
        if let Regime::Dequantized {
            node_noise,
            edge_noise,
        } = self
        {
            for (name, value) in [("node_noise", node_noise), ("edge_noise", edge_noise)] {
                if !(0.0..=1.0).contains(value) {
                    return Err(MolGraphError::InvalidConfig(format!(
                        "{name} must lie in [0, 1], got {value}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Categorical => write!(f, "cat"),
            Regime::Binomial => write!(f, "bin"),
            Regime::Dequantized { .. } => write!(f, "deq"),
        }
    }
}

impl FromStr for Regime {
    type Err = MolGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cat" | "categorical" => Ok(Regime::Categorical),
            "bin" | "binomial" => Ok(Regime::Binomial),
            "deq" | "dequantized" => Ok(Regime::dequantized()),
            other => Err(MolGraphError::UnsupportedRegime(other.to_string())),
        }
    }
}

/// Leaf distribution family handed to a circuit engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum LeafFamily {
    Categorical { categories: usize },
    Binomial { trials: usize },
    Normal { min_var: f32, max_var: f32 },
}

impl LeafFamily {
    /// Number of discrete outcomes, `None` for continuous leaves.
    pub const fn outcomes(&self) -> Option<usize> {
        match self {
            LeafFamily::Categorical { categories } => Some(*categories),
            LeafFamily::Binomial { trials } => Some(*trials + 1),
            LeafFamily::Normal { .. } => None,
        }
    }
}

/// Which variable group a tensor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableGroup {
    Nodes,
    Edges,
}

/// Converts label tensors to circuit inputs and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeAdapter {
    regime: Regime,
    node_categories: usize,
    edge_categories: usize,
}

impl RegimeAdapter {
    pub fn new(regime: Regime, node_categories: usize, edge_categories: usize) -> Result<Self> {
        regime.validate()?;
        Ok(Self {
            regime,
            node_categories,
            edge_categories,
        })
    }

    pub const fn regime(&self) -> Regime {
        self.regime
    }

    pub const fn categories(&self, group: VariableGroup) -> usize {
        match group {
            VariableGroup::Nodes => self.node_categories,
            VariableGroup::Edges => self.edge_categories,
        }
    }

    pub fn leaf_family(&self, group: VariableGroup) -> LeafFamily {
        self.regime.leaf_family(self.categories(group))
    }

    pub const fn num_dims(&self, group: VariableGroup) -> usize {
        self.regime.num_dims(self.categories(group))
    }

    fn noise(&self, group: VariableGroup) -> f32 {
        match (self.regime, group) {
            (Regime::Dequantized { node_noise, .. }, VariableGroup::Nodes) => node_noise,
            (Regime::Dequantized { edge_noise, .. }, VariableGroup::Edges) => edge_noise,
            _ => 0.0,
        }
    }

    /// Encode `[batch, V]` float labels as `[batch, V, D]` circuit inputs.
    ///
    /// In the dequantized regime each one-hot vector is perturbed by
    /// `noise * U[0, 1)` drawn from the backend's global random source.
    pub fn encode<B: Backend>(&self, labels: Tensor<B, 2>, group: VariableGroup) -> Tensor<B, 3> {
        let exact = self.encode_exact(labels, group);
        let noise = self.noise(group);
        if !self.regime.is_continuous() || noise == 0.0 {
            return exact;
        }
        let device = exact.device();
        let uniform = Tensor::random(exact.dims(), Distribution::Uniform(0.0, 1.0), &device);
        exact + uniform * noise
    }

    /// Encode without dequantization noise. Used for conditioning evidence.
    pub fn encode_exact<B: Backend>(&self, labels: Tensor<B, 2>, group: VariableGroup) -> Tensor<B, 3> {
        let [batch, vars] = labels.dims();
        match self.regime {
            Regime::Categorical | Regime::Binomial => labels.reshape([batch, vars, 1]),
            Regime::Dequantized { .. } => one_hot(labels, self.categories(group)),
        }
    }

    /// Decode `[batch, V, D]` circuit outputs back to `[batch, V]` float labels.
    ///
    /// Dequantized vectors decode to their arg-max dimension, lowest index on ties.
    pub fn decode<B: Backend>(&self, values: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, vars, _] = values.dims();
        match self.regime {
            Regime::Categorical | Regime::Binomial => values.reshape([batch, vars]),
            Regime::Dequantized { .. } => argmax_lowest(values),
        }
    }

    /// Encode node labels `[batch, N]` and flattened edge labels `[batch, E]`.
    pub fn adapt<B: Backend>(
        &self,
        nodes: Tensor<B, 2>,
        edges: Tensor<B, 2>,
    ) -> (Tensor<B, 3>, Tensor<B, 3>) {
        (
            self.encode(nodes, VariableGroup::Nodes),
            self.encode(edges, VariableGroup::Edges),
        )
    }

    /// Inverse of [`adapt`](Self::adapt) for exact simplex vertices.
    pub fn invert<B: Backend>(
        &self,
        nodes: Tensor<B, 3>,
        edges: Tensor<B, 3>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (self.decode(nodes), self.decode(edges))
    }
}
