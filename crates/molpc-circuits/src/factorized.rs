//! Fully factorized reference circuit.
//!
//! Every component is a product of independent leaves, one per variable:
//!
//! ```text
//! log p_c(x) = Σ_v log p_{c,v}(x_v)
//! ```
//!
//! This is the shallowest valid probabilistic circuit. Marginals are exact:
//! each leaf term is multiplied by its observation indicator, so summing out a
//! variable drops its term and an all-marginalized query scores exactly `0`.
//!
//! Leaf families:
//!
//! - Categorical: `log_softmax` over per-leaf logits
//! - Binomial: `ln C(n, x) + x·log σ(θ) + (n - x)·log σ(-θ)` with `n` trials
//! - Normal: diagonal Gaussian with variance `min + (max - min)·σ(raw)`
//!
//! Discrete scoring is a single matmul of one-hot evidence against the
//! flattened `[C, V·K]` log-probability table.

use crate::engine::{CircuitArgs, CircuitEngine, Evidence};
use burn::tensor::activation::{log_sigmoid, log_softmax, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Int, Tensor};
use molpc_core::error::{ensure_shape, MolGraphError, Result};
use molpc_core::regime::LeafFamily;
use molpc_core::tensor_ops::{from_host_f32, index_tensor, one_hot};
use molpc_core::RngKey;
use molpc_samplers::{categorical_sample, standard_normal};
use rand::{Rng, RngCore};
use std::f32::consts::PI;

/// Scale of the initial logits.
const INIT_SCALE: f32 = 0.1;

#[derive(Debug, Clone)]
enum Leaves<B: Backend> {
    /// `[C, V, K]` logits
    Categorical { logits: Tensor<B, 3> },
    /// `[C, V]` success logits
    Binomial { logits: Tensor<B, 2>, trials: usize },
    /// `[C, V, D]` means and unconstrained variances
    Normal {
        mean: Tensor<B, 3>,
        raw_var: Tensor<B, 3>,
        min_var: f32,
        max_var: f32,
    },
}

/// Product-of-leaves circuit with `C` components over `V` variables.
#[derive(Debug, Clone)]
pub struct FactorizedCircuit<B: Backend> {
    args: CircuitArgs,
    leaves: Leaves<B>,
    device: B::Device,
}

impl<B: Backend> FactorizedCircuit<B> {
    /// Build a circuit with parameters drawn from a stream keyed by
    /// `args.structure.seed`.
    pub fn new(args: CircuitArgs, device: &B::Device) -> Result<Self> {
        args.validate()?;
        let mut rng = RngKey::new(args.structure.seed).into_rng();
        let (c, v, d) = (args.num_classes, args.num_var, args.num_dims);

        let leaves = match args.family {
            LeafFamily::Categorical { categories } => Leaves::Categorical {
                logits: (standard_normal::<B, 3>([c, v, categories], &mut rng, device)
                    * INIT_SCALE)
                    .require_grad(),
            },
            LeafFamily::Binomial { trials } => Leaves::Binomial {
                logits: (standard_normal::<B, 2>([c, v], &mut rng, device) * INIT_SCALE)
                    .require_grad(),
                trials,
            },
            LeafFamily::Normal { min_var, max_var } => {
                // Dequantized inputs live in [0, 1 + noise), start the means inside it
                let mean: Vec<f32> = (0..c * v * d).map(|_| rng.gen::<f32>()).collect();
                Leaves::Normal {
                    mean: from_host_f32::<B, 3>(mean, [c, v, d], device).require_grad(),
                    raw_var: Tensor::zeros([c, v, d], device).require_grad(),
                    min_var,
                    max_var,
                }
            }
        };

        log::debug!(
            "Factorized circuit: {} components x {} variables x {} dims ({:?})",
            c,
            v,
            d,
            args.family
        );

        Ok(Self {
            args,
            leaves,
            device: device.clone(),
        })
    }

    /// Build a categorical circuit from explicit `[C, V, K]` logits.
    pub fn from_categorical_logits(args: CircuitArgs, logits: Tensor<B, 3>) -> Result<Self> {
        args.validate()?;
        let categories = match args.family {
            LeafFamily::Categorical { categories } => categories,
            other => {
                return Err(MolGraphError::InvalidConfig(format!(
                    "explicit categorical logits given for {other:?} leaves"
                )))
            }
        };
        ensure_shape(
            "categorical logits",
            &[args.num_classes, args.num_var, categories],
            &logits.dims(),
        )?;
        let device = logits.device();
        Ok(Self {
            args,
            leaves: Leaves::Categorical { logits },
            device,
        })
    }

    /// `[C, V, K']` leaf log-probabilities for discrete families, `None` for normal leaves.
    pub fn log_prob_table(&self) -> Option<Tensor<B, 3>> {
        match &self.leaves {
            Leaves::Categorical { logits } => Some(log_softmax(logits.clone(), 2)),
            Leaves::Binomial { logits, trials } => {
                Some(binomial_table(logits.clone(), *trials, &self.device))
            }
            Leaves::Normal { .. } => None,
        }
    }

    /// `([C, V, D]` means, `[C, V, D]` variances`)` for normal leaves.
    pub fn normal_params(&self) -> Option<(Tensor<B, 3>, Tensor<B, 3>)> {
        match &self.leaves {
            Leaves::Normal {
                mean,
                raw_var,
                min_var,
                max_var,
            } => Some((
                mean.clone(),
                bounded_variance(raw_var.clone(), *min_var, *max_var),
            )),
            _ => None,
        }
    }

    fn check_values(&self, values: &Tensor<B, 3>, marginalized: &Tensor<B, 2, Bool>) -> Result<usize> {
        let [batch, _, _] = values.dims();
        ensure_shape("circuit values", &self.args.value_shape(batch), &values.dims())?;
        ensure_shape(
            "marginalization mask",
            &[batch, self.args.num_var],
            &marginalized.dims(),
        )?;
        Ok(batch)
    }

    fn discrete_log_likelihood(
        &self,
        table: Tensor<B, 3>,
        values: Tensor<B, 3>,
        keep: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [c, v, k] = table.dims();
        let [batch, _, _] = values.dims();
        // Unknown sentinels fall outside [0, k) and one-hot to zero rows
        let observed = one_hot(values.reshape([batch, v]), k) * keep.reshape([batch, v, 1]);
        observed
            .reshape([batch, v * k])
            .matmul(table.reshape([c, v * k]).transpose())
    }

    fn normal_log_likelihood(
        &self,
        mean: Tensor<B, 3>,
        var: Tensor<B, 3>,
        values: Tensor<B, 3>,
        keep: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [c, v, d] = mean.dims();
        let [batch, _, _] = values.dims();
        let flat = |t: Tensor<B, 3>, rows: usize| t.reshape([rows, v * d]);

        let keep = keep.reshape([batch, v, 1]).repeat_dim(2, d);
        let precision = var.clone().recip();

        // -0.5 Σ k [(x - μ)²/σ² + ln 2πσ²], expanded so every term is a matmul
        let quadratic = flat((values.clone() * values.clone()) * keep.clone(), batch)
            .matmul(flat(precision.clone(), c).transpose());
        let cross = flat(values * keep.clone(), batch)
            .matmul(flat(mean.clone() * precision.clone(), c).transpose());
        let constant = flat(keep, batch).matmul(
            flat(
                mean.clone() * mean * precision + (var * (2.0 * PI)).log(),
                c,
            )
            .transpose(),
        );
        (quadratic - cross * 2.0 + constant) * -0.5
    }
}

fn bounded_variance<B: Backend>(raw_var: Tensor<B, 3>, min_var: f32, max_var: f32) -> Tensor<B, 3> {
    sigmoid(raw_var) * (max_var - min_var) + min_var
}

/// `ln C(n, x)` for `x = 0..=n`.
fn log_binomial_coefficients(trials: usize) -> Vec<f32> {
    let mut log_factorial = vec![0.0f64; trials + 1];
    for i in 1..=trials {
        log_factorial[i] = log_factorial[i - 1] + (i as f64).ln();
    }
    (0..=trials)
        .map(|x| (log_factorial[trials] - log_factorial[x] - log_factorial[trials - x]) as f32)
        .collect()
}

fn binomial_table<B: Backend>(logits: Tensor<B, 2>, trials: usize, device: &B::Device) -> Tensor<B, 3> {
    let [c, v] = logits.dims();
    let k = trials + 1;
    let successes = Tensor::<B, 1, Int>::arange(0..k as i64, device)
        .float()
        .reshape([1, 1, k])
        .repeat_dim(0, c)
        .repeat_dim(1, v);
    let failures = successes.clone().neg().add_scalar(trials as f64);
    let coefficients = from_host_f32::<B, 3>(log_binomial_coefficients(trials), [1, 1, k], device);

    let theta = logits.reshape([c, v, 1]).repeat_dim(2, k);
    successes * log_sigmoid(theta.clone()) + failures * log_sigmoid(theta.neg()) + coefficients
}

impl<B: Backend> CircuitEngine<B> for FactorizedCircuit<B> {
    fn args(&self) -> &CircuitArgs {
        &self.args
    }

    fn device(&self) -> B::Device {
        self.device.clone()
    }

    fn log_likelihood(
        &self,
        values: Tensor<B, 3>,
        marginalized: Tensor<B, 2, Bool>,
    ) -> Result<Tensor<B, 2>> {
        let batch = self.check_values(&values, &marginalized)?;
        log::trace!("Scoring {} rows over {} variables", batch, self.args.num_var);

        if self.args.num_var == 0 || batch == 0 {
            return Ok(Tensor::zeros([batch, self.args.num_classes], &self.device));
        }
        let keep = marginalized.bool_not().float();

        match self.normal_params() {
            Some((mean, var)) => Ok(self.normal_log_likelihood(mean, var, values, keep)),
            None => {
                let table = self
                    .log_prob_table()
                    .ok_or_else(|| MolGraphError::InvalidConfig("missing leaf table".into()))?;
                Ok(self.discrete_log_likelihood(table, values, keep))
            }
        }
    }

    fn sample(
        &self,
        components: &[usize],
        evidence: Option<&Evidence<B>>,
        rng: &mut dyn RngCore,
    ) -> Result<Tensor<B, 3>> {
        self.args.check_components(components)?;
        let count = components.len();
        if let Some(evidence) = evidence {
            evidence.validate(&self.args)?;
            if evidence.batch_size() != count {
                return Err(MolGraphError::shape(
                    "evidence rows",
                    &[count],
                    &[evidence.batch_size()],
                ));
            }
        }

        let (v, d) = (self.args.num_var, self.args.num_dims);
        if count == 0 || v == 0 {
            return Ok(Tensor::zeros([count, v, d], &self.device));
        }
        log::trace!("Sampling {} rows over {} variables", count, v);

        let index = index_tensor::<B>(components, &self.device);
        let drawn = match self.normal_params() {
            Some((mean, var)) => {
                let noise = standard_normal::<B, 3>([count, v, d], rng, &self.device);
                mean.select(0, index.clone()) + var.select(0, index).sqrt() * noise
            }
            None => {
                let table = self
                    .log_prob_table()
                    .ok_or_else(|| MolGraphError::InvalidConfig("missing leaf table".into()))?;
                let [_, _, k] = table.dims();
                let logits = table.select(0, index).reshape([count * v, k]);
                categorical_sample(logits, rng).float().reshape([count, v, 1])
            }
        };

        let drawn = match evidence {
            Some(evidence) => {
                let observed = evidence
                    .marginalized
                    .clone()
                    .bool_not()
                    .float()
                    .reshape([count, v, 1])
                    .repeat_dim(2, d);
                drawn * observed.clone().neg().add_scalar(1.0) + evidence.values.clone() * observed
            }
            None => drawn,
        };
        Ok(drawn.detach())
    }

    fn num_parameters(&self) -> usize {
        match &self.leaves {
            Leaves::Categorical { logits } => logits.shape().num_elements(),
            Leaves::Binomial { logits, .. } => logits.shape().num_elements(),
            Leaves::Normal { mean, raw_var, .. } => {
                mean.shape().num_elements() + raw_var.shape().num_elements()
            }
        }
    }
}
