//! Mixture weights and the node-count prior.
//!
//! ```text
//! plain:      log p(x, a) =          logsumexp_c( ll_x[c] + ll_a[c] + log softmax(w)[c] )
//! size prior: log p(x, a) = log p(n) + logsumexp_c( ll_x[c] + ll_a[c] + log softmax(w)[c] )
//! ```
//!
//! where `n` is the number of present nodes minus one. The size term sits
//! outside the log-sum-exp since size is observed, not latent.

use burn::tensor::activation::log_softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor};
use molpc_core::error::{ensure_shape, MolGraphError, Result};
use molpc_core::tensor_ops::{index_tensor, logsumexp_rows};

/// Learned log-mixture weights over `C` components.
#[derive(Debug, Clone)]
pub struct MixtureCombiner<B: Backend> {
    logits: Tensor<B, 1>,
}

impl<B: Backend> MixtureCombiner<B> {
    pub fn new(num_components: usize, device: &B::Device) -> Self {
        Self {
            logits: Tensor::zeros([num_components], device).require_grad(),
        }
    }

    pub fn num_components(&self) -> usize {
        self.logits.dims()[0]
    }

    /// Raw `[C]` logits `w`.
    pub fn logits(&self) -> Tensor<B, 1> {
        self.logits.clone()
    }

    pub fn set_logits(&mut self, logits: Tensor<B, 1>) -> Result<()> {
        ensure_shape("mixture logits", &self.logits.dims(), &logits.dims())?;
        self.logits = logits;
        Ok(())
    }

    /// `log softmax(w)`, `[C]`.
    pub fn log_weights(&self) -> Tensor<B, 1> {
        log_softmax(self.logits.clone(), 0)
    }

    /// Per-component joint log-weights `ll_x + ll_a + log softmax(w)`, `[batch, C]`.
    pub fn joint(&self, ll_nodes: Tensor<B, 2>, ll_edges: Tensor<B, 2>) -> Result<Tensor<B, 2>> {
        let [batch, components] = ll_nodes.dims();
        ensure_shape(
            "node log-likelihoods",
            &[batch, self.num_components()],
            &[batch, components],
        )?;
        ensure_shape("edge log-likelihoods", &ll_nodes.dims(), &ll_edges.dims())?;
        let log_weights = self.log_weights().reshape([1, components]);
        Ok(ll_nodes + ll_edges + log_weights)
    }

    /// `logsumexp_c` of [`joint`](Self::joint), `[batch]`.
    pub fn combine(&self, ll_nodes: Tensor<B, 2>, ll_edges: Tensor<B, 2>) -> Result<Tensor<B, 1>> {
        Ok(logsumexp_rows(self.joint(ll_nodes, ll_edges)?))
    }
}

/// Categorical prior over the number of present nodes minus one.
#[derive(Debug, Clone)]
pub struct NodeCountPrior<B: Backend> {
    logits: Tensor<B, 1>,
}

impl<B: Backend> NodeCountPrior<B> {
    pub fn new(max_nodes: usize, device: &B::Device) -> Self {
        Self {
            logits: Tensor::zeros([max_nodes], device).require_grad(),
        }
    }

    pub fn max_nodes(&self) -> usize {
        self.logits.dims()[0]
    }

    pub fn logits(&self) -> Tensor<B, 1> {
        self.logits.clone()
    }

    pub fn set_logits(&mut self, logits: Tensor<B, 1>) -> Result<()> {
        ensure_shape("node-count logits", &self.logits.dims(), &logits.dims())?;
        self.logits = logits;
        Ok(())
    }

    /// `log p(n = count - 1)` for every row; `offset` numbers the rows in errors.
    pub fn log_prob(&self, present_counts: &[usize], offset: usize) -> Result<Tensor<B, 1>> {
        let mut index = Vec::with_capacity(present_counts.len());
        for (row, &count) in present_counts.iter().enumerate() {
            if count == 0 {
                return Err(MolGraphError::EmptyGraph {
                    example: offset + row,
                });
            }
            if count > self.max_nodes() {
                return Err(MolGraphError::shape(
                    "present node count",
                    &[self.max_nodes()],
                    &[count],
                ));
            }
            index.push(count - 1);
        }
        let device = self.logits.device();
        Ok(log_softmax(self.logits.clone(), 0).select(0, index_tensor::<B>(&index, &device)))
    }

    /// `[batch, N]` logits over `n` with `forbidden` entries set to `-inf`.
    pub fn masked_logits(&self, forbidden: Tensor<B, 2, Bool>) -> Result<Tensor<B, 2>> {
        let [batch, n] = forbidden.dims();
        ensure_shape("node-count mask", &[batch, self.max_nodes()], &[batch, n])?;
        Ok(self
            .logits
            .clone()
            .detach()
            .reshape([1, n])
            .repeat_dim(0, batch)
            .mask_fill(forbidden, f32::NEG_INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::activation::softmax;
    use molpc_core::backend::{init_cpu_device, CpuBackend};
    use molpc_core::tensor_ops::{from_host_bool, from_host_f32, to_host_f32};

    type TestBackend = CpuBackend;

    #[test]
    fn test_mixture_weights_normalized() {
        let device = init_cpu_device();
        let mut mixture = MixtureCombiner::<TestBackend>::new(4, &device);
        mixture
            .set_logits(from_host_f32(vec![3.0, -1.0, 0.5, 10.0], [4], &device))
            .unwrap();
        let weights = to_host_f32(softmax(mixture.log_weights(), 0)).unwrap();
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_combine_uniform_weights() {
        let device = init_cpu_device();
        let mixture = MixtureCombiner::<TestBackend>::new(2, &device);
        let ll_x = from_host_f32::<TestBackend, 2>(vec![-1.0, -3.0], [1, 2], &device);
        let ll_a = from_host_f32::<TestBackend, 2>(vec![-2.0, 0.0], [1, 2], &device);
        let out = to_host_f32(mixture.combine(ll_x, ll_a).unwrap()).unwrap();
        // both components score -3, mixed with weight 1/2 each
        assert!((out[0] - -3.0).abs() < 1e-5);
    }

    #[test]
    fn test_combine_rejects_wrong_component_count() {
        let device = init_cpu_device();
        let mixture = MixtureCombiner::<TestBackend>::new(3, &device);
        let ll = Tensor::<TestBackend, 2>::zeros([2, 2], &device);
        assert!(mixture.combine(ll.clone(), ll).is_err());
    }

    #[test]
    fn test_count_prior_log_prob() {
        let device = init_cpu_device();
        let prior = NodeCountPrior::<TestBackend>::new(4, &device);
        let lp = to_host_f32(prior.log_prob(&[1, 4, 2], 0).unwrap()).unwrap();
        for v in lp {
            assert!((v - 0.25f32.ln()).abs() < 1e-6);
        }
        assert!(matches!(
            prior.log_prob(&[2, 0], 10),
            Err(MolGraphError::EmptyGraph { example: 11 })
        ));
    }

    #[test]
    fn test_masked_logits() {
        let device = init_cpu_device();
        let prior = NodeCountPrior::<TestBackend>::new(3, &device);
        let forbidden = from_host_bool::<TestBackend, 2>(
            vec![true, false, false, false, false, true],
            [2, 3],
            &device,
        );
        let logits = to_host_f32(prior.masked_logits(forbidden).unwrap()).unwrap();
        assert_eq!(logits[0], f32::NEG_INFINITY);
        assert_eq!(logits[5], f32::NEG_INFINITY);
        assert_eq!(&logits[1..5], &[0.0, 0.0, 0.0, 0.0]);
    }
}
