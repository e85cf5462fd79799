//! Categorical and Gaussian draws driven by a caller-owned RNG.
//!
//! Uses the Gumbel-max trick for categorical sampling:
//! argmax_k(θ_k + Gumbel(0,1)) ~ Categorical(softmax(θ))
//!
//! The noise is generated on the host from the `RngCore` handed in by the
//! caller rather than from the backend's global generator. A sampling call
//! therefore consumes the stream in a fixed order, and a seeded stream gives
//! identical draws regardless of how a request was chunked.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use molpc_core::tensor_ops::from_host_f32;
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

/// Sample one category per row of `logits` using the Gumbel-max trick.
///
/// # Arguments
///
/// * `logits` - `[n_samples, n_categories]` unnormalized log probabilities; `-inf`
///   entries are never selected as long as a row has one finite entry
/// * `rng` - random stream the Gumbel noise is drawn from
///
/// # Returns
///
/// `[n_samples]` sampled category indices
pub fn categorical_sample<B: Backend>(
    logits: Tensor<B, 2>,
    rng: &mut dyn RngCore,
) -> Tensor<B, 1, Int> {
    let [n_samples, n_categories] = logits.dims();
    let device = logits.device();

    // Gumbel noise: -log(-log(U)), computed in f64 so U never rounds to 0 or 1
    let gumbel: Vec<f32> = (0..n_samples * n_categories)
        .map(|_| {
            let u: f64 = rng.gen_range(1e-10..1.0 - 1e-10);
            (-(-u.ln()).ln()) as f32
        })
        .collect();
    let gumbel = from_host_f32::<B, 2>(gumbel, [n_samples, n_categories], &device);

    let perturbed = logits + gumbel;
    perturbed.argmax(1).reshape([n_samples])
}

/// Standard-normal draws of the given shape.
pub fn standard_normal<B: Backend, const D: usize>(
    shape: [usize; D],
    rng: &mut dyn RngCore,
    device: &B::Device,
) -> Tensor<B, D> {
    let count: usize = shape.iter().product();
    let data: Vec<f32> = (0..count)
        .map(|_| rng.sample::<f64, _>(StandardNormal) as f32)
        .collect();
    from_host_f32::<B, D>(data, shape, device)
}
