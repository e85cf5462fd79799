//! Small tensor helpers shared across the workspace.
//!
//! Burn has no built-in log-sum-exp or one-hot over float labels, and every
//! host readback needs the same dtype conversion, so they live here.

use crate::error::{MolGraphError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Int, Tensor, TensorData};

/// Read a float tensor back to the host as `f32`, row-major.
pub fn to_host_f32<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| MolGraphError::TensorData(format!("{err:?}")))
}

/// Read an integer tensor back to the host as `i64`, row-major.
pub fn to_host_i64<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|err| MolGraphError::TensorData(format!("{err:?}")))
}

/// Build a float tensor from host data.
pub fn from_host_f32<B: Backend, const D: usize>(
    data: Vec<f32>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    Tensor::from_data(TensorData::new(data, shape), device)
}

/// Build a boolean mask from host data.
pub fn from_host_bool<B: Backend, const D: usize>(
    data: Vec<bool>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Bool> {
    Tensor::from_data(TensorData::new(data, shape), device)
}

/// Read a boolean tensor back to the host.
pub fn to_host_bool<B: Backend, const D: usize>(tensor: Tensor<B, D, Bool>) -> Result<Vec<bool>> {
    Ok(to_host_i64(tensor.int())?.into_iter().map(|v| v != 0).collect())
}

/// Index tensor from host indices.
pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let data: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    Tensor::from_data(TensorData::new(data, [indices.len()]), device)
}

/// Numerically stable `log(sum(exp(x)))` over dimension 1 of a `[rows, cols]` tensor.
///
/// Returns `[rows]`. Rows must contain at least one finite entry.
pub fn logsumexp_rows<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 1> {
    let [rows, _] = x.dims();
    let max = x.clone().max_dim(1).detach();
    let shifted = x - max.clone();
    let lse = shifted.exp().sum_dim(1).log() + max;
    lse.reshape([rows])
}

/// One-hot encode float-valued integer labels.
///
/// `labels` is `[batch, vars]`; the result is `[batch, vars, k]`. Labels outside
/// `[0, k)` (for example the `-1` unknown sentinel) produce an all-zero row.
pub fn one_hot<B: Backend>(labels: Tensor<B, 2>, k: usize) -> Tensor<B, 3> {
    let [batch, vars] = labels.dims();
    let device = labels.device();
    let categories = Tensor::<B, 1, Int>::arange(0..k as i64, &device)
        .float()
        .reshape([1, 1, k])
        .repeat_dim(0, batch)
        .repeat_dim(1, vars);
    let labels = labels.reshape([batch, vars, 1]).repeat_dim(2, k);

    // |label - c| is 0 on the matching category and >= 1 elsewhere
    (labels - categories)
        .abs()
        .clamp_max(1.0)
        .neg()
        .add_scalar(1.0)
}

/// Arg-max over the last dimension with the lowest index winning ties.
///
/// `values` is `[batch, vars, k]`; the result is `[batch, vars]` as float labels.
pub fn argmax_lowest<B: Backend>(values: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, vars, k] = values.dims();
    let device = values.device();
    let max = values.clone().max_dim(2);
    let is_max = (values - max).greater_equal_elem(0.0).float();

    // Strictly decreasing priority makes the first maximal slot the unique winner
    let priority = Tensor::<B, 1, Int>::arange(0..k as i64, &device)
        .float()
        .neg()
        .add_scalar(k as f64)
        .reshape([1, 1, k]);
    (is_max * priority).argmax(2).float().reshape([batch, vars])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{init_cpu_device, CpuBackend};

    type TestBackend = CpuBackend;

    #[test]
    fn test_logsumexp_matches_direct() {
        let device = init_cpu_device();
        let x = from_host_f32::<TestBackend, 2>(vec![0.0, 1.0, 2.0, -1.0, -1.0, -1.0], [2, 3], &device);
        let lse = to_host_f32(logsumexp_rows(x)).unwrap();

        let direct0 = (1.0f32 + 1.0f32.exp() + 2.0f32.exp()).ln();
        let direct1 = -1.0 + 3.0f32.ln();
        assert!((lse[0] - direct0).abs() < 1e-5);
        assert!((lse[1] - direct1).abs() < 1e-5);
    }

    #[test]
    fn test_logsumexp_large_values_stable() {
        let device = init_cpu_device();
        let x = from_host_f32::<TestBackend, 2>(vec![1000.0, 1000.0], [1, 2], &device);
        let lse = to_host_f32(logsumexp_rows(x)).unwrap();
        assert!((lse[0] - (1000.0 + 2.0f32.ln())).abs() < 1e-3);
    }

    #[test]
    fn test_one_hot_ignores_out_of_range() {
        let device = init_cpu_device();
        let labels = from_host_f32::<TestBackend, 2>(vec![0.0, 2.0, -1.0], [1, 3], &device);
        let encoded = to_host_f32(one_hot(labels, 3)).unwrap();
        assert_eq!(encoded, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bool_host_roundtrip() {
        let device = init_cpu_device();
        let mask = from_host_bool::<TestBackend, 2>(vec![true, false, false, true], [2, 2], &device);
        assert_eq!(to_host_bool(mask).unwrap(), vec![true, false, false, true]);
    }

    #[test]
    fn test_argmax_lowest_breaks_ties_low() {
        let device = init_cpu_device();
        let values = from_host_f32::<TestBackend, 3>(
            vec![0.5, 0.5, 0.1, 0.0, 0.2, 0.9, 0.3, 0.3, 0.3],
            [1, 3, 3],
            &device,
        );
        let decoded = to_host_f32(argmax_lowest(values)).unwrap();
        assert_eq!(decoded, vec![0.0, 2.0, 0.0]);
    }
}
