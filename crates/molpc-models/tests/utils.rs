//! Test utilities for molpc-models

#![allow(dead_code)]

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use molpc_core::backend::{init_cpu_device, CpuBackend};
use molpc_core::{MixtureVariant, ModelConfig, Regime};
use molpc_models::{MolGraph, MolGraphModel};

pub type TestBackend = CpuBackend;

pub const MAX_NODES: usize = 4;
pub const NODE_CATEGORIES: usize = 3;
pub const EDGE_CATEGORIES: usize = 3;
pub const COMPONENTS: usize = 3;

pub fn config(variant: MixtureVariant, regime: Regime) -> ModelConfig {
    ModelConfig::new(
        COMPONENTS,
        MAX_NODES,
        NODE_CATEGORIES,
        EDGE_CATEGORIES,
        variant,
        regime,
    )
}

pub fn model(variant: MixtureVariant, regime: Regime) -> MolGraphModel<TestBackend> {
    MolGraphModel::factorized(config(variant, regime), &init_cpu_device()).unwrap()
}

pub fn int2<B: Backend>(data: Vec<i64>, shape: [usize; 2]) -> Tensor<B, 2, Int> {
    Tensor::from_data(TensorData::new(data, shape), &Default::default())
}

pub fn int3<B: Backend>(data: Vec<i64>, shape: [usize; 3]) -> Tensor<B, 3, Int> {
    Tensor::from_data(TensorData::new(data, shape), &Default::default())
}

/// Row-major symmetric `n x n` matrix from its strictly-lower entries in scan order.
pub fn symmetric(n: usize, lower: &[i64]) -> Vec<i64> {
    let mut a = vec![0; n * n];
    let mut k = 0;
    for i in 0..n {
        for j in 0..i {
            a[i * n + j] = lower[k];
            a[j * n + i] = lower[k];
            k += 1;
        }
    }
    assert_eq!(k, lower.len());
    a
}

pub fn assert_symmetric_zero_diagonal(graph: &MolGraph) {
    let n = graph.max_nodes();
    for i in 0..n {
        assert_eq!(graph.edge(i, i), 0, "diagonal entry {i}");
        for j in 0..i {
            assert_eq!(graph.edge(i, j), graph.edge(j, i), "asymmetric at ({i}, {j})");
        }
    }
}
