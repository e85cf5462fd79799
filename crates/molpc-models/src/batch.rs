use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use molpc_core::error::Result;
use molpc_core::tensor_ops::to_host_i64;

/// A batch of generated graphs in the caller's label encoding.
#[derive(Debug, Clone)]
pub struct MolGraphBatch<B: Backend> {
    /// `[batch, N]` node labels
    pub nodes: Tensor<B, 2, Int>,
    /// `[batch, N, N]` symmetric edge labels with a zero diagonal
    pub edges: Tensor<B, 3, Int>,
}

/// One graph read back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MolGraph {
    /// `N` node labels
    pub nodes: Vec<i64>,
    /// Row-major `N x N` edge labels
    pub edges: Vec<i64>,
}

impl MolGraph {
    pub fn max_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, i: usize, j: usize) -> i64 {
        self.edges[i * self.max_nodes() + j]
    }
}

impl<B: Backend> MolGraphBatch<B> {
    /// A batch with zero rows.
    pub fn empty(max_nodes: usize, device: &B::Device) -> Self {
        Self {
            nodes: Tensor::from_data(TensorData::new(Vec::<i64>::new(), [0, max_nodes]), device),
            edges: Tensor::from_data(
                TensorData::new(Vec::<i64>::new(), [0, max_nodes, max_nodes]),
                device,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_nodes(&self) -> usize {
        self.nodes.dims()[1]
    }

    /// Concatenate batches in order. `parts` must not be empty.
    pub fn cat(parts: Vec<Self>) -> Self {
        let (nodes, edges): (Vec<_>, Vec<_>) = parts.into_iter().map(|b| (b.nodes, b.edges)).unzip();
        Self {
            nodes: Tensor::cat(nodes, 0),
            edges: Tensor::cat(edges, 0),
        }
    }

    /// Read every graph back to the host.
    pub fn to_graphs(&self) -> Result<Vec<MolGraph>> {
        let n = self.max_nodes();
        let nodes = to_host_i64(self.nodes.clone())?;
        let edges = to_host_i64(self.edges.clone())?;
        if n == 0 {
            return Ok(vec![MolGraph { nodes: Vec::new(), edges: Vec::new() }; self.len()]);
        }
        Ok(itertools::izip!(nodes.chunks_exact(n), edges.chunks_exact(n * n))
            .map(|(nodes, edges)| MolGraph {
                nodes: nodes.to_vec(),
                edges: edges.to_vec(),
            })
            .collect())
    }
}
