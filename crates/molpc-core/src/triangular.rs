//! Triangular codec between symmetric edge matrices and flat edge vectors.
//!
//! A graph with `N` node slots has `N(N-1)/2` unordered node pairs. The codec
//! keeps the strictly-lower-triangular positions `(i, j)` with `j < i`, scanned
//! row-major:
//!
//! ```text
//!        j=0  j=1  j=2  j=3
//! i=0  [  .    .    .    .  ]
//! i=1  [  0    .    .    .  ]      l = [a10, a20, a21, a30, a31, a32]
//! i=2  [  1    2    .    .  ]
//! i=3  [  3    4    5    .  ]
//! ```
//!
//! `unflatten` writes the vector back at both `(i, j)` and `(j, i)`, so any
//! symmetric matrix survives a round trip exactly.

use crate::error::{ensure_shape, MolGraphError, Result};
use crate::tensor_ops::{from_host_f32, index_tensor};
use burn::tensor::backend::Backend;
use burn::tensor::{Bool, Tensor, TensorData};

/// Fixed strictly-lower-triangular mask for `n` node slots.
///
/// Built once per model and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangularMask {
    n: usize,
    positions: Vec<(usize, usize)>,
}

impl TriangularMask {
    pub fn new(n: usize) -> Self {
        let positions = (0..n)
            .flat_map(|i| (0..i).map(move |j| (i, j)))
            .collect();
        Self { n, positions }
    }

    /// Number of node slots `N`.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Number of masked entries, `N(N-1)/2`.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Masked `(row, col)` positions in scan order.
    pub fn positions(&self) -> &[(usize, usize)] {
        &self.positions
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        j < i && i < self.n
    }

    /// Row-major `N x N` boolean matrix, `true` strictly below the diagonal.
    pub fn to_matrix(&self) -> Vec<bool> {
        let mut matrix = vec![false; self.n * self.n];
        for &(i, j) in &self.positions {
            matrix[i * self.n + j] = true;
        }
        matrix
    }

    /// The mask as a `[N, N]` Bool tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2, Bool> {
        Tensor::from_data(TensorData::new(self.to_matrix(), [self.n, self.n]), device)
    }

    /// Row-major offsets `i * N + j` of the masked positions.
    pub fn flat_indices(&self) -> Vec<usize> {
        self.positions.iter().map(|&(i, j)| i * self.n + j).collect()
    }

    fn endpoint_indices(&self) -> (Vec<usize>, Vec<usize>) {
        self.positions.iter().map(|&(i, j)| (i, j)).unzip()
    }

    /// Extract the masked entries of `[batch, N, N]` matrices into `[batch, N(N-1)/2]`.
    pub fn flatten<B: Backend>(&self, a: Tensor<B, 3>) -> Result<Tensor<B, 2>> {
        let [batch, rows, cols] = a.dims();
        ensure_shape("triangular flatten", &[batch, self.n, self.n], &[batch, rows, cols])?;

        let device = a.device();
        let flat = a.reshape([batch, self.n * self.n]);
        if self.is_empty() {
            return Ok(Tensor::zeros([batch, 0], &device));
        }
        let indices = index_tensor::<B>(&self.flat_indices(), &device);
        Ok(flat.select(1, indices))
    }

    /// Same as [`flatten`](Self::flatten) for per-entry vectors `[batch, N, N, K]`,
    /// giving `[batch, N(N-1)/2, K]`.
    pub fn flatten_vectors<B: Backend>(&self, a: Tensor<B, 4>) -> Result<Tensor<B, 3>> {
        let [batch, rows, cols, k] = a.dims();
        ensure_shape(
            "triangular flatten",
            &[batch, self.n, self.n, k],
            &[batch, rows, cols, k],
        )?;

        let device = a.device();
        let flat = a.reshape([batch, self.n * self.n, k]);
        if self.is_empty() {
            return Ok(Tensor::zeros([batch, 0, k], &device));
        }
        let indices = index_tensor::<B>(&self.flat_indices(), &device);
        Ok(flat.select(1, indices))
    }

    /// Rebuild symmetric `[batch, N, N]` matrices from `[batch, N(N-1)/2]` vectors.
    ///
    /// Entries off the mask and its mirror (the diagonal) are filled with `pad`.
    pub fn unflatten<B: Backend>(&self, l: Tensor<B, 2>, pad: f32) -> Result<Tensor<B, 3>> {
        let [batch, entries] = l.dims();
        ensure_shape("triangular unflatten", &[batch, self.len()], &[batch, entries])?;

        let device = l.device();
        let cells = self.n * self.n;
        if self.is_empty() {
            return Ok(Tensor::full([batch, self.n, self.n], pad, &device));
        }

        // Scatter matrix S[e, cell] = 1 on both (i, j) and (j, i) so that l @ S
        // places every entry twice; the diagonal is the only cell S never hits.
        let mut scatter = vec![0.0f32; self.len() * cells];
        let mut diagonal = vec![pad; cells];
        for (e, &(i, j)) in self.positions.iter().enumerate() {
            scatter[e * cells + i * self.n + j] = 1.0;
            scatter[e * cells + j * self.n + i] = 1.0;
            diagonal[i * self.n + j] = 0.0;
            diagonal[j * self.n + i] = 0.0;
        }
        let scatter = from_host_f32::<B, 2>(scatter, [self.len(), cells], &device);
        let diagonal = from_host_f32::<B, 2>(diagonal, [1, cells], &device);

        let full = l.matmul(scatter) + diagonal;
        Ok(full.reshape([batch, self.n, self.n]))
    }

    /// Derived pair mask: entry `(i, j)` is `true` iff both endpoints are `true`.
    ///
    /// `nodes` is `[batch, N]`; the result is `[batch, N(N-1)/2]`.
    pub fn pair_mask<B: Backend>(&self, nodes: Tensor<B, 2, Bool>) -> Result<Tensor<B, 2, Bool>> {
        let [batch, n] = nodes.dims();
        ensure_shape("pair mask", &[batch, self.n], &[batch, n])?;

        let device = nodes.device();
        if self.is_empty() {
            return Ok(Tensor::<B, 2>::zeros([batch, 0], &device).greater_elem(0.5));
        }
        let (rows, cols) = self.endpoint_indices();
        let nodes = nodes.float();
        let first = nodes.clone().select(1, index_tensor::<B>(&rows, &device));
        let second = nodes.select(1, index_tensor::<B>(&cols, &device));
        Ok((first * second).greater_elem(0.5))
    }

    /// Host-side flatten of a row-major `N x N` matrix.
    pub fn flatten_slice<T: Copy>(&self, a: &[T]) -> Result<Vec<T>> {
        if a.len() != self.n * self.n {
            return Err(MolGraphError::shape(
                "triangular flatten",
                &[self.n * self.n],
                &[a.len()],
            ));
        }
        Ok(self.positions.iter().map(|&(i, j)| a[i * self.n + j]).collect())
    }

    /// Host-side unflatten into a row-major symmetric `N x N` matrix.
    pub fn unflatten_slice<T: Copy>(&self, l: &[T], pad: T) -> Result<Vec<T>> {
        if l.len() != self.len() {
            return Err(MolGraphError::shape(
                "triangular unflatten",
                &[self.len()],
                &[l.len()],
            ));
        }
        let mut a = vec![pad; self.n * self.n];
        for (&(i, j), &value) in self.positions.iter().zip(l) {
            a[i * self.n + j] = value;
            a[j * self.n + i] = value;
        }
        Ok(a)
    }
}
