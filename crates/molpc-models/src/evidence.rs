//! Partial evidence on generated graphs.
//!
//! Evidence is given in the caller's label encoding: node labels `[batch, N]`
//! and edge matrices `[batch, N, N]`, with [`UNKNOWN`] at unobserved
//! positions. Either side may be absent, in which case every variable of that
//! group is unobserved.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use molpc_circuits::Evidence;
use molpc_core::error::{ensure_shape, MolGraphError, Result};
use molpc_core::tensor_ops::to_host_i64;
use molpc_core::{
    MixtureVariant, ModelConfig, RegimeAdapter, TriangularMask, VariableGroup, NO_BOND, PADDING,
    UNKNOWN,
};

/// Optional node and edge evidence for a sampling call.
#[derive(Debug, Clone)]
pub struct GraphEvidence<B: Backend> {
    nodes: Option<Tensor<B, 2, Int>>,
    edges: Option<Tensor<B, 3, Int>>,
}

impl<B: Backend> Default for GraphEvidence<B> {
    fn default() -> Self {
        Self::none()
    }
}

impl<B: Backend> GraphEvidence<B> {
    /// Unconditional sampling.
    pub fn none() -> Self {
        Self {
            nodes: None,
            edges: None,
        }
    }

    pub fn new(nodes: Option<Tensor<B, 2, Int>>, edges: Option<Tensor<B, 3, Int>>) -> Self {
        Self { nodes, edges }
    }

    pub fn with_nodes(mut self, nodes: Tensor<B, 2, Int>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn with_edges(mut self, edges: Tensor<B, 3, Int>) -> Self {
        self.edges = Some(edges);
        self
    }

    pub fn nodes(&self) -> Option<&Tensor<B, 2, Int>> {
        self.nodes.as_ref()
    }

    pub fn edges(&self) -> Option<&Tensor<B, 3, Int>> {
        self.edges.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_none() && self.edges.is_none()
    }

    /// Number of evidence rows, `None` when no evidence is given.
    ///
    /// Node and edge evidence must have the same number of rows.
    pub fn batch_size(&self) -> Result<Option<usize>> {
        let nodes = self.nodes.as_ref().map(|x| x.dims()[0]);
        let edges = self.edges.as_ref().map(|a| a.dims()[0]);
        match (nodes, edges) {
            (Some(nodes), Some(edges)) if nodes != edges => {
                Err(MolGraphError::EvidenceLengthMismatch { nodes, edges })
            }
            (nodes, edges) => Ok(nodes.or(edges)),
        }
    }

    /// Check shapes against `N` node slots and every observed label against
    /// the model's label ranges. [`UNKNOWN`] is accepted anywhere.
    pub fn validate(&self, config: &ModelConfig, mask: &TriangularMask) -> Result<()> {
        let n = config.max_nodes;
        let batch = self.batch_size()?;
        if let (Some(batch), Some(nodes)) = (batch, &self.nodes) {
            ensure_shape("node evidence", &[batch, n], &nodes.dims())?;
            let labels = to_host_i64(nodes.clone())?;
            let slots: Vec<usize> = (0..n).collect();
            check_labels("node", &labels, n, &slots, config.max_node_label(), true)?;
        }
        if let (Some(batch), Some(edges)) = (batch, &self.edges) {
            ensure_shape("edge evidence", &[batch, n, n], &edges.dims())?;
            let labels = to_host_i64(edges.clone())?;
            check_labels(
                "edge",
                &labels,
                n * n,
                &mask.flat_indices(),
                config.max_edge_label(),
                true,
            )?;
        }
        Ok(())
    }

    /// Rows `start..start + len` of both sides together.
    pub fn narrow(&self, start: usize, len: usize) -> Self {
        Self {
            nodes: self.nodes.clone().map(|x| x.narrow(0, start, len)),
            edges: self.edges.clone().map(|a| a.narrow(0, start, len)),
        }
    }
}

/// Fail on the first label at `positions` of a `row_len`-wide row that lies
/// outside `0..=max`. With `allow_unknown`, [`UNKNOWN`] passes as well.
pub(crate) fn check_labels(
    group: &'static str,
    labels: &[i64],
    row_len: usize,
    positions: &[usize],
    max: i64,
    allow_unknown: bool,
) -> Result<()> {
    if row_len == 0 {
        return Ok(());
    }
    for (example, row) in labels.chunks_exact(row_len).enumerate() {
        let bad = positions
            .iter()
            .map(|&p| row[p])
            .find(|&label| !(0..=max).contains(&label) && !(allow_unknown && label == UNKNOWN));
        if let Some(label) = bad {
            return Err(MolGraphError::LabelOutOfRange {
                group,
                example,
                label,
                max,
            });
        }
    }
    Ok(())
}

/// Evidence translated to circuit inputs, plus the host-side size bounds.
pub(crate) struct ResolvedEvidence<B: Backend> {
    pub nodes: Option<Evidence<B>>,
    pub edges: Option<Evidence<B>>,
    /// Inclusive `(min, max)` admissible graph size per row (size-prior only)
    pub size_bounds: Vec<(usize, usize)>,
}

/// Translate caller evidence for `count` rows into circuit evidence.
///
/// In the size-prior variant node labels are shifted down by one for the
/// circuit and [`PADDING`] positions are treated as unobserved, exactly as in
/// scoring. Dequantized evidence is encoded without noise.
pub(crate) fn resolve<B: Backend>(
    evidence: &GraphEvidence<B>,
    count: usize,
    offset: usize,
    variant: MixtureVariant,
    adapter: &RegimeAdapter,
    mask: &TriangularMask,
) -> Result<ResolvedEvidence<B>> {
    let n = mask.size();
    let shift = match variant {
        MixtureVariant::Plain => 0.0,
        MixtureVariant::SizePrior => 1.0,
    };

    let nodes = match &evidence.nodes {
        Some(x) => {
            let labels = x.clone().float().sub_scalar(shift);
            let marginalized = labels.clone().lower_elem(0.0);
            Some(Evidence::new(
                adapter.encode_exact(labels, VariableGroup::Nodes),
                marginalized,
            ))
        }
        None => None,
    };
    let edges = match &evidence.edges {
        Some(a) => {
            let l = mask.flatten(a.clone().float())?;
            let marginalized = l.clone().lower_elem(0.0);
            Some(Evidence::new(
                adapter.encode_exact(l, VariableGroup::Edges),
                marginalized,
            ))
        }
        None => None,
    };

    let size_bounds = match variant {
        MixtureVariant::Plain => Vec::new(),
        MixtureVariant::SizePrior => {
            let node_labels = evidence.nodes.clone().map(to_host_i64).transpose()?;
            let edge_labels = evidence.edges.clone().map(to_host_i64).transpose()?;
            (0..count)
                .map(|row| {
                    size_bounds(
                        node_labels.as_deref().map(|x| &x[row * n..(row + 1) * n]),
                        edge_labels.as_deref().map(|a| &a[row * n * n..(row + 1) * n * n]),
                        mask,
                    )
                    .map_err(|reason| MolGraphError::InconsistentEvidence {
                        example: offset + row,
                        reason,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(ResolvedEvidence {
        nodes,
        edges,
        size_bounds,
    })
}

/// Admissible graph sizes `s` for one row of evidence.
///
/// A node evidenced as present, or an endpoint of an evidenced bond, must lie
/// below `s`; a node evidenced as [`PADDING`] must lie at or above it.
fn size_bounds(
    nodes: Option<&[i64]>,
    edges: Option<&[i64]>,
    mask: &TriangularMask,
) -> std::result::Result<(usize, usize), String> {
    let n = mask.size();
    let mut lower = 1;
    let mut upper = n;

    if let Some(nodes) = nodes {
        for (i, &label) in nodes.iter().enumerate() {
            match label {
                UNKNOWN => {}
                PADDING => upper = upper.min(i),
                _ => lower = lower.max(i + 1),
            }
        }
    }
    if let Some(edges) = edges {
        for &(i, j) in mask.positions() {
            let label = edges[i * n + j];
            if label != UNKNOWN && label != NO_BOND {
                lower = lower.max(i.max(j) + 1);
            }
        }
    }

    if lower > upper {
        return Err(format!(
            "evidence needs at least {lower} nodes but allows at most {upper}"
        ));
    }
    Ok((lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use molpc_core::backend::{init_cpu_device, CpuBackend};
    use molpc_core::Regime;

    type TestBackend = CpuBackend;

    fn int2(data: Vec<i64>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(burn::tensor::TensorData::new(data, shape), &init_cpu_device())
    }

    #[test]
    fn test_size_bounds_from_nodes() {
        let mask = TriangularMask::new(5);
        assert_eq!(size_bounds(Some(&[2, 1, -1, 0, 0][..]), None, &mask), Ok((2, 3)));
        assert_eq!(size_bounds(Some(&[1, 1, 3, 0, 0][..]), None, &mask), Ok((3, 3)));
        assert_eq!(size_bounds(Some(&[-1; 5][..]), None, &mask), Ok((1, 5)));
        assert_eq!(size_bounds(None, None, &mask), Ok((1, 5)));
    }

    #[test]
    fn test_size_bounds_from_bonds() {
        let mask = TriangularMask::new(4);
        let mut edges = vec![UNKNOWN; 16];
        // bond between nodes 3 and 1
        edges[3 * 4 + 1] = 2;
        edges[1 * 4 + 3] = 2;
        // explicit no-bond says nothing about size
        edges[2 * 4] = NO_BOND;
        assert_eq!(size_bounds(None, Some(edges.as_slice()), &mask), Ok((4, 4)));
    }

    #[test]
    fn test_contradictory_evidence() {
        let mask = TriangularMask::new(4);
        // padding before a present node
        assert!(size_bounds(Some(&[1, 0, 2, -1][..]), None, &mask).is_err());
    }

    #[test]
    fn test_batch_size_mismatch() {
        let device = init_cpu_device();
        let evidence = GraphEvidence::<TestBackend>::none()
            .with_nodes(int2(vec![1; 8], [2, 4]))
            .with_edges(Tensor::zeros([3, 4, 4], &device));
        assert!(matches!(
            evidence.batch_size(),
            Err(MolGraphError::EvidenceLengthMismatch { nodes: 2, edges: 3 })
        ));
        assert_eq!(GraphEvidence::<TestBackend>::none().batch_size().unwrap(), None);
    }

    #[test]
    fn test_check_labels_reports_first_bad_row() {
        let labels = [0, 1, 2, UNKNOWN, 3, 2];
        assert!(matches!(
            check_labels("node", &labels, 3, &[0, 1, 2], 2, true),
            Err(MolGraphError::LabelOutOfRange {
                example: 1,
                label: 3,
                ..
            })
        ));
        // only the listed positions are inspected
        assert!(check_labels("node", &labels, 3, &[1, 2], 2, true).is_ok());
        assert!(matches!(
            check_labels("node", &labels, 3, &[0, 1, 2], 3, false),
            Err(MolGraphError::LabelOutOfRange {
                example: 1,
                label: UNKNOWN,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_evidence() {
        let config = ModelConfig::new(2, 3, 2, 2, MixtureVariant::SizePrior, Regime::Categorical);
        let mask = TriangularMask::new(3);
        let ok = GraphEvidence::<TestBackend>::none().with_nodes(int2(vec![2, UNKNOWN, 0], [1, 3]));
        assert!(ok.validate(&config, &mask).is_ok());

        let bad = GraphEvidence::<TestBackend>::none().with_nodes(int2(vec![3, UNKNOWN, 0], [1, 3]));
        assert!(matches!(
            bad.validate(&config, &mask),
            Err(MolGraphError::LabelOutOfRange {
                group: "node",
                label: 3,
                ..
            })
        ));

        // bond label 2 at (2, 1) with only two edge categories; the diagonal is ignored
        let mut edges = vec![UNKNOWN; 9];
        edges[0] = 7;
        edges[2 * 3 + 1] = 2;
        let bad = GraphEvidence::<TestBackend>::none().with_edges(Tensor::from_data(
            burn::tensor::TensorData::new(edges, [1, 3, 3]),
            &init_cpu_device(),
        ));
        assert!(matches!(
            bad.validate(&config, &mask),
            Err(MolGraphError::LabelOutOfRange {
                group: "edge",
                label: 2,
                max: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_shifts_size_prior_nodes() {
        let mask = TriangularMask::new(3);
        let adapter = RegimeAdapter::new(Regime::Categorical, 2, 2).unwrap();
        let evidence = GraphEvidence::<TestBackend>::none().with_nodes(int2(vec![2, 0, -1], [1, 3]));
        let resolved = resolve(
            &evidence,
            1,
            0,
            MixtureVariant::SizePrior,
            &adapter,
            &mask,
        )
        .unwrap();
        let nodes = resolved.nodes.unwrap();
        let marginalized = molpc_core::tensor_ops::to_host_bool(nodes.marginalized).unwrap();
        assert_eq!(marginalized, vec![false, true, true]);
        assert!(resolved.edges.is_none());
        assert_eq!(resolved.size_bounds, vec![(1, 1)]);
    }
}
