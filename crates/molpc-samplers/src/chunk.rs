//! Bounded-memory chunking of large sampling requests.
//!
//! Circuit sampling cost grows with batch size x component count x graph
//! size. A request for `total` samples is partitioned into consecutive
//! chunks of `chunk_size`, with one trailing remainder chunk when `total` is
//! not a multiple. Chunks run one after another; the first failing chunk
//! aborts the request and nothing from earlier chunks is returned.

use molpc_core::error::{MolGraphError, Result};
use std::ops::Range;

/// Consecutive chunk layout for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total: usize,
    chunk_size: usize,
}

impl ChunkPlan {
    pub fn new(total: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(MolGraphError::ZeroChunkSize);
        }
        Ok(Self { total, chunk_size })
    }

    pub const fn total(&self) -> usize {
        self.total
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks, `ceil(total / chunk_size)`.
    pub const fn len(&self) -> usize {
        self.total.div_ceil(self.chunk_size)
    }

    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Row ranges of every chunk, in order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.len()).map(move |c| {
            let start = c * self.chunk_size;
            start..(start + self.chunk_size).min(self.total)
        })
    }

    /// Chunk sizes, e.g. `[2000, 2000, 1000]` for 5000 rows in chunks of 2000.
    pub fn sizes(&self) -> Vec<usize> {
        self.ranges().map(|r| r.len()).collect()
    }
}

/// Run `run_chunk` once per chunk of `plan`, in order, collecting the outputs.
pub fn run_chunked<T, F>(plan: &ChunkPlan, mut run_chunk: F) -> Result<Vec<T>>
where
    F: FnMut(Range<usize>) -> Result<T>,
{
    let n_chunks = plan.len();
    let mut outputs = Vec::with_capacity(n_chunks);
    for (index, range) in plan.ranges().enumerate() {
        log::debug!(
            "Sampling chunk {}/{} (rows {}..{})",
            index + 1,
            n_chunks,
            range.start,
            range.end
        );
        outputs.push(run_chunk(range)?);
    }
    Ok(outputs)
}
