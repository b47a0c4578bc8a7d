//! Reverse grid index: parent cell -> subblocks whose centroid lies in it.
//!
//! Parent cells are keyed by integer [`GridCoord`] computed with floor
//! division of the block-local centroid by the model resolution. Buckets are
//! stored contiguously (CSR layout: one offsets array, one flat index array)
//! and keep model order inside each bucket, so the first candidate that
//! contains a query point is always the lowest subblock index among those
//! that do.
//!
//! O(n) build, O(1) bucket lookup.

mod build;

use glam::DVec3;
use rustc_hash::FxHashMap;

use crate::types::GridCoord;

/// Row/column/slice bounds of a model's parent grid.
///
/// Used by the bounded resolution variant to reject coordinates outside
/// `[0, count)` before probing the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub counts: [u32; 3],
}

impl GridBounds {
    #[inline]
    pub const fn new(counts: [u32; 3]) -> Self {
        Self { counts }
    }

    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        (0..self.counts[0] as i64).contains(&coord.i)
            && (0..self.counts[1] as i64).contains(&coord.j)
            && (0..self.counts[2] as i64).contains(&coord.k)
    }
}

/// Parent-cell buckets for one model. Immutable once built.
#[derive(Debug, Clone)]
pub struct ReverseGridIndex {
    pub(super) resolution: DVec3,
    /// Bucket id for each occupied parent cell.
    pub(super) buckets: FxHashMap<GridCoord, u32>,
    /// Parent cell of each bucket, indexed by bucket id (first-seen order).
    pub(super) bucket_coords: Vec<GridCoord>,
    /// Start index into `subblock_indices` for each bucket, plus final length.
    /// Length: num_buckets + 1
    pub(super) bucket_offsets: Vec<u32>,
    /// Subblock indices grouped by bucket, model order within a bucket.
    pub(super) subblock_indices: Vec<u32>,
    /// Parent cell per subblock; `None` if the centroid was not finite.
    pub(super) subblock_cells: Vec<Option<GridCoord>>,
}

impl ReverseGridIndex {
    #[inline]
    pub fn resolution(&self) -> DVec3 {
        self.resolution
    }

    /// Parent cell containing a block-local point.
    #[inline]
    pub fn cell_of_point(&self, local: DVec3) -> Option<GridCoord> {
        GridCoord::containing(local, self.resolution)
    }

    /// Candidate subblocks for a parent cell, or `None` if no bucket exists.
    #[inline]
    pub fn candidates(&self, coord: GridCoord) -> Option<&[u32]> {
        self.buckets.get(&coord).map(|&b| self.bucket(b))
    }

    /// Subblocks of bucket `id`.
    #[inline]
    pub fn bucket(&self, id: u32) -> &[u32] {
        let start = self.bucket_offsets[id as usize] as usize;
        let end = self.bucket_offsets[id as usize + 1] as usize;
        &self.subblock_indices[start..end]
    }

    /// Parent cell the given subblock was bucketed under.
    #[inline]
    pub fn cell_of_subblock(&self, subblock: u32) -> Option<GridCoord> {
        self.subblock_cells[subblock as usize]
    }

    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.bucket_coords.len()
    }

    /// Number of subblocks placed in some bucket.
    #[inline]
    pub fn num_indexed(&self) -> usize {
        self.subblock_indices.len()
    }

    /// Total number of subblocks the index was built from.
    #[inline]
    pub fn num_subblocks(&self) -> usize {
        self.subblock_cells.len()
    }

    /// Iterate `(parent cell, subblocks)` in bucket-id order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &[u32])> + '_ {
        self.bucket_coords
            .iter()
            .enumerate()
            .map(move |(b, &coord)| (coord, self.bucket(b as u32)))
    }

    pub fn max_bucket_len(&self) -> usize {
        self.bucket_offsets
            .windows(2)
            .map(|w| (w[1] - w[0]) as usize)
            .max()
            .unwrap_or(0)
    }

    pub fn mean_bucket_len(&self) -> f64 {
        if self.bucket_coords.is_empty() {
            return 0.0;
        }
        self.num_indexed() as f64 / self.num_buckets() as f64
    }
}
