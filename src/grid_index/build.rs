//! Build helpers for ReverseGridIndex.

use glam::DVec3;
use rustc_hash::FxHashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::ReverseGridIndex;
use crate::types::GridCoord;
use crate::util::Timed;

impl ReverseGridIndex {
    /// Build the index from subblock centroids in the block-local frame.
    ///
    /// `resolution` is the model's parent cell size. Runs in O(n); no sort.
    pub fn new(local_centroids: &[DVec3], resolution: DVec3) -> Self {
        let _t = Timed::debug("reverse grid index build");
        let n = local_centroids.len();
        assert!(
            n <= u32::MAX as usize,
            "ReverseGridIndex supports at most u32::MAX subblocks"
        );

        // Step 1: Parent cell of each subblock (parallel).
        let subblock_cells: Vec<Option<GridCoord>> = maybe_par_iter!(local_centroids)
            .map(|&c| GridCoord::containing(c, resolution))
            .collect();

        // Step 2: Assign bucket ids in first-seen order and count members.
        let mut buckets: FxHashMap<GridCoord, u32> = FxHashMap::default();
        let mut bucket_coords = Vec::new();
        let mut counts: Vec<u32> = Vec::new();
        let mut subblock_bucket = Vec::with_capacity(n);
        for (s, cell) in subblock_cells.iter().enumerate() {
            let Some(cell) = *cell else {
                log::warn!("subblock {} has a non-finite centroid and is not indexed", s);
                subblock_bucket.push(u32::MAX);
                continue;
            };
            let b = *buckets.entry(cell).or_insert_with(|| {
                bucket_coords.push(cell);
                counts.push(0);
                (bucket_coords.len() - 1) as u32
            });
            counts[b as usize] += 1;
            subblock_bucket.push(b);
        }

        // Step 3: Prefix sum to get offsets.
        let mut bucket_offsets = Vec::with_capacity(counts.len() + 1);
        bucket_offsets.push(0u32);
        let mut sum = 0u32;
        for &count in &counts {
            sum += count;
            bucket_offsets.push(sum);
        }

        // Step 4: Scatter in model order. Walking subblocks in order with a
        // per-bucket cursor keeps each bucket sorted by subblock index.
        let mut cursor: Vec<u32> = bucket_offsets[..counts.len()].to_vec();
        let mut subblock_indices = vec![0u32; sum as usize];
        for (s, &b) in subblock_bucket.iter().enumerate() {
            if b == u32::MAX {
                continue;
            }
            let slot = &mut cursor[b as usize];
            subblock_indices[*slot as usize] = s as u32;
            *slot += 1;
        }

        log::debug!(
            "indexed {} subblocks into {} parent cells",
            subblock_indices.len(),
            bucket_coords.len()
        );

        Self {
            resolution,
            buckets,
            bucket_coords,
            bucket_offsets,
            subblock_indices,
            subblock_cells,
        }
    }
}
