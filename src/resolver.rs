//! Point resolution: which subblock, if any, contains a query point.
//!
//! A query is answered in two levels. The point's parent cell is looked up in
//! the [`ReverseGridIndex`]; the candidates in that bucket are then tested
//! for containment against their [`Extent`](crate::extent::Extent) in bucket
//! order. Cost is O(bucket size), independent of the model size.
//!
//! Containment is inclusive on both faces, so a point on the face shared by
//! two siblings matches whichever comes first in the bucket. Buckets are in
//! model order, which makes the winner the lowest subblock index. This
//! tie-break is deterministic but is not a geometric guarantee.

use glam::DVec3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::extent::ExtentTable;
use crate::grid_index::{GridBounds, ReverseGridIndex};
use crate::model::SubblockedModel;
use crate::types::Point3Like;
use crate::util::Timed;

/// Result of resolving one query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// The point lies in this subblock.
    Matched(u32),
    /// The parent cell is out of bounds or has no subblocks.
    Outside,
    /// The parent cell has subblocks but none contains the point.
    Unresolved,
}

impl ResolutionOutcome {
    #[inline]
    pub fn subblock(self) -> Option<u32> {
        match self {
            ResolutionOutcome::Matched(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_matched(self) -> bool {
        matches!(self, ResolutionOutcome::Matched(_))
    }
}

/// Outcome for one input point, tagged with its position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedPoint {
    pub point_index: usize,
    pub outcome: ResolutionOutcome,
    /// Containment tests performed for this point.
    pub tests: u32,
}

/// Whether out-of-grid coordinates are rejected before the index is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsMode {
    /// Reject coordinates outside `[0, count)` on any axis.
    #[default]
    Enforced,
    /// Any coordinate with a bucket is probed.
    Unbounded,
}

/// Resolve one block-local point.
///
/// With `bounds`, a parent cell outside the model grid is `Outside` without
/// touching the index. Returns the outcome and the number of containment
/// tests performed.
#[inline]
pub fn resolve(
    local: DVec3,
    index: &ReverseGridIndex,
    extents: &ExtentTable,
    bounds: Option<GridBounds>,
) -> (ResolutionOutcome, u32) {
    let Some(coord) = index.cell_of_point(local) else {
        return (ResolutionOutcome::Outside, 0);
    };
    if let Some(bounds) = bounds {
        if !bounds.contains(coord) {
            return (ResolutionOutcome::Outside, 0);
        }
    }
    let Some(candidates) = index.candidates(coord) else {
        return (ResolutionOutcome::Outside, 0);
    };

    let mut tests = 0u32;
    for &s in candidates {
        tests += 1;
        if extents.get(s).contains(local) {
            return (ResolutionOutcome::Matched(s), tests);
        }
    }
    (ResolutionOutcome::Unresolved, tests)
}

/// Borrowed view over one model's index and extents.
#[derive(Debug, Clone, Copy)]
pub struct PointResolver<'a> {
    index: &'a ReverseGridIndex,
    extents: &'a ExtentTable,
    bounds: Option<GridBounds>,
}

impl<'a> PointResolver<'a> {
    pub fn new(
        index: &'a ReverseGridIndex,
        extents: &'a ExtentTable,
        bounds: Option<GridBounds>,
    ) -> Self {
        Self {
            index,
            extents,
            bounds,
        }
    }

    #[inline]
    pub fn resolve(&self, local: DVec3) -> ResolutionOutcome {
        resolve(local, self.index, self.extents, self.bounds).0
    }

    /// Resolve a batch of block-local points.
    ///
    /// Output order equals input order, with or without the `parallel`
    /// feature.
    pub fn resolve_all(&self, locals: &[DVec3]) -> Vec<ResolvedPoint> {
        let _t = Timed::debug("resolve points");
        maybe_par_range!(0..locals.len())
            .map(|i| {
                let (outcome, tests) = resolve(locals[i], self.index, self.extents, self.bounds);
                ResolvedPoint {
                    point_index: i,
                    outcome,
                    tests,
                }
            })
            .collect()
    }
}

/// Counts over a batch of resolution outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResolutionSummary {
    pub matched: usize,
    pub outside: usize,
    pub unresolved: usize,
    pub candidate_tests: u64,
}

impl ResolutionSummary {
    pub fn from_records(records: &[ResolvedPoint]) -> Self {
        let mut summary = Self::default();
        for r in records {
            summary.add(r);
        }
        summary
    }

    #[inline]
    pub fn add(&mut self, record: &ResolvedPoint) {
        match record.outcome {
            ResolutionOutcome::Matched(_) => self.matched += 1,
            ResolutionOutcome::Outside => self.outside += 1,
            ResolutionOutcome::Unresolved => self.unresolved += 1,
        }
        self.candidate_tests += record.tests as u64;
    }

    pub fn total(&self) -> usize {
        self.matched + self.outside + self.unresolved
    }
}

/// A model together with the extent table and reverse grid index built for
/// it. Built once per comparison run and read-only afterwards.
#[derive(Debug, Clone)]
pub struct IndexedModel<'m> {
    model: &'m SubblockedModel,
    extents: ExtentTable,
    index: ReverseGridIndex,
}

impl<'m> IndexedModel<'m> {
    pub fn build(model: &'m SubblockedModel) -> Self {
        let _t = Timed::info("index model");
        let local = model.local_centroids();
        let extents = ExtentTable::build(&local, model.sizes());
        let index = ReverseGridIndex::new(&local, model.grid.resolution);
        log::info!(
            "model {:?}: {} subblocks in {} parent cells (max {} per cell)",
            model.name,
            model.num_subblocks(),
            index.num_buckets(),
            index.max_bucket_len()
        );
        Self {
            model,
            extents,
            index,
        }
    }

    pub fn model(&self) -> &'m SubblockedModel {
        self.model
    }

    pub fn extents(&self) -> &ExtentTable {
        &self.extents
    }

    pub fn index(&self) -> &ReverseGridIndex {
        &self.index
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.model.grid.counts)
    }

    pub fn resolver(&self, mode: BoundsMode) -> PointResolver<'_> {
        let bounds = match mode {
            BoundsMode::Enforced => Some(self.bounds()),
            BoundsMode::Unbounded => None,
        };
        PointResolver::new(&self.index, &self.extents, bounds)
    }

    /// Resolve a point already in this model's block-local frame.
    #[inline]
    pub fn resolve_local(&self, local: DVec3, mode: BoundsMode) -> ResolutionOutcome {
        self.resolver(mode).resolve(local)
    }

    /// Resolve a point given in world coordinates.
    pub fn resolve_world<P: Point3Like>(&self, point: &P, mode: BoundsMode) -> ResolutionOutcome {
        self.resolve_local(self.model.to_local(point.to_dvec3()), mode)
    }

    /// Resolve a batch of world points, in input order.
    pub fn resolve_points<P: Point3Like>(&self, points: &[P], mode: BoundsMode) -> Vec<ResolvedPoint> {
        let local = self.model.points_to_local(points);
        self.resolver(mode).resolve_all(&local)
    }
}
