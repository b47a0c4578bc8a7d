//! Axis-aligned extent of every subblock in the block-local frame.

use glam::DVec3;

use crate::types::GridCoord;

/// Fractional digits kept on extent corners.
///
/// Converting centroids from world to block coordinates leaves drift in the
/// last bits; without rounding a corner can land a hair inside its true
/// position and reject points exactly on the face.
pub const EXTENT_DECIMALS: i32 = 6;

#[inline]
fn round_decimals(v: DVec3) -> DVec3 {
    let scale = 10f64.powi(EXTENT_DECIMALS);
    DVec3::new(
        (v.x * scale).round_ties_even() / scale,
        (v.y * scale).round_ties_even() / scale,
        (v.z * scale).round_ties_even() / scale,
    )
}

/// Closed axis-aligned box `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: DVec3,
    pub max: DVec3,
}

impl Extent {
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Extent of a box given its centroid and size, with rounded corners.
    #[inline]
    pub fn from_centroid_size(centroid: DVec3, size: DVec3) -> Self {
        let half = size * 0.5;
        Self::new(round_decimals(centroid - half), round_decimals(centroid + half))
    }

    /// Extent of parent cell `coord` in a grid of `resolution`, rounded the
    /// same way as subblock extents.
    pub fn of_cell(coord: GridCoord, resolution: DVec3) -> Self {
        let min = DVec3::new(coord.i as f64, coord.j as f64, coord.k as f64) * resolution;
        Self::new(round_decimals(min), round_decimals(min + resolution))
    }

    /// Inclusive on both ends on every axis.
    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        self.min.x <= p.x
            && p.x <= self.max.x
            && self.min.y <= p.y
            && p.y <= self.max.y
            && self.min.z <= p.z
            && p.z <= self.max.z
    }

    /// True if the interiors overlap (shared faces do not count).
    #[inline]
    pub fn overlaps_interior(&self, other: &Extent) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
            && self.min.z < other.max.z
            && other.min.z < self.max.z
    }

    #[inline]
    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}

/// Precomputed extents, indexed by subblock.
#[derive(Debug, Clone, Default)]
pub struct ExtentTable {
    extents: Vec<Extent>,
}

impl ExtentTable {
    /// Build from block-local centroids and sizes (parallel slices).
    pub fn build(local_centroids: &[DVec3], sizes: &[DVec3]) -> Self {
        debug_assert_eq!(local_centroids.len(), sizes.len());
        let extents = local_centroids
            .iter()
            .zip(sizes)
            .map(|(&c, &s)| Extent::from_centroid_size(c, s))
            .collect();
        Self { extents }
    }

    #[inline]
    pub fn get(&self, subblock: u32) -> &Extent {
        &self.extents[subblock as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Extent> {
        self.extents.iter()
    }
}
