//! Read-only views of the external objects a comparison consumes.
//!
//! A subblocked model stores its subblock centroids in world coordinates. The
//! index works in *block-local* coordinates: world coordinates with the model
//! origin removed, inverse-rotated into the model axes, then shifted by half a
//! parent cell so that parent cell `(0, 0, 0)` covers `[0, res)` on each axis.

use glam::{DQuat, DVec3};

use crate::attributes::AttributeTable;
use crate::error::CompareError;
use crate::types::Point3Like;

/// Translation and rotation between world and block coordinates.
///
/// In block coordinates `[0, 0, 0]` is the centre of the parent cell in
/// column 0, row 0, slice 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTransform {
    pub origin: DVec3,
    /// Rotation from block axes to world axes.
    pub rotation: DQuat,
}

impl Default for BlockTransform {
    fn default() -> Self {
        Self {
            origin: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl BlockTransform {
    pub fn new(origin: DVec3, rotation: DQuat) -> Self {
        Self { origin, rotation }
    }

    pub fn translation(origin: DVec3) -> Self {
        Self::new(origin, DQuat::IDENTITY)
    }

    /// Build from a `(q0, q1, q2, q3)` quaternion where `q0 = cos(angle / 2)`.
    pub fn from_quaternion(origin: DVec3, q: [f64; 4]) -> Self {
        let rotation = DQuat::from_xyzw(q[1], q[2], q[3], q[0]).normalize();
        Self::new(origin, rotation)
    }

    #[inline]
    pub fn world_to_block(&self, world: DVec3) -> DVec3 {
        self.rotation.inverse() * (world - self.origin)
    }

    #[inline]
    pub fn block_to_world(&self, block: DVec3) -> DVec3 {
        self.rotation * block + self.origin
    }
}

/// Parent grid of a model: cell size and row/column/slice counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelGrid {
    /// Size of one parent cell along x, y, z.
    pub resolution: DVec3,
    /// Column, row and slice counts.
    pub counts: [u32; 3],
}

impl ModelGrid {
    pub fn new(resolution: DVec3, counts: [u32; 3]) -> Result<Self, CompareError> {
        if !(resolution.is_finite() && resolution.min_element() > 0.0) {
            return Err(CompareError::InvalidModel(format!(
                "resolution must be positive on every axis, got {:?}",
                resolution.to_array()
            )));
        }
        Ok(Self { resolution, counts })
    }

    #[inline]
    pub fn half_resolution(&self) -> DVec3 {
        self.resolution * 0.5
    }

    /// Total physical length per axis (`resolution * count`).
    pub fn total_extent(&self) -> DVec3 {
        self.resolution
            * DVec3::new(
                self.counts[0] as f64,
                self.counts[1] as f64,
                self.counts[2] as f64,
            )
    }

    pub fn num_parent_cells(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).product()
    }
}

/// A subblocked block model as supplied by the external model store.
#[derive(Debug, Clone)]
pub struct SubblockedModel {
    pub name: String,
    pub grid: ModelGrid,
    pub transform: BlockTransform,
    /// Subblock centroids in world coordinates.
    centroids: Vec<DVec3>,
    /// Subblock sizes along the block axes.
    sizes: Vec<DVec3>,
    pub attributes: AttributeTable,
}

impl SubblockedModel {
    pub fn new(
        name: impl Into<String>,
        grid: ModelGrid,
        transform: BlockTransform,
        centroids: Vec<DVec3>,
        sizes: Vec<DVec3>,
        attributes: AttributeTable,
    ) -> Result<Self, CompareError> {
        if sizes.len() != centroids.len() {
            return Err(CompareError::LengthMismatch {
                what: "subblock sizes",
                expected: centroids.len(),
                got: sizes.len(),
            });
        }
        attributes.check_len(centroids.len(), "subblock attribute")?;
        Ok(Self {
            name: name.into(),
            grid,
            transform,
            centroids,
            sizes,
            attributes,
        })
    }

    /// Build from centroids already expressed in block coordinates.
    pub fn from_block_coordinates(
        name: impl Into<String>,
        grid: ModelGrid,
        transform: BlockTransform,
        block_centroids: &[DVec3],
        sizes: Vec<DVec3>,
        attributes: AttributeTable,
    ) -> Result<Self, CompareError> {
        let centroids = block_centroids
            .iter()
            .map(|&c| transform.block_to_world(c))
            .collect();
        Self::new(name, grid, transform, centroids, sizes, attributes)
    }

    #[inline]
    pub fn num_subblocks(&self) -> usize {
        self.centroids.len()
    }

    pub fn centroids(&self) -> &[DVec3] {
        &self.centroids
    }

    pub fn sizes(&self) -> &[DVec3] {
        &self.sizes
    }

    /// Convert a world point into this model's block-local frame.
    #[inline]
    pub fn to_local(&self, world: DVec3) -> DVec3 {
        self.transform.world_to_block(world) + self.grid.half_resolution()
    }

    /// Convert a block-local point back to world coordinates.
    #[inline]
    pub fn local_to_world(&self, local: DVec3) -> DVec3 {
        self.transform
            .block_to_world(local - self.grid.half_resolution())
    }

    /// Subblock centroids in the block-local frame, in model order.
    pub fn local_centroids(&self) -> Vec<DVec3> {
        self.centroids.iter().map(|&c| self.to_local(c)).collect()
    }

    /// Project a batch of world points into the block-local frame.
    pub fn points_to_local<P: Point3Like>(&self, points: &[P]) -> Vec<DVec3> {
        points.iter().map(|p| self.to_local(p.to_dvec3())).collect()
    }
}

/// An external sample point collection.
#[derive(Debug, Clone)]
pub struct PointCollection {
    pub name: String,
    /// Point coordinates in world space.
    points: Vec<DVec3>,
    /// Per-point visibility flag, parallel to `points`.
    visibility: Vec<bool>,
    pub attributes: AttributeTable,
}

impl PointCollection {
    pub fn new(
        name: impl Into<String>,
        points: Vec<DVec3>,
        visibility: Option<Vec<bool>>,
        attributes: AttributeTable,
    ) -> Result<Self, CompareError> {
        let visibility = visibility.unwrap_or_else(|| vec![true; points.len()]);
        if visibility.len() != points.len() {
            return Err(CompareError::LengthMismatch {
                what: "point visibility",
                expected: points.len(),
                got: visibility.len(),
            });
        }
        attributes.check_len(points.len(), "point attribute")?;
        Ok(Self {
            name: name.into(),
            points,
            visibility,
            attributes,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn visibility(&self) -> &[bool] {
        &self.visibility
    }
}
