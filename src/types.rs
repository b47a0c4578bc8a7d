//! Core value types shared by the index, resolver and resampler.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A point in 3-D space.
///
/// Small `#[repr(C)]` representation with a stable layout so callers can hand
/// over coordinate buffers without copying. Whether the point is in world or
/// block-local coordinates depends on the API it is passed to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create from any type implementing `Point3Like`.
    #[inline]
    pub fn from_like<P: Point3Like>(p: &P) -> Self {
        Self::new(p.x(), p.y(), p.z())
    }

    #[inline]
    pub fn to_dvec3(self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn from_dvec3(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<[f64; 3]> for Point3 {
    #[inline]
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Point3> for [f64; 3] {
    #[inline]
    fn from(p: Point3) -> Self {
        [p.x, p.y, p.z]
    }
}

impl From<DVec3> for Point3 {
    #[inline]
    fn from(v: DVec3) -> Self {
        Self::from_dvec3(v)
    }
}

impl From<Point3> for DVec3 {
    #[inline]
    fn from(p: Point3) -> DVec3 {
        p.to_dvec3()
    }
}

/// Trait for types that can be used as query points.
///
/// This allows zero-copy input from various math libraries.
pub trait Point3Like {
    fn x(&self) -> f64;
    fn y(&self) -> f64;
    fn z(&self) -> f64;

    #[inline]
    fn to_dvec3(&self) -> DVec3 {
        DVec3::new(self.x(), self.y(), self.z())
    }
}

impl Point3Like for Point3 {
    #[inline]
    fn x(&self) -> f64 {
        self.x
    }
    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
    #[inline]
    fn z(&self) -> f64 {
        self.z
    }
}

impl Point3Like for [f64; 3] {
    #[inline]
    fn x(&self) -> f64 {
        self[0]
    }
    #[inline]
    fn y(&self) -> f64 {
        self[1]
    }
    #[inline]
    fn z(&self) -> f64 {
        self[2]
    }
}

impl Point3Like for (f64, f64, f64) {
    #[inline]
    fn x(&self) -> f64 {
        self.0
    }
    #[inline]
    fn y(&self) -> f64 {
        self.1
    }
    #[inline]
    fn z(&self) -> f64 {
        self.2
    }
}

impl Point3Like for DVec3 {
    #[inline]
    fn x(&self) -> f64 {
        self.x
    }
    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
    #[inline]
    fn z(&self) -> f64 {
        self.z
    }
}

/// Integer coordinate of a parent ("coarse") grid cell.
///
/// Always derived with floor division, never truncation toward zero, so a
/// block-local coordinate of `-0.5` with resolution `1.0` lands in cell `-1`.
/// Keys are integers so that distinct float representations of the same cell
/// hash identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub i: i64,
    pub j: i64,
    pub k: i64,
}

impl GridCoord {
    #[inline]
    pub const fn new(i: i64, j: i64, k: i64) -> Self {
        Self { i, j, k }
    }

    /// Parent cell containing a block-local point.
    ///
    /// Returns `None` for non-finite coordinates, which have no cell.
    #[inline]
    pub fn containing(local: DVec3, resolution: DVec3) -> Option<Self> {
        let cell = (local / resolution).floor();
        if !cell.is_finite() {
            return None;
        }
        Some(Self::new(cell.x as i64, cell.y as i64, cell.z as i64))
    }

    #[inline]
    pub fn to_array(self) -> [i64; 3] {
        [self.i, self.j, self.k]
    }
}

impl From<[i64; 3]> for GridCoord {
    #[inline]
    fn from([i, j, k]: [i64; 3]) -> Self {
        Self::new(i, j, k)
    }
}
