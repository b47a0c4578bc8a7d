//! Common comparison grid for two subblocked models.
//!
//! Two models with different subblock schemes are compared on a synthetic
//! uniform grid whose cell size is, per axis, the GCD of the two models'
//! smallest subblock sizes. Every cell of that grid lies wholly inside one
//! subblock of each model, so its centroid is a fair probe for both.
//!
//! Cell sizes are derived from exact fractions of the user-supplied size
//! hints and only converted to `f64` when centroids are generated.

mod rational;

pub use rational::Rational;

use std::str::FromStr;

use glam::DVec3;

use crate::error::CompareError;
use crate::model::ModelGrid;

/// Default ceiling on the number of comparison-grid cells.
pub const DEFAULT_MAX_GRID_CELLS: u128 = 10_000_000_000;

/// Relative tolerance when checking that two models span the same extent.
const EXTENT_REL_TOLERANCE: f64 = 1e-9;

/// Smallest subblock size of a model along x, y, z, kept exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    components: [Rational; 3],
}

impl SizeHint {
    pub fn new(components: [Rational; 3]) -> Result<Self, CompareError> {
        for (axis, c) in components.iter().enumerate() {
            if !c.is_positive() {
                return Err(CompareError::InvalidSizeHint {
                    input: format!("{} {} {}", components[0], components[1], components[2]),
                    reason: format!("component {} must be positive, got {}", axis, c),
                });
            }
        }
        Ok(Self { components })
    }

    /// Parse three whitespace- or comma-separated sizes, e.g. `"2.5 2.5 1/3"`.
    pub fn parse(input: &str) -> Result<Self, CompareError> {
        let invalid = |reason: String| CompareError::InvalidSizeHint {
            input: input.to_string(),
            reason,
        };
        let parts: Vec<&str> = input
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 {
            return Err(invalid(format!("expected 3 components, got {}", parts.len())));
        }
        let mut components = [Rational::ZERO; 3];
        for (axis, part) in parts.iter().enumerate() {
            components[axis] = Rational::parse(part)
                .ok_or_else(|| invalid(format!("component {} ({:?}) is not a number", axis, part)))?;
        }
        Self::new(components).map_err(|_| invalid("all components must be positive".into()))
    }

    /// From floating sizes, read back as their shortest decimal form.
    pub fn from_f64s(sizes: [f64; 3]) -> Result<Self, CompareError> {
        let mut components = [Rational::ZERO; 3];
        for (axis, &s) in sizes.iter().enumerate() {
            components[axis] = Rational::from_f64(s).ok_or_else(|| CompareError::InvalidSizeHint {
                input: format!("{:?}", sizes),
                reason: format!("component {} is not finite", axis),
            })?;
        }
        Self::new(components)
    }

    pub fn components(&self) -> [Rational; 3] {
        self.components
    }

    pub fn to_dvec3(&self) -> DVec3 {
        DVec3::new(
            self.components[0].to_f64(),
            self.components[1].to_f64(),
            self.components[2].to_f64(),
        )
    }
}

impl FromStr for SizeHint {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn extents_match(a: DVec3, b: DVec3) -> bool {
    (0..3).all(|axis| {
        let (x, y) = (a[axis], b[axis]);
        (x - y).abs() <= EXTENT_REL_TOLERANCE * x.abs().max(y.abs()).max(1.0)
    })
}

/// Exact length of each axis, `resolution * count`, without the rounding of
/// the floating product (0.7 * 3 is 2.0999999999999996 in f64).
fn exact_lengths(grid: &ModelGrid) -> Result<[Rational; 3], CompareError> {
    let mut lengths = [Rational::ZERO; 3];
    for axis in 0..3 {
        let res = grid.resolution[axis];
        let invalid = |reason: &str| {
            CompareError::InvalidModel(format!("resolution {} on axis {} {}", res, axis, reason))
        };
        if !res.is_finite() {
            return Err(invalid("is not finite"));
        }
        lengths[axis] = Rational::from_f64(res)
            .and_then(|r| r.checked_mul(Rational::from_integer(grid.counts[axis] as i128)))
            .ok_or_else(|| invalid("overflows exact arithmetic"))?;
    }
    Ok(lengths)
}

/// Uniform comparison grid spanning `[0, extent)` in block-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonGrid {
    exact_cell: [Rational; 3],
    cell: DVec3,
    counts: [u64; 3],
}

impl CommonGrid {
    /// Plan the comparison grid for two models.
    ///
    /// Both parent grids must span the same physical extent. Per-axis cell
    /// counts are `length / gcd`, floored, with the length taken exactly from
    /// resolution and count. Fails if the extents differ, if the GCD cannot
    /// be represented, or if the cell count would exceed `max_cells`.
    pub fn plan(
        hint_a: &SizeHint,
        hint_b: &SizeHint,
        grid_a: &ModelGrid,
        grid_b: &ModelGrid,
        max_cells: u128,
    ) -> Result<Self, CompareError> {
        let lengths_a = exact_lengths(grid_a)?;
        let lengths_b = exact_lengths(grid_b)?;
        let (extent_a, extent_b) = (grid_a.total_extent(), grid_b.total_extent());
        if lengths_a != lengths_b && !extents_match(extent_a, extent_b) {
            return Err(CompareError::IncompatibleExtents {
                left: extent_a.to_array(),
                right: extent_b.to_array(),
            });
        }

        let a = hint_a.components();
        let b = hint_b.components();
        let mut exact_cell = [Rational::ZERO; 3];
        let mut counts = [0u64; 3];
        for axis in 0..3 {
            let overflow = || CompareError::InvalidSizeHint {
                input: format!("{} / {}", a[axis], b[axis]),
                reason: format!("GCD on axis {} is not representable", axis),
            };
            let g = a[axis].gcd(b[axis]).ok_or_else(overflow)?;
            // Within tolerance but not exactly equal: the shorter length bounds both.
            let length = lengths_a[axis].min(lengths_b[axis]);
            let n = length.checked_div(g).ok_or_else(overflow)?.floor();
            exact_cell[axis] = g;
            counts[axis] = u64::try_from(n.max(0)).unwrap_or(u64::MAX);
        }

        let estimated = counts
            .iter()
            .try_fold(1u128, |acc, &c| acc.checked_mul(c as u128))
            .unwrap_or(u128::MAX);
        if estimated > max_cells {
            return Err(CompareError::GridTooLarge {
                estimated,
                limit: max_cells,
            });
        }

        let cell = DVec3::new(
            exact_cell[0].to_f64(),
            exact_cell[1].to_f64(),
            exact_cell[2].to_f64(),
        );
        log::info!(
            "comparison grid: cell {} x {} x {}, {} x {} x {} = {} centroids",
            exact_cell[0],
            exact_cell[1],
            exact_cell[2],
            counts[0],
            counts[1],
            counts[2],
            estimated
        );
        Ok(Self {
            exact_cell,
            cell,
            counts,
        })
    }

    #[inline]
    pub fn cell_size(&self) -> DVec3 {
        self.cell
    }

    pub fn exact_cell_size(&self) -> [Rational; 3] {
        self.exact_cell
    }

    pub fn counts(&self) -> [u64; 3] {
        self.counts
    }

    /// Total number of centroids.
    pub fn len(&self) -> u64 {
        self.counts.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Centroid coordinates along one axis: `cell / 2 + i * cell`.
    pub fn axis_coordinates(&self, axis: usize) -> Vec<f64> {
        let step = self.cell[axis];
        let start = step * 0.5;
        (0..self.counts[axis]).map(|i| start + i as f64 * step).collect()
    }

    /// Centroid number `n`, with x varying slowest and z fastest. `None`
    /// past the end of the grid.
    pub fn centroid(&self, n: u64) -> Option<DVec3> {
        (n < self.len()).then(|| self.centroid_unchecked(n))
    }

    /// Caller guarantees `n < self.len()`, which also rules out zero counts.
    #[inline]
    fn centroid_unchecked(&self, n: u64) -> DVec3 {
        let [_, ny, nz] = self.counts;
        let iz = n % nz;
        let iy = (n / nz) % ny;
        let ix = n / (nz * ny);
        let half = self.cell * 0.5;
        half + DVec3::new(ix as f64, iy as f64, iz as f64) * self.cell
    }

    /// All centroids in row-major (x slowest) order, generated lazily.
    pub fn centroids(&self) -> impl ExactSizeIterator<Item = DVec3> + '_ {
        let len = usize::try_from(self.len()).unwrap_or(usize::MAX);
        (0..len).map(move |n| self.centroid_unchecked(n as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(s: &str) -> SizeHint {
        SizeHint::parse(s).unwrap()
    }

    #[test]
    fn test_size_hint_parse() {
        let h = hint("2.5, 2.5 1/3");
        assert_eq!(h.components()[2], Rational::new(1, 3).unwrap());
        assert!(matches!(
            SizeHint::parse("1 2"),
            Err(CompareError::InvalidSizeHint { .. })
        ));
        assert!(matches!(
            SizeHint::parse("1 x 2"),
            Err(CompareError::InvalidSizeHint { .. })
        ));
        assert!(matches!(
            SizeHint::parse("1 0 2"),
            Err(CompareError::InvalidSizeHint { .. })
        ));
        assert!(matches!(
            SizeHint::parse("1 -1 2"),
            Err(CompareError::InvalidSizeHint { .. })
        ));
        assert!("5 5 5".parse::<SizeHint>().is_ok());
    }

    fn single_cell(extent: DVec3) -> ModelGrid {
        ModelGrid::new(extent, [1, 1, 1]).unwrap()
    }

    #[test]
    fn test_cell_size_is_per_axis_gcd() {
        let grid = single_cell(DVec3::splat(20.0));
        let grid = CommonGrid::plan(
            &hint("5 2.5 2"),
            &hint("2 1.25 3"),
            &grid,
            &grid,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();
        assert_eq!(grid.cell_size(), DVec3::new(1.0, 1.25, 1.0));
        assert_eq!(grid.counts(), [20, 16, 20]);
        assert_eq!(grid.len(), 20 * 16 * 20);
    }

    #[test]
    fn test_decimal_cell_count_is_exact() {
        // 12 / 0.1 is 119.99999999999999 in f64.
        let grid = single_cell(DVec3::new(12.0, 1.0, 1.0));
        let grid = CommonGrid::plan(
            &hint("0.1 1 1"),
            &hint("0.1 1 1"),
            &grid,
            &grid,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();
        assert_eq!(grid.counts(), [120, 1, 1]);
    }

    #[test]
    fn test_decimal_resolution_times_count_is_exact() {
        // 0.7 * 3 is 2.0999999999999996 in f64; the last slab must survive.
        let model_grid = ModelGrid::new(DVec3::new(0.7, 1.0, 1.0), [3, 1, 1]).unwrap();
        assert!(model_grid.total_extent().x < 2.1);
        let grid = CommonGrid::plan(
            &hint("0.7 1 1"),
            &hint("0.35 1 1"),
            &model_grid,
            &model_grid,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();
        assert_eq!(grid.counts(), [6, 1, 1]);
        assert_eq!(grid.exact_cell_size()[0], Rational::new(7, 20).unwrap());

        // Same span from a different parent scheme is compatible.
        let other = ModelGrid::new(DVec3::new(2.1, 1.0, 1.0), [1, 1, 1]).unwrap();
        let grid = CommonGrid::plan(
            &hint("0.7 1 1"),
            &hint("2.1 1 1"),
            &model_grid,
            &other,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();
        assert_eq!(grid.counts(), [3, 1, 1]);
    }

    #[test]
    fn test_extreme_resolution_is_reported_as_overflow() {
        let huge = single_cell(DVec3::new(1e300, 1.0, 1.0));
        let err = CommonGrid::plan(
            &hint("1 1 1"),
            &hint("1 1 1"),
            &huge,
            &huge,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap_err();
        match err {
            CompareError::InvalidModel(msg) => assert!(msg.contains("overflows"), "{}", msg),
            other => panic!("expected InvalidModel, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_extents_rejected() {
        let err = CommonGrid::plan(
            &hint("1 1 1"),
            &hint("1 1 1"),
            &ModelGrid::new(DVec3::new(4.0, 4.0, 2.0), [2, 1, 2]).unwrap(),
            &ModelGrid::new(DVec3::new(4.0, 4.0, 3.0), [2, 1, 2]).unwrap(),
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompareError::IncompatibleExtents {
                left: [8.0, 4.0, 4.0],
                right: [8.0, 4.0, 6.0]
            }
        );
    }

    #[test]
    fn test_grid_too_large() {
        let grid = single_cell(DVec3::splat(100.0));
        let err = CommonGrid::plan(
            &hint("0.001 0.001 0.001"),
            &hint("0.001 0.001 0.001"),
            &grid,
            &grid,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompareError::GridTooLarge {
                estimated: 100_000u128.pow(3),
                limit: DEFAULT_MAX_GRID_CELLS
            }
        );
    }

    #[test]
    fn test_centroids_x_slowest() {
        let grid = single_cell(DVec3::new(4.0, 4.0, 2.0));
        let grid = CommonGrid::plan(
            &hint("2 2 2"),
            &hint("2 2 2"),
            &grid,
            &grid,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();
        let centroids: Vec<DVec3> = grid.centroids().collect();
        assert_eq!(
            centroids,
            vec![
                DVec3::new(1.0, 1.0, 1.0),
                DVec3::new(1.0, 3.0, 1.0),
                DVec3::new(3.0, 1.0, 1.0),
                DVec3::new(3.0, 3.0, 1.0),
            ]
        );
        assert_eq!(grid.centroid(3), Some(DVec3::new(3.0, 3.0, 1.0)));
        assert_eq!(grid.centroid(4), None);
        assert_eq!(grid.axis_coordinates(0), vec![1.0, 3.0]);
        assert_eq!(grid.centroids().len(), 4);
    }

    #[test]
    fn test_cell_larger_than_extent_gives_empty_grid() {
        let grid = single_cell(DVec3::new(4.0, 1.0, 1.0));
        let grid = CommonGrid::plan(
            &hint("8 1 1"),
            &hint("8 1 1"),
            &grid,
            &grid,
            DEFAULT_MAX_GRID_CELLS,
        )
        .unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.centroids().count(), 0);
        assert_eq!(grid.centroid(0), None);
    }
}
