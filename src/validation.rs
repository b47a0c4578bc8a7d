//! Structural validation for subblocked models.
//!
//! Resolution assumes every subblock sits wholly inside the parent cell its
//! centroid falls in and that siblings do not overlap. These checks verify
//! that on real data. Useful for debugging imports and for tests.

use crate::extent::Extent;
use crate::model::SubblockedModel;
use crate::resolver::IndexedModel;

/// Detailed validation report for one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelValidationReport {
    /// Number of subblocks in the model.
    pub num_subblocks: usize,
    /// Number of parent cells holding at least one subblock.
    pub occupied_cells: usize,
    /// Largest number of siblings in one parent cell.
    pub max_siblings: usize,

    /// Subblocks with a non-finite centroid (not indexed at all).
    pub non_finite: Vec<u32>,
    /// Subblocks with a size component that is zero, negative or not finite.
    pub non_positive_sizes: Vec<u32>,
    /// Subblocks whose centroid cell is outside `[0, count)` on some axis.
    pub outside_grid: Vec<u32>,
    /// Subblocks extending beyond the parent cell their centroid falls in.
    pub straddling: Vec<u32>,
    /// Sibling pairs whose interiors overlap.
    pub overlapping: Vec<(u32, u32)>,
}

impl ModelValidationReport {
    /// True if the model satisfies every structural assumption.
    pub fn is_valid(&self) -> bool {
        self.non_finite.is_empty()
            && self.non_positive_sizes.is_empty()
            && self.outside_grid.is_empty()
            && self.straddling.is_empty()
            && self.overlapping.is_empty()
    }

    /// Format a summary of any issues found.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            return "Valid".to_string();
        }

        let mut issues = Vec::new();
        if !self.non_finite.is_empty() {
            issues.push(format!("{} non-finite centroids", self.non_finite.len()));
        }
        if !self.non_positive_sizes.is_empty() {
            issues.push(format!(
                "{} non-positive sizes",
                self.non_positive_sizes.len()
            ));
        }
        if !self.outside_grid.is_empty() {
            issues.push(format!("{} outside grid", self.outside_grid.len()));
        }
        if !self.straddling.is_empty() {
            issues.push(format!(
                "{} straddle their parent cell",
                self.straddling.len()
            ));
        }
        if !self.overlapping.is_empty() {
            issues.push(format!(
                "{} overlapping sibling pairs",
                self.overlapping.len()
            ));
        }
        issues.join(", ")
    }
}

/// Validate a model, building its index.
pub fn validate_model(model: &SubblockedModel) -> ModelValidationReport {
    validate_indexed(&IndexedModel::build(model))
}

/// Validate a model whose index is already built.
pub fn validate_indexed(indexed: &IndexedModel<'_>) -> ModelValidationReport {
    let model = indexed.model();
    let index = indexed.index();
    let extents = indexed.extents();
    let bounds = indexed.bounds();
    let resolution = model.grid.resolution;

    let mut report = ModelValidationReport {
        num_subblocks: model.num_subblocks(),
        occupied_cells: index.num_buckets(),
        max_siblings: index.max_bucket_len(),
        ..Default::default()
    };

    for (s, size) in model.sizes().iter().enumerate() {
        let s = s as u32;
        if !(size.is_finite() && size.min_element() > 0.0) {
            report.non_positive_sizes.push(s);
        }
        let Some(cell) = index.cell_of_subblock(s) else {
            report.non_finite.push(s);
            continue;
        };
        if !bounds.contains(cell) {
            report.outside_grid.push(s);
        }
        if !Extent::of_cell(cell, resolution).contains_extent(extents.get(s)) {
            report.straddling.push(s);
        }
    }

    for (_, siblings) in index.iter() {
        for (n, &a) in siblings.iter().enumerate() {
            for &b in &siblings[n + 1..] {
                if extents.get(a).overlaps_interior(extents.get(b)) {
                    report.overlapping.push((a, b));
                }
            }
        }
    }

    if !report.is_valid() {
        log::warn!("model {:?}: {}", model.name, report.summary());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeTable;
    use crate::model::{BlockTransform, ModelGrid};
    use glam::DVec3;

    fn model(centroids: Vec<DVec3>, sizes: Vec<DVec3>) -> SubblockedModel {
        let grid = ModelGrid::new(DVec3::splat(4.0), [2, 1, 1]).unwrap();
        SubblockedModel::new(
            "m",
            grid,
            BlockTransform::default(),
            centroids,
            sizes,
            AttributeTable::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_clean_model_is_valid() {
        let m = model(
            vec![
                DVec3::new(-1.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(4.0, 0.0, 0.0),
            ],
            vec![
                DVec3::new(2.0, 4.0, 4.0),
                DVec3::new(2.0, 4.0, 4.0),
                DVec3::splat(4.0),
            ],
        );
        let report = validate_model(&m);
        assert!(report.is_valid(), "{}", report.summary());
        assert_eq!(report.summary(), "Valid");
        assert_eq!(report.occupied_cells, 2);
        assert_eq!(report.max_siblings, 2);
    }

    #[test]
    fn test_detects_each_problem() {
        let m = model(
            vec![
                DVec3::new(-1.0, 0.0, 0.0),
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.5, 0.0, 0.0),
                DVec3::new(8.0, 0.0, 0.0),
                DVec3::new(f64::NAN, 0.0, 0.0),
                DVec3::new(4.0, 0.0, 0.0),
            ],
            vec![
                DVec3::new(2.0, 4.0, 4.0),
                DVec3::new(2.0, 4.0, 4.0),
                DVec3::new(2.0, 4.0, 4.0),
                DVec3::splat(4.0),
                DVec3::splat(4.0),
                DVec3::new(4.0, 0.0, 4.0),
            ],
        );
        let report = validate_model(&m);
        assert!(!report.is_valid());
        assert_eq!(report.non_finite, vec![4]);
        assert_eq!(report.non_positive_sizes, vec![5]);
        assert_eq!(report.outside_grid, vec![3]);
        // Local x extent of subblock 2 is [2.5, 4.5] in cell [0, 4].
        assert_eq!(report.straddling, vec![2]);
        assert_eq!(report.overlapping, vec![(0, 1), (1, 2)]);
        let summary = report.summary();
        assert!(summary.contains("1 outside grid"), "{}", summary);
        assert!(summary.contains("2 overlapping sibling pairs"), "{}", summary);
    }
}
