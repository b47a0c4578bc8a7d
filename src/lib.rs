//! Domain-label comparison for subblocked block models.
//!
//! Compares the categorical labels of a subblocked 3-D grid model against
//! either a scattered set of sample points or a second subblocked model with
//! a different subblock scheme, and reports how well the two agree.
//!
//! Every query point is located with a two-level lookup: a reverse grid
//! index maps the point's parent cell to the subblocks whose centroid falls
//! in it, and those few candidates are tested against their precomputed
//! extents.
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use subblock_compare::{
//!     AttributeTable, AttributeValues, BlockTransform, ComparisonConfig, IndexedModel,
//!     ModelGrid, PointCollection, PointComparison, ResolutionOutcome, SubblockedModel,
//! };
//!
//! let grid = ModelGrid::new(DVec3::splat(4.0), [2, 1, 1]).unwrap();
//! let model = SubblockedModel::new(
//!     "model",
//!     grid,
//!     BlockTransform::default(),
//!     vec![DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0)],
//!     vec![DVec3::splat(4.0); 2],
//!     AttributeTable::new().with(
//!         "Domain",
//!         AttributeValues::Text(vec!["ore".into(), "waste".into()]),
//!     ),
//! )
//! .unwrap();
//!
//! let indexed = IndexedModel::build(&model);
//! let mode = Default::default();
//! assert_eq!(indexed.resolve_world(&[1.0, 0.0, 0.0], mode), ResolutionOutcome::Matched(0));
//! assert_eq!(indexed.resolve_world(&[10.0, 0.0, 0.0], mode), ResolutionOutcome::Outside);
//!
//! let points = PointCollection::new(
//!     "samples",
//!     vec![DVec3::new(1.0, 0.0, 0.0), DVec3::new(5.0, 0.0, 0.0)],
//!     None,
//!     AttributeTable::new().with(
//!         "domain",
//!         AttributeValues::Text(vec!["ore".into(), "waste".into()]),
//!     ),
//! )
//! .unwrap();
//! let comparison = PointComparison::run(&model, &points, &ComparisonConfig::default()).unwrap();
//! let report = comparison.report(None).unwrap();
//! assert_eq!(report.match_percent, 100.0);
//! ```

#[macro_use]
mod macros;

mod error;
mod types;
mod util;

pub mod attributes;
pub mod compare;
pub mod config;
pub mod extent;
pub mod grid_index;
pub mod interchange;
pub mod model;
pub mod report;
pub mod resample;
pub mod resolver;
pub mod solid;
pub mod validation;

pub use attributes::{
    AttributeSelector, AttributeTable, AttributeValues, LabelCase, Labels, SelectionRule,
};
pub use compare::{ModelComparison, PointComparison};
pub use config::ComparisonConfig;
pub use error::CompareError;
pub use extent::{Extent, ExtentTable};
pub use grid_index::{GridBounds, ReverseGridIndex};
pub use model::{BlockTransform, ModelGrid, PointCollection, SubblockedModel};
pub use report::{ContingencyTable, DomainReport, FrequencyTable, LabeledPairs};
pub use resample::{CommonGrid, Rational, SizeHint, DEFAULT_MAX_GRID_CELLS};
pub use resolver::{
    BoundsMode, IndexedModel, PointResolver, ResolutionOutcome, ResolutionSummary, ResolvedPoint,
};
pub use solid::TriangleMesh;
pub use types::{GridCoord, Point3, Point3Like};
pub use validation::{validate_model, ModelValidationReport};
