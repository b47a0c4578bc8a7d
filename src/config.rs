//! Run configuration shared by both comparison pipelines.

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeSelector, LabelCase, SelectionRule, DEFAULT_DOMAIN_ALIASES};
use crate::resample::DEFAULT_MAX_GRID_CELLS;
use crate::resolver::BoundsMode;

/// Configuration for a comparison run.
///
/// Every field has a default, so a JSON config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Bounds handling for point-vs-model resolution.
    ///
    /// Model-vs-model runs always resolve unbounded, since the two models
    /// need not share row/column/slice counts.
    pub point_bounds: BoundsMode,
    /// Case handling applied to labels on both sides.
    ///
    /// Defaults to `Preserve`, so "Ore" and "ore" are distinct. Set
    /// `Lowercase` for a case-insensitive comparison of free-typed logging
    /// codes.
    pub label_case: LabelCase,
    /// Skip points whose visibility flag is off.
    pub only_visible_points: bool,
    /// Ceiling on the number of comparison-grid cells.
    pub max_grid_cells: u64,
    /// Also build a contingency table reduced to the N most frequent
    /// categories per side.
    pub top_n: Option<usize>,
    /// Attribute names to try on models, in priority order.
    pub model_attribute: Vec<String>,
    /// Attribute names to try on point collections, in priority order.
    pub point_attribute: Vec<String>,
    /// Fall back to the first categorical attribute if no name matches.
    pub first_categorical: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        let aliases: Vec<String> = DEFAULT_DOMAIN_ALIASES.iter().map(|s| s.to_string()).collect();
        Self {
            point_bounds: BoundsMode::Enforced,
            label_case: LabelCase::Preserve,
            only_visible_points: false,
            max_grid_cells: DEFAULT_MAX_GRID_CELLS as u64,
            top_n: None,
            model_attribute: aliases.clone(),
            point_attribute: aliases,
            first_categorical: false,
        }
    }
}

impl ComparisonConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn selector(&self, names: &[String]) -> AttributeSelector {
        let selector = AttributeSelector::aliases(names);
        if self.first_categorical {
            selector.then(SelectionRule::FirstCategorical)
        } else {
            selector
        }
    }

    pub fn model_selector(&self) -> AttributeSelector {
        self.selector(&self.model_attribute)
    }

    pub fn point_selector(&self) -> AttributeSelector {
        self.selector(&self.point_attribute)
    }

    #[inline]
    pub fn max_grid_cells(&self) -> u128 {
        self.max_grid_cells as u128
    }
}
