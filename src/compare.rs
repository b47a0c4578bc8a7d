//! End-to-end comparison pipelines.
//!
//! Both pipelines are a single forward pass: select labels, build each
//! model's extent table and reverse grid index, resolve every query, then
//! fold the outcomes into [`LabeledPairs`]. Resolution outcomes are kept on
//! the result so they stay inspectable even if report generation fails.

use glam::DVec3;

use crate::attributes::Labels;
use crate::config::ComparisonConfig;
use crate::error::CompareError;
use crate::model::{PointCollection, SubblockedModel};
use crate::report::{DomainReport, LabeledPairs};
use crate::resample::{CommonGrid, SizeHint};
use crate::resolver::{BoundsMode, IndexedModel, ResolutionOutcome, ResolutionSummary, ResolvedPoint};
use crate::solid::{restrict_to_solid, TriangleMesh};
use crate::util::Timed;

fn count_hits(mask: &[bool]) -> usize {
    mask.iter().filter(|&&hit| hit).count()
}

/// Sample points compared against one subblocked model.
///
/// Side A of the report is the point collection, side B the model.
#[derive(Debug, Clone)]
pub struct PointComparison {
    /// One record per resolved point, in input order. `point_index` refers
    /// to the position in the original collection.
    pub records: Vec<ResolvedPoint>,
    /// Points not resolved because they were hidden.
    pub skipped: Vec<usize>,
    pub summary: ResolutionSummary,
    /// Per point: true if it resolved and its label differs from its subblock.
    pub point_mismatch: Vec<bool>,
    /// Per subblock: true if it contains at least one mismatching point.
    pub block_mismatch: Vec<bool>,
    /// Distinct subblocks that received at least one point.
    pub unique_blocks_hit: usize,
    pairs: LabeledPairs,
}

impl PointComparison {
    pub fn run(
        model: &SubblockedModel,
        points: &PointCollection,
        config: &ComparisonConfig,
    ) -> Result<Self, CompareError> {
        let _t = Timed::info("point comparison");
        let model_labels = Labels::select(&model.attributes, &config.model_selector(), config.label_case)?;
        let point_labels = Labels::select(&points.attributes, &config.point_selector(), config.label_case)?;

        let (active, skipped): (Vec<usize>, Vec<usize>) = (0..points.len())
            .partition(|&i| !config.only_visible_points || points.visibility()[i]);
        if !skipped.is_empty() {
            log::info!("skipping {} hidden points", skipped.len());
        }

        let indexed = IndexedModel::build(model);
        let active_points: Vec<DVec3> = active.iter().map(|&i| points.points()[i]).collect();
        let mut records = indexed.resolve_points(&active_points, config.point_bounds);
        for r in &mut records {
            r.point_index = active[r.point_index];
        }
        let summary = ResolutionSummary::from_records(&records);

        let mut pairs = LabeledPairs::new(
            points.name.clone(),
            point_labels.vocabulary().to_vec(),
            model.name.clone(),
            model_labels.vocabulary().to_vec(),
        );
        let mut point_mismatch = vec![false; points.len()];
        let mut block_mismatch = vec![false; model.num_subblocks()];
        let mut block_hit = vec![false; model.num_subblocks()];
        for r in &records {
            let p = r.point_index;
            match r.outcome {
                ResolutionOutcome::Matched(s) => {
                    let s = s as usize;
                    block_hit[s] = true;
                    if point_labels.label(p) != model_labels.label(s) {
                        point_mismatch[p] = true;
                        block_mismatch[s] = true;
                    }
                    pairs.push(p, point_labels.id(p), model_labels.id(s));
                }
                ResolutionOutcome::Outside => pairs.outside.push(p),
                ResolutionOutcome::Unresolved => pairs.unresolved.push(p),
            }
        }

        if summary.outside > 0 {
            log::warn!("{} points fall outside {:?}", summary.outside, model.name);
        }
        if summary.unresolved > 0 {
            log::warn!(
                "{} points have candidate subblocks in {:?} but no containing one",
                summary.unresolved,
                model.name
            );
        }

        let unique_blocks_hit = count_hits(&block_hit);
        log::info!(
            "{} of {} points matched, {} distinct subblocks hit",
            summary.matched,
            points.len(),
            unique_blocks_hit
        );

        Ok(Self {
            records,
            skipped,
            summary,
            point_mismatch,
            block_mismatch,
            unique_blocks_hit,
            pairs,
        })
    }

    pub fn pairs(&self) -> &LabeledPairs {
        &self.pairs
    }

    /// Aggregate into a report. Fails with `NoData` if no point resolved.
    pub fn report(&self, top_n: Option<usize>) -> Result<DomainReport, CompareError> {
        DomainReport::build(&self.pairs, top_n)
    }
}

/// Two subblocked models compared on their common grid.
///
/// Side A of the report is `model_a`, side B `model_b`.
#[derive(Debug, Clone)]
pub struct ModelComparison {
    pub grid: CommonGrid,
    /// Comparison centroids in the shared block-local frame, after any solid
    /// restriction. Query indices refer to this list.
    pub centroids: Vec<DVec3>,
    pub records_a: Vec<ResolvedPoint>,
    pub records_b: Vec<ResolvedPoint>,
    pub summary_a: ResolutionSummary,
    pub summary_b: ResolutionSummary,
    /// Centroids dropped because the two models disagreed on solid
    /// containment.
    pub solid_divergence: usize,
    /// Per subblock of `model_a`: true if it holds a mismatching centroid.
    pub mismatch_a: Vec<bool>,
    /// Per subblock of `model_b`: true if it holds a mismatching centroid.
    pub mismatch_b: Vec<bool>,
    pub unique_blocks_hit_a: usize,
    pub unique_blocks_hit_b: usize,
    pairs: LabeledPairs,
}

impl ModelComparison {
    /// Plan the common grid from the two size hints, optionally restrict it
    /// to `solid`, and resolve every centroid against both models.
    ///
    /// Configuration errors (extent mismatch, oversized grid, missing label
    /// attribute) are raised before any resolution work starts.
    pub fn run(
        model_a: &SubblockedModel,
        model_b: &SubblockedModel,
        hint_a: &SizeHint,
        hint_b: &SizeHint,
        solid: Option<&TriangleMesh>,
        config: &ComparisonConfig,
    ) -> Result<Self, CompareError> {
        let _t = Timed::info("model comparison");
        let selector = config.model_selector();
        let labels_a = Labels::select(&model_a.attributes, &selector, config.label_case)?;
        let labels_b = Labels::select(&model_b.attributes, &selector, config.label_case)?;

        let grid = CommonGrid::plan(
            hint_a,
            hint_b,
            &model_a.grid,
            &model_b.grid,
            config.max_grid_cells(),
        )?;

        let mut centroids: Vec<DVec3> = grid.centroids().collect();
        let mut solid_divergence = 0;
        if let Some(mesh) = solid {
            let restriction = restrict_to_solid(&centroids, mesh, model_a, model_b);
            centroids = restriction.kept.iter().map(|&i| centroids[i]).collect();
            solid_divergence = restriction.divergent;
        }

        let indexed_a = IndexedModel::build(model_a);
        let indexed_b = IndexedModel::build(model_b);
        let records_a = indexed_a.resolver(BoundsMode::Unbounded).resolve_all(&centroids);
        let records_b = indexed_b.resolver(BoundsMode::Unbounded).resolve_all(&centroids);
        let summary_a = ResolutionSummary::from_records(&records_a);
        let summary_b = ResolutionSummary::from_records(&records_b);

        let mut pairs = LabeledPairs::new(
            model_a.name.clone(),
            labels_a.vocabulary().to_vec(),
            model_b.name.clone(),
            labels_b.vocabulary().to_vec(),
        );
        let mut mismatch_a = vec![false; model_a.num_subblocks()];
        let mut mismatch_b = vec![false; model_b.num_subblocks()];
        let mut hit_a = vec![false; model_a.num_subblocks()];
        let mut hit_b = vec![false; model_b.num_subblocks()];
        for (i, (ra, rb)) in records_a.iter().zip(&records_b).enumerate() {
            match (ra.outcome, rb.outcome) {
                (ResolutionOutcome::Matched(sa), ResolutionOutcome::Matched(sb)) => {
                    let (sa, sb) = (sa as usize, sb as usize);
                    hit_a[sa] = true;
                    hit_b[sb] = true;
                    if labels_a.label(sa) != labels_b.label(sb) {
                        mismatch_a[sa] = true;
                        mismatch_b[sb] = true;
                    }
                    pairs.push(i, labels_a.id(sa), labels_b.id(sb));
                }
                (ResolutionOutcome::Outside, _) | (_, ResolutionOutcome::Outside) => {
                    pairs.outside.push(i)
                }
                _ => pairs.unresolved.push(i),
            }
        }

        if !pairs.outside.is_empty() || !pairs.unresolved.is_empty() {
            log::warn!(
                "{} centroids outside a model, {} unresolved",
                pairs.outside.len(),
                pairs.unresolved.len()
            );
        }

        Ok(Self {
            grid,
            centroids,
            records_a,
            records_b,
            summary_a,
            summary_b,
            solid_divergence,
            unique_blocks_hit_a: count_hits(&hit_a),
            unique_blocks_hit_b: count_hits(&hit_b),
            mismatch_a,
            mismatch_b,
            pairs,
        })
    }

    pub fn pairs(&self) -> &LabeledPairs {
        &self.pairs
    }

    pub fn report(&self, top_n: Option<usize>) -> Result<DomainReport, CompareError> {
        DomainReport::build(&self.pairs, top_n)
    }
}
