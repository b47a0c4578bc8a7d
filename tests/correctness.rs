//! Resolution correctness tests for subblock-compare.
//!
//! These tests verify invariants that should hold for any well-formed
//! subblocked model, using randomly subdivided models.

mod support;

use glam::DVec3;
use std::collections::HashSet;
use subblock_compare::{
    BlockTransform, BoundsMode, CommonGrid, ComparisonConfig, GridCoord, IndexedModel,
    LabeledPairs, ModelComparison, ResolutionOutcome, SizeHint, DEFAULT_MAX_GRID_CELLS,
};
use subblock_compare::report::DomainReport;
use support::models::{
    interior_points, random_subblocked_model, rotated_transform, uniform_model, LABELS,
};

#[test]
fn test_index_completeness() {
    let res = DVec3::new(10.0, 10.0, 5.0);
    for seed in [1, 2, 3] {
        let model = random_subblocked_model("m", [6, 5, 4], res, rotated_transform(), seed);
        let indexed = IndexedModel::build(&model);
        let index = indexed.index();
        let local = model.local_centroids();

        let mut seen = vec![0usize; model.num_subblocks()];
        for (coord, bucket) in index.iter() {
            for &s in bucket {
                seen[s as usize] += 1;
                let own = GridCoord::containing(local[s as usize], res).unwrap();
                assert_eq!(coord, own, "subblock {} in foreign bucket", s);
            }
            assert!(bucket.windows(2).all(|w| w[0] < w[1]), "bucket not in model order");
        }
        assert!(seen.iter().all(|&n| n == 1), "seed {}: {:?}", seed, seen);
        assert_eq!(index.num_buckets(), 6 * 5 * 4);
    }
}

#[test]
fn test_interior_points_resolve_to_their_subblock() {
    let res = DVec3::new(10.0, 10.0, 5.0);
    for (seed, transform) in [(7, BlockTransform::default()), (8, rotated_transform())] {
        let model = random_subblocked_model("m", [5, 5, 5], res, transform, seed);
        let indexed = IndexedModel::build(&model);
        let (points, owners) = interior_points(&model, 5_000, seed);
        for mode in [BoundsMode::Enforced, BoundsMode::Unbounded] {
            let records = indexed.resolve_points(&points, mode);
            for (i, r) in records.iter().enumerate() {
                assert_eq!(r.point_index, i);
                assert_eq!(
                    r.outcome,
                    ResolutionOutcome::Matched(owners[i]),
                    "point {} at {:?}",
                    i,
                    points[i]
                );
                assert!(r.tests >= 1 && r.tests <= 8);
            }
        }
    }
}

#[test]
fn test_points_beyond_extent_are_outside() {
    let res = DVec3::splat(4.0);
    let model = random_subblocked_model("m", [3, 3, 3], res, rotated_transform(), 11);
    let indexed = IndexedModel::build(&model);
    let extent = model.grid.total_extent();
    let probes = [
        DVec3::new(extent.x + 0.5, 6.0, 6.0),
        DVec3::new(6.0, extent.y + 3.0, 6.0),
        DVec3::new(6.0, 6.0, extent.z + 100.0),
        DVec3::new(-0.5, 6.0, 6.0),
        DVec3::new(6.0, -7.0, 6.0),
    ];
    for local in probes {
        let world = model.local_to_world(local);
        for mode in [BoundsMode::Enforced, BoundsMode::Unbounded] {
            assert_eq!(
                indexed.resolve_world(&world, mode),
                ResolutionOutcome::Outside,
                "local {:?}",
                local
            );
        }
    }
}

#[test]
fn test_face_points_are_matched() {
    let res = DVec3::splat(4.0);
    let model = uniform_model("m", [2, 2, 2], res, [2, 2, 2], BlockTransform::default(), |_| {
        "ore".to_string()
    });
    let indexed = IndexedModel::build(&model);
    let extents = indexed.extents();
    for s in 0..model.num_subblocks() as u32 {
        let e = extents.get(s);
        let mid = (e.min + e.max) * 0.5;
        for face in [
            DVec3::new(e.min.x, mid.y, mid.z),
            DVec3::new(e.max.x, mid.y, mid.z),
            DVec3::new(mid.x, e.min.y, mid.z),
            DVec3::new(mid.x, mid.y, e.max.z),
        ] {
            let outcome = indexed.resolve_local(face, BoundsMode::Unbounded);
            let Some(hit) = outcome.subblock() else {
                // A face on the outer boundary of the last parent cell floors
                // into the next cell, which has no bucket.
                assert_eq!(outcome, ResolutionOutcome::Outside, "face {:?}", face);
                assert!(face.cmpeq(model.grid.total_extent()).any());
                continue;
            };
            assert!(extents.get(hit).contains(face));
            // Ties go to the lowest index among the containing siblings.
            let lowest = (0..model.num_subblocks() as u32)
                .filter(|&t| {
                    indexed.index().cell_of_subblock(t) == indexed.index().cell_of_point(face)
                        && extents.get(t).contains(face)
                })
                .min();
            assert_eq!(Some(hit), lowest);
        }
    }
}

#[test]
fn test_identical_models_resample_to_their_own_subblocks() {
    let res = DVec3::new(8.0, 8.0, 4.0);
    let label = |c: DVec3| LABELS[((c.x + c.y + c.z) as usize) % LABELS.len()].to_string();
    let model = uniform_model("m", [3, 2, 2], res, [4, 2, 2], rotated_transform(), label);
    let hint = SizeHint::parse("2 4 2").unwrap();

    let grid = CommonGrid::plan(
        &hint,
        &hint,
        &model.grid,
        &model.grid,
        DEFAULT_MAX_GRID_CELLS,
    )
    .unwrap();
    assert_eq!(grid.cell_size(), DVec3::new(2.0, 4.0, 2.0));
    assert_eq!(grid.len(), model.num_subblocks() as u64);

    let indexed = IndexedModel::build(&model);
    let local = model.local_centroids();
    let mut hit = HashSet::new();
    for c in grid.centroids() {
        let s = indexed
            .resolve_local(c, BoundsMode::Unbounded)
            .subblock()
            .unwrap_or_else(|| panic!("centroid {:?} not matched", c));
        assert!((local[s as usize] - c).abs().max_element() < 1e-6);
        hit.insert(s);
    }
    assert_eq!(hit.len(), model.num_subblocks());

    let cmp = ModelComparison::run(&model, &model, &hint, &hint, None, &ComparisonConfig::default())
        .unwrap();
    assert_eq!(cmp.summary_a.matched, model.num_subblocks());
    assert_eq!(cmp.summary_a.outside + cmp.summary_a.unresolved, 0);
    assert_eq!(cmp.report(None).unwrap().match_percent, 100.0);
}

#[test]
fn test_decimal_resolution_compares_every_parent_cell() {
    let res = DVec3::new(0.7, 1.0, 1.0);
    let model = uniform_model("m", [3, 1, 1], res, [1, 1, 1], BlockTransform::default(), |c| {
        LABELS[(c.x / 0.7) as usize].to_string()
    });
    let hint = SizeHint::parse("0.7 1 1").unwrap();
    let cmp = ModelComparison::run(&model, &model, &hint, &hint, None, &ComparisonConfig::default())
        .unwrap();
    assert_eq!(cmp.grid.counts(), [3, 1, 1]);
    assert_eq!(cmp.unique_blocks_hit_a, model.num_subblocks());
    let report = cmp.report(None).unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.frequency_a.len(), 3);
}

#[test]
fn test_coarse_against_fine_model() {
    let res = DVec3::splat(6.0);
    let layered = |c: DVec3| if c.z < 6.0 { "oxide" } else { "fresh" }.to_string();
    let coarse = uniform_model("coarse", [2, 2, 2], res, [1, 1, 1], BlockTransform::default(), layered);
    let fine = uniform_model("fine", [2, 2, 2], res, [3, 3, 2], BlockTransform::default(), layered);

    let cmp = ModelComparison::run(
        &coarse,
        &fine,
        &SizeHint::parse("6 6 6").unwrap(),
        &SizeHint::parse("2 2 3").unwrap(),
        None,
        &ComparisonConfig::default(),
    )
    .unwrap();
    assert_eq!(cmp.grid.counts(), [6, 6, 4]);
    assert_eq!(cmp.unique_blocks_hit_a, 8);
    assert_eq!(cmp.unique_blocks_hit_b, fine.num_subblocks());
    let report = cmp.report(Some(1)).unwrap();
    assert_eq!(report.match_percent, 100.0);
    assert_eq!(report.contingency.count("oxide", "oxide"), 72);
}

#[test]
fn test_contingency_conservation() {
    let res = DVec3::new(10.0, 10.0, 5.0);
    let a = random_subblocked_model("a", [4, 4, 4], res, BlockTransform::default(), 21);
    let b = random_subblocked_model("b", [4, 4, 4], res, BlockTransform::default(), 22);
    let hint = SizeHint::parse("5 5 2.5").unwrap();
    let cmp = ModelComparison::run(&a, &b, &hint, &hint, None, &ComparisonConfig::default()).unwrap();
    let report = cmp.report(Some(2)).unwrap();

    assert_eq!(report.contingency.total(), report.total);
    assert_eq!(report.top_n.as_ref().unwrap().total(), report.total);
    assert_eq!(report.matches + report.mismatches, report.total);
    assert_eq!(report.frequency_a.total, report.total);
    let freq_sum: u64 = report.frequency_b.rows.iter().map(|r| r.count).sum();
    assert_eq!(freq_sum, report.total);
    assert_eq!(report.total as usize, cmp.centroids.len());
}

#[test]
fn test_report_from_plain_labels() {
    let pairs = LabeledPairs::from_labels(
        "logged",
        "modelled",
        [("ore", "ore"), ("ore", "waste"), ("waste", "waste"), ("oxide", "waste")],
    );
    let report = DomainReport::build(&pairs, None).unwrap();
    assert_eq!(report.contingency.total(), 4);
    assert_eq!(report.match_percent, 50.0);
    assert_eq!(report.mismatched, vec![1, 3]);
}
