use glam::{DQuat, DVec3};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use subblock_compare::{
    AttributeTable, AttributeValues, BlockTransform, ModelGrid, PointCollection, SubblockedModel,
};

pub const LABELS: [&str; 4] = ["ore", "waste", "oxide", "fresh"];

fn text(labels: Vec<String>) -> AttributeValues {
    AttributeValues::Text(labels)
}

/// Block-coordinate centroids and sizes of one parent cell split `d` ways
/// per axis.
fn split_parent(center: DVec3, res: DVec3, d: [u32; 3], centroids: &mut Vec<DVec3>, sizes: &mut Vec<DVec3>) {
    let size = res / DVec3::new(d[0] as f64, d[1] as f64, d[2] as f64);
    let corner = center - res * 0.5;
    for i in 0..d[0] {
        for j in 0..d[1] {
            for k in 0..d[2] {
                let offset = (DVec3::new(i as f64, j as f64, k as f64) + 0.5) * size;
                centroids.push(corner + offset);
                sizes.push(size);
            }
        }
    }
}

fn parent_centers(counts: [u32; 3], res: DVec3) -> impl Iterator<Item = DVec3> {
    (0..counts[0]).flat_map(move |i| {
        (0..counts[1]).flat_map(move |j| {
            (0..counts[2]).map(move |k| DVec3::new(i as f64, j as f64, k as f64) * res)
        })
    })
}

/// A model whose parent cells are split at random into 1, 2, 4 or 8
/// subblocks, with random labels.
pub fn random_subblocked_model(
    name: &str,
    counts: [u32; 3],
    res: DVec3,
    transform: BlockTransform,
    seed: u64,
) -> SubblockedModel {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = Vec::new();
    let mut sizes = Vec::new();
    for center in parent_centers(counts, res) {
        let d = match rng.gen_range(0..4) {
            0 => [1, 1, 1],
            1 => [2, 1, 1],
            2 => [1, 2, 2],
            _ => [2, 2, 2],
        };
        split_parent(center, res, d, &mut centroids, &mut sizes);
    }
    let labels = (0..centroids.len())
        .map(|_| LABELS[rng.gen_range(0..LABELS.len())].to_string())
        .collect();
    SubblockedModel::from_block_coordinates(
        name,
        ModelGrid::new(res, counts).unwrap(),
        transform,
        &centroids,
        sizes,
        AttributeTable::new().with("Domain", text(labels)),
    )
    .unwrap()
}

/// A model whose every parent cell is split `d` ways per axis. Labels are
/// assigned by `label(local centroid)`.
pub fn uniform_model<F>(
    name: &str,
    counts: [u32; 3],
    res: DVec3,
    d: [u32; 3],
    transform: BlockTransform,
    label: F,
) -> SubblockedModel
where
    F: Fn(DVec3) -> String,
{
    let mut centroids = Vec::new();
    let mut sizes = Vec::new();
    for center in parent_centers(counts, res) {
        split_parent(center, res, d, &mut centroids, &mut sizes);
    }
    let labels = centroids.iter().map(|&c| label(c + res * 0.5)).collect();
    SubblockedModel::from_block_coordinates(
        name,
        ModelGrid::new(res, counts).unwrap(),
        transform,
        &centroids,
        sizes,
        AttributeTable::new().with("Domain", text(labels)),
    )
    .unwrap()
}

/// Random world points strictly inside random subblocks, away from every
/// face. Returns the points and the subblock each was drawn from.
pub fn interior_points(model: &SubblockedModel, n: usize, seed: u64) -> (Vec<DVec3>, Vec<u32>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let local = model.local_centroids();
    let mut points = Vec::with_capacity(n);
    let mut owners = Vec::with_capacity(n);
    for _ in 0..n {
        let s = rng.gen_range(0..model.num_subblocks());
        let half = model.sizes()[s] * 0.5 * 0.9;
        let offset = DVec3::new(
            rng.gen_range(-half.x..half.x),
            rng.gen_range(-half.y..half.y),
            rng.gen_range(-half.z..half.z),
        );
        points.push(model.local_to_world(local[s] + offset));
        owners.push(s as u32);
    }
    (points, owners)
}

/// Point collection labelled with the given strings.
pub fn labelled_points(name: &str, points: Vec<DVec3>, labels: Vec<String>) -> PointCollection {
    PointCollection::new(
        name,
        points,
        None,
        AttributeTable::new().with("geocod", text(labels)),
    )
    .unwrap()
}

/// A rotated and translated transform, typical of a mine-grid model.
pub fn rotated_transform() -> BlockTransform {
    BlockTransform::new(
        DVec3::new(512_345.5, 7_123_456.25, 310.0),
        DQuat::from_rotation_z(30f64.to_radians()),
    )
}
