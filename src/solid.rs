//! Point-in-solid tests for restricting the comparison grid.
//!
//! A solid is a closed triangle mesh in world coordinates. For each model the
//! mesh is projected once into that model's block-local frame, after which a
//! centroid is classified by casting rays and counting crossings (even/odd).
//! Three skewed directions vote; a ray that grazes an edge or vertex abstains.

use glam::DVec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::CompareError;
use crate::model::SubblockedModel;
use crate::util::Timed;

const EPS: f64 = 1e-12;
const EDGE_EPS: f64 = 1e-9;

/// Skewed ray directions; not parallel to any axis or common face diagonal.
const RAY_DIRECTIONS: [DVec3; 3] = [
    DVec3::new(1.0, 0.234_567_89, 0.345_678_91),
    DVec3::new(0.345_678_91, 1.0, 0.234_567_89),
    DVec3::new(0.234_567_89, 0.345_678_91, 1.0),
];

/// A closed triangle mesh: vertex positions plus facets as vertex triples.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<DVec3>,
    pub facets: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<DVec3>, facets: Vec<[u32; 3]>) -> Result<Self, CompareError> {
        let n = vertices.len();
        if let Some((f, facet)) = facets
            .iter()
            .enumerate()
            .find(|(_, facet)| facet.iter().any(|&v| v as usize >= n))
        {
            return Err(CompareError::InvalidModel(format!(
                "solid facet {} references vertex {:?} but only {} vertices exist",
                f, facet, n
            )));
        }
        if facets.is_empty() {
            log::warn!("solid has no facets; every point will be outside");
        }
        Ok(Self { vertices, facets })
    }

    pub fn num_facets(&self) -> usize {
        self.facets.len()
    }
}

enum RayVote {
    Crossings(usize),
    Ambiguous,
}

/// Möller-Trumbore. Returns `(t, u, v)` for a forward hit.
#[inline]
fn ray_triangle(origin: DVec3, dir: DVec3, tri: &[DVec3; 3]) -> Option<(f64, f64, f64)> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let h = dir.cross(edge2);
    let det = edge1.dot(h);
    if !det.is_finite() || det.abs() <= EPS * edge1.length() * h.length() {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - tri[0];
    let u = inv_det * s.dot(h);
    if !(-EDGE_EPS..=1.0 + EDGE_EPS).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = inv_det * dir.dot(q);
    if v < -EDGE_EPS || u + v > 1.0 + EDGE_EPS {
        return None;
    }
    let t = inv_det * edge2.dot(q);
    (t.is_finite() && t > EPS).then_some((t, u, v))
}

/// The mesh expressed in one model's block-local frame.
#[derive(Debug, Clone)]
pub struct LocalSolid {
    triangles: Vec<[DVec3; 3]>,
    min: DVec3,
    max: DVec3,
}

impl LocalSolid {
    /// Project `mesh` into the block-local frame of `model`.
    pub fn new(mesh: &TriangleMesh, model: &SubblockedModel) -> Self {
        let local: Vec<DVec3> = mesh.vertices.iter().map(|&v| model.to_local(v)).collect();
        Self::from_local(&local, &mesh.facets)
    }

    fn from_local(vertices: &[DVec3], facets: &[[u32; 3]]) -> Self {
        let triangles: Vec<[DVec3; 3]> = facets
            .iter()
            .map(|f| {
                [
                    vertices[f[0] as usize],
                    vertices[f[1] as usize],
                    vertices[f[2] as usize],
                ]
            })
            .collect();
        let (min, max) = triangles.iter().flatten().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        );
        Self {
            triangles,
            min,
            max,
        }
    }

    fn cast(&self, p: DVec3, dir: DVec3) -> RayVote {
        let mut crossings = 0usize;
        for tri in &self.triangles {
            let Some((_, u, v)) = ray_triangle(p, dir, tri) else {
                continue;
            };
            let w = 1.0 - u - v;
            if u.abs() <= EDGE_EPS || v.abs() <= EDGE_EPS || w.abs() <= EDGE_EPS {
                return RayVote::Ambiguous;
            }
            crossings += 1;
        }
        RayVote::Crossings(crossings)
    }

    /// Whether `p` (block-local) is inside the solid.
    ///
    /// Two agreeing rays decide; if every ray is ambiguous the point is
    /// treated as outside.
    pub fn contains(&self, p: DVec3) -> bool {
        if self.triangles.is_empty() || !p.is_finite() {
            return false;
        }
        if p.cmplt(self.min).any() || p.cmpgt(self.max).any() {
            return false;
        }
        let mut inside_votes = 0;
        let mut outside_votes = 0;
        for dir in RAY_DIRECTIONS {
            match self.cast(p, dir.normalize()) {
                RayVote::Crossings(n) if n % 2 == 1 => inside_votes += 1,
                RayVote::Crossings(_) => outside_votes += 1,
                RayVote::Ambiguous => continue,
            }
            if inside_votes == 2 || outside_votes == 2 {
                break;
            }
        }
        inside_votes > outside_votes
    }

    /// Classify a batch of block-local points, in input order.
    pub fn contains_all(&self, points: &[DVec3]) -> Vec<bool> {
        maybe_par_iter!(points).map(|&p| self.contains(p)).collect()
    }
}

/// Outcome of restricting comparison centroids to a solid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidRestriction {
    /// Positions (into the centroid list) inside the solid for both models.
    pub kept: Vec<usize>,
    /// Centroids inside for one model and outside for the other.
    pub divergent: usize,
}

/// Keep the centroids that lie inside `mesh` as seen from both models.
///
/// The solid is projected separately into each model's frame. Centroids
/// classified differently by the two models are dropped and counted.
pub fn restrict_to_solid(
    centroids: &[DVec3],
    mesh: &TriangleMesh,
    model_a: &SubblockedModel,
    model_b: &SubblockedModel,
) -> SolidRestriction {
    let _t = Timed::info("solid restriction");
    let inside_a = LocalSolid::new(mesh, model_a).contains_all(centroids);
    let inside_b = LocalSolid::new(mesh, model_b).contains_all(centroids);

    let mut restriction = SolidRestriction::default();
    for (i, (&a, &b)) in inside_a.iter().zip(&inside_b).enumerate() {
        match (a, b) {
            (true, true) => restriction.kept.push(i),
            (false, false) => {}
            _ => restriction.divergent += 1,
        }
    }
    if restriction.divergent > 0 {
        log::warn!(
            "solid restriction differs between {:?} and {:?} for {} centroids",
            model_a.name,
            model_b.name,
            restriction.divergent
        );
    }
    log::info!(
        "{} of {} centroids inside solid",
        restriction.kept.len(),
        centroids.len()
    );
    restriction
}

/// Axis-aligned box as a closed mesh (12 outward-facing triangles).
pub fn box_mesh(min: DVec3, max: DVec3) -> TriangleMesh {
    let vertices = (0..8)
        .map(|i| {
            DVec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        })
        .collect();
    let facets = vec![
        [0, 2, 1],
        [1, 2, 3],
        [4, 5, 6],
        [5, 7, 6],
        [0, 1, 4],
        [1, 5, 4],
        [2, 6, 3],
        [3, 6, 7],
        [0, 4, 2],
        [2, 4, 6],
        [1, 3, 5],
        [3, 7, 5],
    ];
    TriangleMesh { vertices, facets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeTable;
    use crate::model::{BlockTransform, ModelGrid};

    fn model_at(origin: DVec3) -> SubblockedModel {
        let grid = ModelGrid::new(DVec3::splat(2.0), [4, 4, 4]).unwrap();
        SubblockedModel::new(
            "m",
            grid,
            BlockTransform::translation(origin),
            Vec::new(),
            Vec::new(),
            AttributeTable::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_box_contains() {
        let mesh = box_mesh(DVec3::ZERO, DVec3::splat(4.0));
        let solid = LocalSolid::from_local(&mesh.vertices, &mesh.facets);
        assert!(solid.contains(DVec3::splat(2.0)));
        assert!(solid.contains(DVec3::new(0.5, 3.5, 1.0)));
        assert!(!solid.contains(DVec3::new(5.0, 2.0, 2.0)));
        assert!(!solid.contains(DVec3::new(2.0, -0.1, 2.0)));
        assert!(!solid.contains(DVec3::splat(f64::NAN)));
    }

    #[test]
    fn test_empty_mesh_contains_nothing() {
        let mesh = TriangleMesh::new(Vec::new(), Vec::new()).unwrap();
        let solid = LocalSolid::from_local(&mesh.vertices, &mesh.facets);
        assert!(!solid.contains(DVec3::ZERO));
    }

    #[test]
    fn test_bad_facet_rejected() {
        let err = TriangleMesh::new(vec![DVec3::ZERO; 3], vec![[0, 1, 3]]).unwrap_err();
        assert!(matches!(err, CompareError::InvalidModel(_)));
    }

    #[test]
    fn test_projection_into_model_frame() {
        // World box [10, 14]^3; model origin at 10 with res 2 puts it at
        // local [1, 5]^3.
        let mesh = box_mesh(DVec3::splat(10.0), DVec3::splat(14.0));
        let model = model_at(DVec3::splat(10.0));
        let solid = LocalSolid::new(&mesh, &model);
        assert!(solid.contains(DVec3::splat(3.0)));
        assert!(!solid.contains(DVec3::splat(0.5)));
    }

    #[test]
    fn test_restriction_counts_divergence() {
        let mesh = box_mesh(DVec3::ZERO, DVec3::new(4.0, 8.0, 8.0));
        let a = model_at(DVec3::splat(-1.0));
        let b = model_at(DVec3::new(1.0, -1.0, -1.0));
        // Local box x range: [2, 6] for a, [0, 4] for b.
        let centroids = vec![
            DVec3::new(1.5, 4.0, 4.0),
            DVec3::new(3.5, 4.0, 4.0),
            DVec3::new(5.5, 4.0, 4.0),
            DVec3::new(7.5, 4.0, 4.0),
        ];
        let r = restrict_to_solid(&centroids, &mesh, &a, &b);
        assert_eq!(r.kept, vec![1]);
        assert_eq!(r.divergent, 2);
    }
}
