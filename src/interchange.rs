//! JSON document shapes for models, point collections and solids.
//!
//! These are the on-disk forms read by the `compare_domains` binary. Each
//! document converts into the corresponding library type with validation.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeTable, AttributeValues};
use crate::error::CompareError;
use crate::model::{BlockTransform, ModelGrid, PointCollection, SubblockedModel};
use crate::solid::TriangleMesh;

/// Column values; the JSON array's element type picks the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValues {
    Integer(Vec<i64>),
    Real(Vec<f64>),
    Text(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColumn {
    pub name: String,
    pub values: ColumnValues,
}

fn attribute_table(columns: Vec<NamedColumn>) -> AttributeTable {
    let mut table = AttributeTable::new();
    for column in columns {
        let values = match column.values {
            ColumnValues::Integer(v) => AttributeValues::Integer(v),
            ColumnValues::Real(v) => AttributeValues::Real(v),
            ColumnValues::Text(v) => AttributeValues::Text(v),
        };
        table.insert(column.name, values);
    }
    table
}

fn to_dvec3s(v: Vec<[f64; 3]>) -> Vec<DVec3> {
    v.into_iter().map(DVec3::from_array).collect()
}

fn default_model_name() -> String {
    "model".to_string()
}

fn default_points_name() -> String {
    "points".to_string()
}

/// A subblocked model.
///
/// `centroids` are world coordinates unless `block_coordinates` is set, in
/// which case they are relative to the centre of parent cell `(0, 0, 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default)]
    pub origin: [f64; 3],
    /// `[q0, q1, q2, q3]` with `q0` the scalar part.
    #[serde(default)]
    pub rotation: Option<[f64; 4]>,
    pub resolution: [f64; 3],
    pub counts: [u32; 3],
    pub centroids: Vec<[f64; 3]>,
    pub sizes: Vec<[f64; 3]>,
    #[serde(default)]
    pub block_coordinates: bool,
    #[serde(default)]
    pub attributes: Vec<NamedColumn>,
}

impl ModelDocument {
    pub fn into_model(self) -> Result<SubblockedModel, CompareError> {
        let origin = DVec3::from_array(self.origin);
        let transform = match self.rotation {
            Some(q) => {
                let norm = q.iter().map(|c| c * c).sum::<f64>().sqrt();
                if !(norm.is_finite() && norm > 0.0) {
                    return Err(CompareError::InvalidModel(format!(
                        "rotation quaternion {:?} has no direction",
                        q
                    )));
                }
                BlockTransform::from_quaternion(origin, q)
            }
            None => BlockTransform::translation(origin),
        };
        let grid = ModelGrid::new(DVec3::from_array(self.resolution), self.counts)?;
        let sizes = to_dvec3s(self.sizes);
        let attributes = attribute_table(self.attributes);
        if self.block_coordinates {
            let block = to_dvec3s(self.centroids);
            SubblockedModel::from_block_coordinates(self.name, grid, transform, &block, sizes, attributes)
        } else {
            SubblockedModel::new(
                self.name,
                grid,
                transform,
                to_dvec3s(self.centroids),
                sizes,
                attributes,
            )
        }
    }
}

/// A point collection with an optional visibility flag per point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsDocument {
    #[serde(default = "default_points_name")]
    pub name: String,
    pub points: Vec<[f64; 3]>,
    #[serde(default)]
    pub visibility: Option<Vec<bool>>,
    #[serde(default)]
    pub attributes: Vec<NamedColumn>,
}

impl PointsDocument {
    pub fn into_points(self) -> Result<PointCollection, CompareError> {
        PointCollection::new(
            self.name,
            to_dvec3s(self.points),
            self.visibility,
            attribute_table(self.attributes),
        )
    }
}

/// A closed triangle mesh in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidDocument {
    pub vertices: Vec<[f64; 3]>,
    pub facets: Vec<[u32; 3]>,
}

impl SolidDocument {
    pub fn into_mesh(self) -> Result<TriangleMesh, CompareError> {
        TriangleMesh::new(to_dvec3s(self.vertices), self.facets)
    }
}
