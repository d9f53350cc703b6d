//! CPU vertex skinning
//!
//! Applies the skinning matrices produced by the animator to bind-pose
//! vertices, the same blend a skinned vertex shader performs. Useful for
//! computing animated bounds and for checking a pose without a GPU.
//!
//! # Example
//!
//! ```rust,no_run
//! use m3d::M3dModel;
//! use m3d::skinning::{SkinningOptions, VertexSkinner};
//!
//! let model = M3dModel::load("Models/soldier.m3d")?;
//! let data = model.skinned_data()?;
//! let transforms = data.final_transforms("Take1", 0.5)?;
//!
//! let skinner = VertexSkinner::new(&transforms, SkinningOptions::default());
//! let posed = skinner.skin_vertices(&model.vertices);
//! println!("{:?}", m3d::skinning::bounds(&posed));
//! # Ok::<(), m3d::M3dError>(())
//! ```

use glam::{Mat4, Vec3, Vec4};

use crate::vertex::SkinnedVertex;

/// Options for controlling the skinning behavior
#[derive(Debug, Clone)]
pub struct SkinningOptions {
    /// Rescale the used weights so they sum to one
    pub normalize_weights: bool,
    /// Influences with a smaller weight are ignored
    pub weight_threshold: f32,
}

impl Default for SkinningOptions {
    fn default() -> Self {
        Self {
            normalize_weights: true,
            weight_threshold: 0.001,
        }
    }
}

/// A vertex after skinning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// Tangent with the original handedness in `w`
    pub tangent: Vec4,
}

/// Blends bind-pose vertices with a set of per-bone skinning matrices
#[derive(Debug, Clone)]
pub struct VertexSkinner<'a> {
    transforms: &'a [Mat4],
    options: SkinningOptions,
}

impl<'a> VertexSkinner<'a> {
    /// `transforms` are final skinning matrices indexed by bone
    pub fn new(transforms: &'a [Mat4], options: SkinningOptions) -> Self {
        Self {
            transforms,
            options,
        }
    }

    pub fn options(&self) -> &SkinningOptions {
        &self.options
    }

    pub fn skin_vertices(&self, vertices: &[SkinnedVertex]) -> Vec<PosedVertex> {
        vertices
            .iter()
            .map(|vertex| self.skin_vertex(vertex))
            .collect()
    }

    /// Skin one vertex.
    ///
    /// Influences naming a bone outside the transform set are skipped. A
    /// vertex left with no usable influence keeps its bind pose.
    pub fn skin_vertex(&self, vertex: &SkinnedVertex) -> PosedVertex {
        let mut position = Vec3::ZERO;
        let mut normal = Vec3::ZERO;
        let mut tangent = Vec3::ZERO;
        let mut total_weight = 0.0f32;

        for (bone, weight) in vertex.influences() {
            if weight < self.options.weight_threshold {
                continue;
            }
            let Some(matrix) = self.transforms.get(bone) else {
                continue;
            };
            position += matrix.transform_point3(vertex.position) * weight;
            normal += matrix.transform_vector3(vertex.normal) * weight;
            tangent += matrix.transform_vector3(vertex.tangent.truncate()) * weight;
            total_weight += weight;
        }

        if total_weight < self.options.weight_threshold {
            return PosedVertex {
                position: vertex.position,
                normal: vertex.normal,
                tangent: vertex.tangent,
            };
        }

        if self.options.normalize_weights {
            position /= total_weight;
        }

        PosedVertex {
            position,
            normal: normal.normalize_or_zero(),
            tangent: tangent.normalize_or_zero().extend(vertex.tangent.w),
        }
    }
}

/// Axis-aligned bounds of a set of posed vertices
pub fn bounds(vertices: &[PosedVertex]) -> Option<(Vec3, Vec3)> {
    let first = vertices.first()?.position;
    Some(vertices.iter().fold((first, first), |(min, max), v| {
        (min.min(v.position), max.max(v.position))
    }))
}
