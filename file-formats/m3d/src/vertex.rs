//! Skinned vertex records

use std::io::Write;

use glam::{Vec2, Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reader::TokenReader;

/// Maximum number of bones that can influence a single vertex
pub const MAX_INFLUENCES: usize = 4;

/// A bind-pose vertex with up to four bone influences
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkinnedVertex {
    /// Position in bind pose
    pub position: Vec3,
    /// Tangent; `w` carries the bitangent handedness
    pub tangent: Vec4,
    /// Normal in bind pose
    pub normal: Vec3,
    /// Texture coordinates
    pub tex_coords: Vec2,
    /// Blend weight per influence
    pub bone_weights: [f32; MAX_INFLUENCES],
    /// Bone index per influence
    pub bone_indices: [u8; MAX_INFLUENCES],
}

impl Default for SkinnedVertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
            normal: Vec3::Y,
            tex_coords: Vec2::ZERO,
            bone_weights: [1.0, 0.0, 0.0, 0.0],
            bone_indices: [0; MAX_INFLUENCES],
        }
    }
}

impl SkinnedVertex {
    pub(crate) fn read(reader: &mut TokenReader<'_>) -> Result<Self> {
        reader.expect("Position:")?;
        let position = reader.vec3("position")?;
        reader.expect("Tangent:")?;
        let tangent = reader.vec4("tangent")?;
        reader.expect("Normal:")?;
        let normal = reader.vec3("normal")?;
        reader.expect("Tex-Coords:")?;
        let tex_coords = reader.vec2("texture coordinates")?;
        reader.expect("BlendWeights:")?;
        let bone_weights = reader.floats::<MAX_INFLUENCES>("blend weight")?;
        reader.expect("BlendIndices:")?;
        let mut bone_indices = [0u8; MAX_INFLUENCES];
        for index in &mut bone_indices {
            *index = reader.parse("blend index")?;
        }

        Ok(Self {
            position,
            tangent,
            normal,
            tex_coords,
            bone_weights,
            bone_indices,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let p = self.position;
        let t = self.tangent;
        let n = self.normal;
        let uv = self.tex_coords;
        let w = self.bone_weights;
        let i = self.bone_indices;
        writeln!(writer, "Position: {} {} {}", p.x, p.y, p.z)?;
        writeln!(writer, "Tangent: {} {} {} {}", t.x, t.y, t.z, t.w)?;
        writeln!(writer, "Normal: {} {} {}", n.x, n.y, n.z)?;
        writeln!(writer, "Tex-Coords: {} {}", uv.x, uv.y)?;
        writeln!(writer, "BlendWeights: {} {} {} {}", w[0], w[1], w[2], w[3])?;
        writeln!(writer, "BlendIndices: {} {} {} {}", i[0], i[1], i[2], i[3])?;
        writeln!(writer)?;
        Ok(())
    }

    /// Sum of all blend weights
    pub fn weight_sum(&self) -> f32 {
        self.bone_weights.iter().sum()
    }

    /// Iterate over `(bone index, weight)` pairs with a non-zero weight
    pub fn influences(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.bone_indices
            .iter()
            .zip(self.bone_weights.iter())
            .filter(|(_, weight)| **weight > 0.0)
            .map(|(&index, &weight)| (index as usize, weight))
    }
}
