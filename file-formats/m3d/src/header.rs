//! M3D file header

use std::io::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reader::TokenReader;

/// Marker line opening the header section
pub const HEADER_MARKER: &str = "***************m3d-File-Header***************";
/// Marker line opening the material section
pub const MATERIALS_MARKER: &str = "***************Materials*********************";
/// Marker line opening the subset table
pub const SUBSETS_MARKER: &str = "***************SubsetTable*******************";
/// Marker line opening the vertex section
pub const VERTICES_MARKER: &str = "***************Vertices**********************";
/// Marker line opening the triangle section
pub const TRIANGLES_MARKER: &str = "***************Triangles*********************";
/// Marker line opening the bone offset section
pub const BONE_OFFSETS_MARKER: &str = "***************BoneOffsets*******************";
/// Marker line opening the bone hierarchy section
pub const BONE_HIERARCHY_MARKER: &str = "***************BoneHierarchy*****************";
/// Marker line opening the animation clip section
pub const ANIMATION_CLIPS_MARKER: &str = "***************AnimationClips****************";

/// Element counts declared at the top of an M3D file
///
/// Every later section is read with exactly the counts declared here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct M3dHeader {
    /// Number of materials (and subsets)
    pub material_count: usize,
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of triangles
    pub triangle_count: usize,
    /// Number of bones
    pub bone_count: usize,
    /// Number of animation clips
    pub clip_count: usize,
}

impl M3dHeader {
    pub(crate) fn read(reader: &mut TokenReader<'_>) -> Result<Self> {
        reader.expect(HEADER_MARKER)?;
        Ok(Self {
            material_count: reader.labeled("#Materials")?,
            vertex_count: reader.labeled("#Vertices")?,
            triangle_count: reader.labeled("#Triangles")?,
            bone_count: reader.labeled("#Bones")?,
            clip_count: reader.labeled("#AnimationClips")?,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{HEADER_MARKER}")?;
        writeln!(writer, "#Materials {}", self.material_count)?;
        writeln!(writer, "#Vertices {}", self.vertex_count)?;
        writeln!(writer, "#Triangles {}", self.triangle_count)?;
        writeln!(writer, "#Bones {}", self.bone_count)?;
        writeln!(writer, "#AnimationClips {}", self.clip_count)?;
        writeln!(writer)?;
        Ok(())
    }
}
