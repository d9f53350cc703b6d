//! Subset table: maps each material to a contiguous range of triangles

use std::io::Write;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reader::TokenReader;

/// A draw range of the model that uses a single material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subset {
    /// Subset identifier; equals the material index
    pub id: u32,
    /// First vertex used by the subset
    pub vertex_start: u32,
    /// Number of vertices used by the subset
    pub vertex_count: u32,
    /// First triangle of the subset
    pub face_start: u32,
    /// Number of triangles in the subset
    pub face_count: u32,
}

impl Subset {
    pub(crate) fn read(reader: &mut TokenReader<'_>) -> Result<Self> {
        Ok(Self {
            id: reader.labeled("SubsetID:")?,
            vertex_start: reader.labeled("VertexStart:")?,
            vertex_count: reader.labeled("VertexCount:")?,
            face_start: reader.labeled("FaceStart:")?,
            face_count: reader.labeled("FaceCount:")?,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(
            writer,
            "SubsetID: {} VertexStart: {} VertexCount: {} FaceStart: {} FaceCount: {}",
            self.id, self.vertex_start, self.vertex_count, self.face_start, self.face_count
        )?;
        Ok(())
    }

    /// Range of triangles `[face_start, face_start + face_count)`
    pub fn faces(&self) -> Range<usize> {
        let start = self.face_start as usize;
        start..start + self.face_count as usize
    }

    /// Range into the index buffer (three indices per triangle)
    pub fn index_range(&self) -> Range<usize> {
        let faces = self.faces();
        faces.start * 3..faces.end * 3
    }
}
