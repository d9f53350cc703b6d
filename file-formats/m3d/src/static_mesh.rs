//! Plain text static meshes (position and normal only)
//!
//! ```text
//! VertexCount: 31076
//! TriangleCount: 60339
//! VertexList (pos, normal)
//! {
//!     0.592978 1.92413 -2.62486 0.572276 0.816877 0.0721907
//!     ...
//! }
//! TriangleList
//! {
//!     0 1 2
//!     ...
//! }
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{M3dError, Result};
use crate::reader::TokenReader;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// An indexed triangle mesh without skinning data
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StaticMesh {
    pub vertices: Vec<StaticVertex>,
    pub indices: Vec<u32>,
}

impl StaticMesh {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => M3dError::FileNotFound(path.to_path_buf()),
            _ => M3dError::Io(err),
        })?;
        let mesh = Self::parse(file)?;
        log::info!(
            "Loaded {}: {} vertices, {} triangles",
            path.display(),
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    pub fn parse<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut reader = TokenReader::new(&text);

        let vertex_count: usize = reader.labeled("VertexCount:")?;
        let triangle_count: usize = reader.labeled("TriangleCount:")?;

        for token in ["VertexList", "(pos,", "normal)", "{"] {
            reader.expect(token)?;
        }
        let vertices = (0..vertex_count)
            .map(|_| -> Result<StaticVertex> {
                Ok(StaticVertex {
                    position: reader.vec3("position")?,
                    normal: reader.vec3("normal")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        reader.expect("}")?;

        reader.expect("TriangleList")?;
        reader.expect("{")?;
        let index_count = triangle_count
            .checked_mul(3)
            .ok_or_else(|| reader.error(format!("triangle count {triangle_count} is too large")))?;
        let mut indices = Vec::new();
        for _ in 0..index_count {
            let line = reader.line();
            let index: u32 = reader.parse("triangle index")?;
            if index as usize >= vertex_count {
                return Err(M3dError::MalformedFormat {
                    line,
                    message: format!("index {index} exceeds vertex count {vertex_count}"),
                });
            }
            indices.push(index);
        }
        reader.expect("}")?;

        Ok(Self { vertices, indices })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of all vertex positions
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            (min.min(v.position), max.max(v.position))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "VertexCount: 3
TriangleCount: 1
VertexList (pos, normal)
{
\t0 0 0 0 0 -1
\t1 0 0 0 0 -1
\t0 2 0 0 0 -1
}
TriangleList
{
\t0 1 2
}
";

    #[test]
    fn test_parse_mesh() {
        let mesh = StaticMesh::parse(TRIANGLE.as_bytes()).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[2].position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(mesh.vertices[0].normal, Vec3::NEG_Z);
        assert_eq!(
            mesh.bounds(),
            Some((Vec3::ZERO, Vec3::new(1.0, 2.0, 0.0)))
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let text = TRIANGLE.replace("0 1 2", "0 1 3");
        let err = StaticMesh::parse(text.as_bytes()).unwrap_err();
        assert!(matches!(err, M3dError::MalformedFormat { line: 11, .. }));
    }

    #[test]
    fn test_truncated_vertex_list() {
        let text = TRIANGLE.replace("VertexCount: 3", "VertexCount: 4");
        assert!(StaticMesh::parse(text.as_bytes()).is_err());
    }
}
