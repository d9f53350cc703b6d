//! Complete M3D model: geometry, materials, skeleton and animation clips

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationClip, SkinnedData};
use crate::error::{M3dError, Result};
use crate::header::{
    ANIMATION_CLIPS_MARKER, BONE_HIERARCHY_MARKER, BONE_OFFSETS_MARKER, M3dHeader,
    MATERIALS_MARKER, SUBSETS_MARKER, TRIANGLES_MARKER, VERTICES_MARKER,
};
use crate::material::M3dMaterial;
use crate::reader::TokenReader;
use crate::skeleton::Skeleton;
use crate::subset::Subset;
use crate::vertex::SkinnedVertex;

/// Tolerance used when checking that blend weights add up to one
const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

/// A skinned model as stored in an M3D file
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct M3dModel {
    pub materials: Vec<M3dMaterial>,
    /// One subset per material, in material order
    pub subsets: Vec<Subset>,
    pub vertices: Vec<SkinnedVertex>,
    /// Triangle list, three indices per triangle
    pub indices: Vec<u16>,
    pub skeleton: Skeleton,
    pub clips: Vec<AnimationClip>,
}

impl M3dModel {
    /// Load a model from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => M3dError::FileNotFound(path.to_path_buf()),
            _ => M3dError::Io(err),
        })?;

        let model = Self::parse(file)?;
        log::info!(
            "Loaded {}: {} vertices, {} triangles, {} bones, {} clips",
            path.display(),
            model.vertices.len(),
            model.triangle_count(),
            model.skeleton.bone_count(),
            model.clips.len()
        );
        Ok(model)
    }

    /// Parse a model from any reader
    pub fn parse<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse_str(&text)
    }

    /// Parse a model from its text.
    ///
    /// Sections are read in their fixed order with the counts declared in
    /// the header. Any mismatch aborts the whole parse.
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut reader = TokenReader::new(text);

        let header = M3dHeader::read(&mut reader)?;
        log::debug!("Header: {header:?}");

        reader.expect(MATERIALS_MARKER)?;
        let materials = (0..header.material_count)
            .map(|_| M3dMaterial::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Read {} materials", materials.len());

        reader.expect(SUBSETS_MARKER)?;
        let subsets = (0..header.material_count)
            .map(|_| Subset::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Read {} subsets", subsets.len());

        reader.expect(VERTICES_MARKER)?;
        let vertices = (0..header.vertex_count)
            .map(|_| SkinnedVertex::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Read {} vertices", vertices.len());

        reader.expect(TRIANGLES_MARKER)?;
        let index_count = header
            .triangle_count
            .checked_mul(3)
            .ok_or_else(|| {
                reader.error(format!(
                    "triangle count {} is too large",
                    header.triangle_count
                ))
            })?;
        // Sized by the indices actually read, not by the declared count
        let mut indices = Vec::new();
        for _ in 0..index_count {
            indices.push(reader.parse::<u16>("triangle index")?);
        }
        log::debug!("Read {} triangles", header.triangle_count);

        reader.expect(BONE_OFFSETS_MARKER)?;
        let offsets = Skeleton::read_offsets(&mut reader, header.bone_count)?;

        reader.expect(BONE_HIERARCHY_MARKER)?;
        let hierarchy_line = reader.line();
        let parents = Skeleton::read_parents(&mut reader, header.bone_count)?;
        let skeleton = Skeleton::from_parts(&parents, &offsets).map_err(|err| {
            M3dError::MalformedFormat {
                line: hierarchy_line,
                message: err.to_string(),
            }
        })?;
        log::debug!("Read {} bones", skeleton.bone_count());

        reader.expect(ANIMATION_CLIPS_MARKER)?;
        let clips = (0..header.clip_count)
            .map(|_| AnimationClip::read(&mut reader, header.bone_count))
            .collect::<Result<Vec<_>>>()?;

        if !reader.is_at_end() {
            return Err(reader.error("unexpected content after the last animation clip"));
        }

        Ok(Self {
            materials,
            subsets,
            vertices,
            indices,
            skeleton,
            clips,
        })
    }

    /// Counts describing this model, as written in the file header
    pub fn header(&self) -> M3dHeader {
        M3dHeader {
            material_count: self.materials.len(),
            vertex_count: self.vertices.len(),
            triangle_count: self.triangle_count(),
            bone_count: self.skeleton.bone_count(),
            clip_count: self.clips.len(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Write the model in M3D text form
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header().write(writer)?;

        writeln!(writer, "{MATERIALS_MARKER}")?;
        for material in &self.materials {
            material.write(writer)?;
        }

        writeln!(writer, "{SUBSETS_MARKER}")?;
        for subset in &self.subsets {
            subset.write(writer)?;
        }
        writeln!(writer)?;

        writeln!(writer, "{VERTICES_MARKER}")?;
        for vertex in &self.vertices {
            vertex.write(writer)?;
        }

        writeln!(writer, "{TRIANGLES_MARKER}")?;
        for triangle in self.indices.chunks_exact(3) {
            writeln!(writer, "{} {} {}", triangle[0], triangle[1], triangle[2])?;
        }
        writeln!(writer)?;

        writeln!(writer, "{BONE_OFFSETS_MARKER}")?;
        self.skeleton.write_offsets(writer)?;

        writeln!(writer, "{BONE_HIERARCHY_MARKER}")?;
        self.skeleton.write_parents(writer)?;

        writeln!(writer, "{ANIMATION_CLIPS_MARKER}")?;
        for clip in &self.clips {
            clip.write(writer)?;
        }
        Ok(())
    }

    /// Write the model to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Check cross-references between sections
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(M3dError::ValidationError(format!(
                "Index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }

        if self.subsets.len() != self.materials.len() {
            return Err(M3dError::ValidationError(format!(
                "{} subsets for {} materials",
                self.subsets.len(),
                self.materials.len()
            )));
        }

        let vertex_count = self.vertices.len();
        if let Some(position) = self
            .indices
            .iter()
            .position(|&index| usize::from(index) >= vertex_count)
        {
            return Err(M3dError::ValidationError(format!(
                "Triangle {} references vertex {} but there are only {vertex_count} vertices",
                position / 3,
                self.indices[position]
            )));
        }

        let triangle_count = self.triangle_count();
        for subset in &self.subsets {
            if subset.faces().end > triangle_count {
                return Err(M3dError::ValidationError(format!(
                    "Subset {} covers triangles {:?} but there are only {triangle_count}",
                    subset.id,
                    subset.faces()
                )));
            }
            let vertex_end = subset.vertex_start as usize + subset.vertex_count as usize;
            if vertex_end > vertex_count {
                return Err(M3dError::ValidationError(format!(
                    "Subset {} covers vertices up to {vertex_end} but there are only {vertex_count}",
                    subset.id
                )));
            }
        }

        let bone_count = self.skeleton.bone_count();
        for (index, vertex) in self.vertices.iter().enumerate() {
            if let Some((bone, _)) = vertex.influences().find(|&(bone, _)| bone >= bone_count) {
                return Err(M3dError::ValidationError(format!(
                    "Vertex {index} is influenced by bone {bone} but there are only {bone_count} bones"
                )));
            }
            let sum = vertex.weight_sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                log::warn!("Vertex {index} blend weights sum to {sum}");
            }
        }

        let mut names = HashSet::with_capacity(self.clips.len());
        for clip in &self.clips {
            if clip.bone_count() != bone_count {
                return Err(M3dError::ValidationError(format!(
                    "Clip '{}' has {} bone tracks but the skeleton has {bone_count} bones",
                    clip.name,
                    clip.bone_count()
                )));
            }
            if !names.insert(clip.name.as_str()) {
                return Err(M3dError::ValidationError(format!(
                    "Duplicate animation clip name '{}'",
                    clip.name
                )));
            }
        }

        Ok(())
    }

    /// Build the shared animation data without consuming the model
    pub fn skinned_data(&self) -> Result<SkinnedData> {
        SkinnedData::new(self.skeleton.clone(), self.clips.clone())
    }

    /// Split the model into the animation data and the render-side buffers
    pub fn into_parts(self) -> Result<ModelParts> {
        let skinned = SkinnedData::new(self.skeleton, self.clips)?;
        Ok(ModelParts {
            skinned,
            vertices: self.vertices,
            indices: self.indices,
            subsets: self.subsets,
            materials: self.materials,
        })
    }
}

/// A model split by consumer: animation on one side, GPU buffers on the other
#[derive(Debug, Clone)]
pub struct ModelParts {
    pub skinned: SkinnedData,
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u16>,
    pub subsets: Vec<Subset>,
    pub materials: Vec<M3dMaterial>,
}
