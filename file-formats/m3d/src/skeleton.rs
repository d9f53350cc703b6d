//! Bone hierarchy with bind-pose offsets
//!
//! Bones are stored flat and addressed by index. A bone's parent always has
//! a smaller index than the bone itself, so a single forward pass over the
//! bones visits every parent before any of its children.

use std::io::Write;

use glam::Mat4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{M3dError, Result};
use crate::reader::TokenReader;

/// Parent index written for root bones
pub const ROOT_PARENT: i32 = -1;

/// A single bone of the skeleton
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bone {
    /// Parent bone index, `None` for roots
    pub parent: Option<usize>,
    /// Bind-pose offset: maps model space into this bone's space
    pub offset: Mat4,
}

/// Immutable bone hierarchy
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Bone>", into = "Vec<Bone>"))]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl TryFrom<Vec<Bone>> for Skeleton {
    type Error = M3dError;

    fn try_from(bones: Vec<Bone>) -> Result<Self> {
        Self::new(bones)
    }
}

impl From<Skeleton> for Vec<Bone> {
    fn from(skeleton: Skeleton) -> Self {
        skeleton.bones
    }
}

impl Skeleton {
    /// Build a skeleton, checking that it forms a forest in parent-first order
    pub fn new(bones: Vec<Bone>) -> Result<Self> {
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= index {
                    return Err(M3dError::ValidationError(format!(
                        "Bone {index} has parent {parent}; parents must precede their children"
                    )));
                }
            }
        }
        Ok(Self { bones })
    }

    /// Build a skeleton from parallel parent and offset lists
    pub fn from_parts(parents: &[Option<usize>], offsets: &[Mat4]) -> Result<Self> {
        if parents.len() != offsets.len() {
            return Err(M3dError::ValidationError(format!(
                "{} parent indices but {} bone offsets",
                parents.len(),
                offsets.len()
            )));
        }
        Self::new(
            parents
                .iter()
                .zip(offsets)
                .map(|(&parent, &offset)| Bone { parent, offset })
                .collect(),
        )
    }

    /// Number of bones
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Parent of `index`, `None` for roots and unknown bones
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.bones.get(index).and_then(|bone| bone.parent)
    }

    /// Indices of all root bones
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| index)
    }

    /// Direct children of `index`
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .skip(index + 1)
            .filter(move |(_, bone)| bone.parent == Some(index))
            .map(|(child, _)| child)
    }

    /// Number of ancestors of `index`
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.parent(index);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Model-space bind pose of every bone (inverse of the offsets)
    pub fn bind_pose(&self) -> Vec<Mat4> {
        self.bones.iter().map(|bone| bone.offset.inverse()).collect()
    }

    pub(crate) fn read_offsets(reader: &mut TokenReader<'_>, count: usize) -> Result<Vec<Mat4>> {
        (0..count)
            .map(|index| {
                reader.expect_indexed("BoneOffset", index, "")?;
                reader.mat4("bone offset")
            })
            .collect()
    }

    pub(crate) fn read_parents(
        reader: &mut TokenReader<'_>,
        count: usize,
    ) -> Result<Vec<Option<usize>>> {
        (0..count)
            .map(|index| {
                reader.expect_indexed("ParentIndexOfBone", index, ":")?;
                let line = reader.line();
                let parent: i32 = reader.parse("parent index")?;
                match parent {
                    ROOT_PARENT => Ok(None),
                    p if p >= 0 => Ok(Some(p as usize)),
                    p => Err(M3dError::MalformedFormat {
                        line,
                        message: format!("invalid parent index {p} for bone {index}"),
                    }),
                }
            })
            .collect()
    }

    pub(crate) fn write_offsets<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (index, bone) in self.bones.iter().enumerate() {
            write!(writer, "BoneOffset{index}")?;
            for value in bone.offset.to_cols_array() {
                write!(writer, " {value}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;
        Ok(())
    }

    pub(crate) fn write_parents<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (index, bone) in self.bones.iter().enumerate() {
            let parent = bone.parent.map_or(ROOT_PARENT, |p| p as i32);
            writeln!(writer, "ParentIndexOfBone{index}: {parent}")?;
        }
        writeln!(writer)?;
        Ok(())
    }
}
