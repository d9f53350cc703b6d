//! Keyframes and local bone poses

use std::io::Write;

use glam::{Mat4, Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{M3dError, Result};
use crate::reader::TokenReader;

/// Translation, rotation and scale of a bone relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BonePose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BonePose {
    /// The rest pose: no translation, no rotation, unit scale
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub const fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Pose with only a translation
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Local transform: scale first, then rotate, then translate
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Blend towards `other`: linear for translation and scale, spherical for
    /// rotation
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

impl Default for BonePose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A timestamped pose sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keyframe {
    /// Time in seconds
    pub time: f32,
    pub pose: BonePose,
}

impl Keyframe {
    pub const fn new(time: f32, pose: BonePose) -> Self {
        Self { time, pose }
    }

    /// Reads `Time: t Pos: x y z Scale: x y z Quat: x y z w`.
    ///
    /// The rotation is renormalised so that interpolation always works on
    /// unit quaternions.
    pub(crate) fn read(reader: &mut TokenReader<'_>) -> Result<Self> {
        let time: f32 = reader.labeled("Time:")?;
        if !time.is_finite() {
            return Err(reader.error(format!("keyframe time must be finite, found {time}")));
        }
        reader.expect("Pos:")?;
        let translation = reader.vec3("translation")?;
        reader.expect("Scale:")?;
        let scale = reader.vec3("scale")?;
        reader.expect("Quat:")?;
        let line = reader.line();
        let rotation = reader.quat("rotation")?;
        if rotation.length_squared() <= f32::EPSILON {
            return Err(M3dError::MalformedFormat {
                line,
                message: "keyframe rotation is a zero quaternion".to_string(),
            });
        }

        Ok(Self {
            time,
            pose: BonePose::new(translation, rotation.normalize(), scale),
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let p = self.pose.translation;
        let s = self.pose.scale;
        let q = self.pose.rotation;
        writeln!(
            writer,
            "\t\tTime: {} Pos: {} {} {} Scale: {} {} {} Quat: {} {} {} {}",
            self.time, p.x, p.y, p.z, s.x, s.y, s.z, q.x, q.y, q.z, q.w
        )?;
        Ok(())
    }
}
