//! Per-bone keyframe tracks and their interpolation

use std::io::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::keyframe::{BonePose, Keyframe};
use crate::error::{M3dError, Result};
use crate::reader::TokenReader;

/// Keyframes of one bone within one clip, ordered by time
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<Keyframe>", into = "Vec<Keyframe>")
)]
pub struct BoneTrack {
    keyframes: Vec<Keyframe>,
}

impl TryFrom<Vec<Keyframe>> for BoneTrack {
    type Error = M3dError;

    fn try_from(keyframes: Vec<Keyframe>) -> Result<Self> {
        Self::new(keyframes)
    }
}

impl From<BoneTrack> for Vec<Keyframe> {
    fn from(track: BoneTrack) -> Self {
        track.keyframes
    }
}

impl BoneTrack {
    /// Create a track; keyframe times must not decrease
    pub fn new(keyframes: Vec<Keyframe>) -> Result<Self> {
        if let Some(index) = keyframes
            .windows(2)
            .position(|pair| pair[1].time < pair[0].time)
        {
            return Err(M3dError::ValidationError(format!(
                "keyframe {} at {}s precedes keyframe {} at {}s",
                index + 1,
                keyframes[index + 1].time,
                index,
                keyframes[index].time
            )));
        }
        Ok(Self { keyframes })
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the first keyframe (0 for an empty track)
    pub fn start_time(&self) -> f32 {
        self.keyframes.first().map_or(0.0, |key| key.time)
    }

    /// Time of the last keyframe (0 for an empty track)
    pub fn end_time(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |key| key.time)
    }

    /// Sample the track at `time`.
    ///
    /// Times outside the authored range clamp to the first or last keyframe.
    /// A time equal to a stored keyframe returns that keyframe's pose as is.
    /// Otherwise the two bracketing keyframes are blended.
    pub fn sample(&self, time: f32) -> BonePose {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return BonePose::IDENTITY;
        };

        if time.is_nan() || time <= first.time {
            return first.pose;
        }
        if time >= last.time {
            return last.pose;
        }

        // first.time < time < last.time, so 1 <= upper < len
        let upper = self.keyframes.partition_point(|key| key.time <= time);
        let before = &self.keyframes[upper - 1];
        let after = &self.keyframes[upper];

        if before.time == time {
            return before.pose;
        }

        let t = (time - before.time) / (after.time - before.time);
        before.pose.interpolate(&after.pose, t)
    }

    /// Reads `Bone<i> #Keyframes: n { ... }`
    pub(crate) fn read(reader: &mut TokenReader<'_>, bone_index: usize) -> Result<Self> {
        reader.expect_indexed("Bone", bone_index, "")?;
        let count: usize = reader.labeled("#Keyframes:")?;
        reader.expect("{")?;
        let line = reader.line();
        let keyframes = (0..count)
            .map(|_| Keyframe::read(reader))
            .collect::<Result<Vec<_>>>()?;
        reader.expect("}")?;

        Self::new(keyframes).map_err(|err| match err {
            M3dError::ValidationError(message) => M3dError::MalformedFormat {
                line,
                message: format!("bone {bone_index}: {message}"),
            },
            other => other,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W, bone_index: usize) -> Result<()> {
        writeln!(writer, "\tBone{bone_index} #Keyframes: {}", self.keyframes.len())?;
        writeln!(writer, "\t{{")?;
        for key in &self.keyframes {
            key.write(writer)?;
        }
        writeln!(writer, "\t}}")?;
        writeln!(writer)?;
        Ok(())
    }
}
