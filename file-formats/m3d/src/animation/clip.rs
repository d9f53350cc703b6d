//! Named animation clips

use std::io::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::keyframe::BonePose;
use super::track::BoneTrack;
use crate::error::Result;
use crate::reader::TokenReader;

/// A named animation: at most one track per bone of the skeleton
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnimationClip {
    /// Clip name, unique within a model
    pub name: String,
    /// Track per bone; `None` for bones the clip does not animate
    pub tracks: Vec<Option<BoneTrack>>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, tracks: Vec<Option<BoneTrack>>) -> Self {
        Self {
            name: name.into(),
            tracks,
        }
    }

    /// Number of bones the clip covers
    pub fn bone_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, bone: usize) -> Option<&BoneTrack> {
        self.tracks.get(bone).and_then(Option::as_ref)
    }

    /// Number of bones that actually carry keyframes
    pub fn animated_bone_count(&self) -> usize {
        self.tracks.iter().flatten().count()
    }

    /// Total keyframes across all tracks
    pub fn keyframe_count(&self) -> usize {
        self.tracks.iter().flatten().map(BoneTrack::len).sum()
    }

    /// Earliest keyframe time across all tracks
    pub fn start_time(&self) -> f32 {
        self.tracks
            .iter()
            .flatten()
            .map(BoneTrack::start_time)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }

    /// Latest keyframe time across all tracks
    pub fn end_time(&self) -> f32 {
        self.tracks
            .iter()
            .flatten()
            .map(BoneTrack::end_time)
            .fold(0.0, f32::max)
    }

    /// Length of the clip in seconds
    pub fn duration(&self) -> f32 {
        self.end_time()
    }

    /// Local pose of `bone` at `time`, identity when the bone has no track
    pub fn sample(&self, bone: usize, time: f32) -> BonePose {
        self.track(bone)
            .map_or(BonePose::IDENTITY, |track| track.sample(time))
    }

    /// Reads `AnimationClip <name> { Bone0 ... Bone<n-1> ... }`
    pub(crate) fn read(reader: &mut TokenReader<'_>, bone_count: usize) -> Result<Self> {
        reader.expect("AnimationClip")?;
        let name: String = reader.parse("clip name")?;
        reader.expect("{")?;
        let mut tracks = Vec::new();
        for bone in 0..bone_count {
            let track = BoneTrack::read(reader, bone)?;
            tracks.push((!track.is_empty()).then_some(track));
        }
        reader.expect("}")?;

        let clip = Self { name, tracks };
        log::debug!(
            "Read clip '{}': {} animated bones, {:.3}s",
            clip.name,
            clip.animated_bone_count(),
            clip.duration()
        );
        Ok(clip)
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "AnimationClip {}", self.name)?;
        writeln!(writer, "{{")?;
        let empty = BoneTrack::default();
        for (bone, track) in self.tracks.iter().enumerate() {
            track.as_ref().unwrap_or(&empty).write(writer, bone)?;
        }
        writeln!(writer, "}}")?;
        writeln!(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use glam::Vec3;

    const CLIP: &str = "AnimationClip Take1
{
\tBone0 #Keyframes: 2
\t{
\t\tTime: 0.25 Pos: 0 0 0 Scale: 1 1 1 Quat: 0 0 0 1
\t\tTime: 1.5 Pos: 0 1 0 Scale: 1 1 1 Quat: 0 0 0 1
\t}

\tBone1 #Keyframes: 0
\t{
\t}

\tBone2 #Keyframes: 1
\t{
\t\tTime: 2 Pos: 0 0 0 Scale: 1 1 1 Quat: 0 0 0 1
\t}
}
";

    #[test]
    fn test_read_clip() {
        let mut reader = TokenReader::new(CLIP);
        let clip = AnimationClip::read(&mut reader, 3).unwrap();
        assert_eq!(clip.name, "Take1");
        assert_eq!(clip.bone_count(), 3);
        assert_eq!(clip.animated_bone_count(), 2);
        assert_eq!(clip.keyframe_count(), 3);
        assert!(clip.track(1).is_none());
        assert_eq!(clip.start_time(), 0.25);
        assert_eq!(clip.end_time(), 2.0);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_too_few_bone_blocks() {
        let mut reader = TokenReader::new(CLIP);
        assert!(AnimationClip::read(&mut reader, 4).is_err());
    }

    #[test]
    fn test_untracked_bone_samples_identity() {
        let clip = AnimationClip::new("idle", vec![None]);
        assert_eq!(clip.sample(0, 0.5), BonePose::IDENTITY);
        assert_eq!(clip.duration(), 0.0);
    }

    #[test]
    fn test_write_then_read() {
        let track = BoneTrack::new(vec![
            Keyframe::new(0.0, BonePose::IDENTITY),
            Keyframe::new(0.5, BonePose::from_translation(Vec3::new(1.0, 2.0, 3.0))),
        ])
        .unwrap();
        let clip = AnimationClip::new("walk", vec![Some(track), None]);

        let mut buffer = Vec::new();
        clip.write(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut reader = TokenReader::new(&text);
        assert_eq!(AnimationClip::read(&mut reader, 2).unwrap(), clip);
    }
}
