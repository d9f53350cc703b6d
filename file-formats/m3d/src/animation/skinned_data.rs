//! Skeleton animator: evaluates clips into per-bone skinning matrices
//!
//! Matrices follow the column-vector convention used by `glam`. For bone `i`
//! with parent `p`, sampled local pose `L_i` and bind offset `O_i`:
//!
//! ```text
//! W_i     = W_p * L_i        (W_i = L_i for roots)
//! Final_i = W_i * O_i
//! ```
//!
//! Written with row vectors, as the model files are authored, the same
//! products read `L_i * W_p` and `O_i * W_i`.

use std::collections::HashMap;

use glam::Mat4;

use super::clip::AnimationClip;
use crate::error::{M3dError, Result};
use crate::skeleton::Skeleton;

/// Handle of a clip inside one [`SkinnedData`], resolved from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(usize);

impl ClipId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Skeleton plus every clip authored for it; read-only once built
#[derive(Debug, Clone, Default)]
pub struct SkinnedData {
    skeleton: Skeleton,
    clips: Vec<AnimationClip>,
    clip_lookup: HashMap<String, ClipId>,
}

impl SkinnedData {
    /// Combine a skeleton with its clips.
    ///
    /// Every clip must carry one track slot per bone and clip names must be
    /// unique.
    pub fn new(skeleton: Skeleton, clips: Vec<AnimationClip>) -> Result<Self> {
        let mut clip_lookup = HashMap::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            if clip.bone_count() != skeleton.bone_count() {
                return Err(M3dError::ValidationError(format!(
                    "Clip '{}' has {} bone tracks but the skeleton has {} bones",
                    clip.name,
                    clip.bone_count(),
                    skeleton.bone_count()
                )));
            }
            if clip_lookup
                .insert(clip.name.clone(), ClipId(index))
                .is_some()
            {
                return Err(M3dError::ValidationError(format!(
                    "Duplicate animation clip name '{}'",
                    clip.name
                )));
            }
        }

        Ok(Self {
            skeleton,
            clips,
            clip_lookup,
        })
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn bone_count(&self) -> usize {
        self.skeleton.bone_count()
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// Clip names in file order
    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.clips.iter().map(|clip| clip.name.as_str())
    }

    /// Resolve a clip name once so per-frame evaluation cannot fail
    pub fn clip_id(&self, name: &str) -> Result<ClipId> {
        self.clip_lookup
            .get(name)
            .copied()
            .ok_or_else(|| M3dError::InvalidClipName(name.to_string()))
    }

    pub fn clip(&self, id: ClipId) -> Option<&AnimationClip> {
        self.clips.get(id.0)
    }

    pub fn clip_by_name(&self, name: &str) -> Result<&AnimationClip> {
        let id = self.clip_id(name)?;
        Ok(&self.clips[id.0])
    }

    pub fn clip_start_time(&self, name: &str) -> Result<f32> {
        Ok(self.clip_by_name(name)?.start_time())
    }

    pub fn clip_end_time(&self, name: &str) -> Result<f32> {
        Ok(self.clip_by_name(name)?.end_time())
    }

    /// Skinning matrices for `clip_name` at `time`, one per bone
    pub fn final_transforms(&self, clip_name: &str, time: f32) -> Result<Vec<Mat4>> {
        let id = self.clip_id(clip_name)?;
        let mut out = vec![Mat4::IDENTITY; self.bone_count()];
        self.final_transforms_into(id, time, &mut out);
        Ok(out)
    }

    /// Evaluate into a caller-owned buffer without allocating.
    ///
    /// `out` is filled up to `min(out.len(), bone_count)` entries. A `ClipId`
    /// from another `SkinnedData` that does not resolve here leaves every
    /// bone at identity.
    pub fn final_transforms_into(&self, clip: ClipId, time: f32, out: &mut [Mat4]) {
        let count = out.len().min(self.bone_count());
        let Some(clip) = self.clips.get(clip.0) else {
            out[..count].fill(Mat4::IDENTITY);
            return;
        };

        // Pass 1: world transforms. Parents precede children, so out[parent]
        // already holds the parent's world matrix.
        for (index, bone) in self.skeleton.bones()[..count].iter().enumerate() {
            let local = clip.sample(index, time).to_matrix();
            out[index] = match bone.parent {
                Some(parent) => out[parent] * local,
                None => local,
            };
        }

        // Pass 2: apply bind offsets
        for (world, bone) in out[..count].iter_mut().zip(self.skeleton.bones()) {
            *world *= bone.offset;
        }
    }

    /// Sampled local transforms (parent-relative)
    pub fn local_transforms(&self, clip: ClipId, time: f32) -> Vec<Mat4> {
        let Some(clip) = self.clips.get(clip.0) else {
            return vec![Mat4::IDENTITY; self.bone_count()];
        };
        (0..self.bone_count())
            .map(|bone| clip.sample(bone, time).to_matrix())
            .collect()
    }

    /// Animated model-space transforms, before the bind offsets are applied
    pub fn world_transforms(&self, clip: ClipId, time: f32) -> Vec<Mat4> {
        let locals = self.local_transforms(clip, time);
        let mut worlds: Vec<Mat4> = Vec::with_capacity(locals.len());
        for (bone, local) in self.skeleton.bones().iter().zip(locals) {
            let world = match bone.parent {
                Some(parent) => worlds[parent] * local,
                None => local,
            };
            worlds.push(world);
        }
        worlds
    }

    /// Model-space bind pose of every bone
    pub fn bind_pose_world(&self) -> Vec<Mat4> {
        self.skeleton.bind_pose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{BonePose, BoneTrack, Keyframe};
    use glam::{Quat, Vec3};

    fn translate_x(time: f32, x: f32) -> Keyframe {
        Keyframe::new(time, BonePose::from_translation(Vec3::new(x, 0.0, 0.0)))
    }

    /// Root moves from x=0 to x=1 over one second; the child stays put
    fn two_bone_data(root_offset: Mat4, child_offset: Mat4) -> SkinnedData {
        let skeleton =
            Skeleton::from_parts(&[None, Some(0)], &[root_offset, child_offset]).unwrap();
        let root = BoneTrack::new(vec![translate_x(0.0, 0.0), translate_x(1.0, 1.0)]).unwrap();
        let child = BoneTrack::new(vec![Keyframe::new(0.0, BonePose::IDENTITY)]).unwrap();
        let clip = AnimationClip::new("Take1", vec![Some(root), Some(child)]);
        SkinnedData::new(skeleton, vec![clip]).unwrap()
    }

    #[test]
    fn test_two_bone_scenario() {
        let root_offset = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        let child_offset = Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0));
        let data = two_bone_data(root_offset, child_offset);

        let finals = data.final_transforms("Take1", 0.5).unwrap();
        let root_world = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
        assert!(finals[0].abs_diff_eq(root_world * root_offset, 1e-6));
        assert!(finals[1].abs_diff_eq(root_world * child_offset, 1e-6));
    }

    #[test]
    fn test_unknown_clip() {
        let data = two_bone_data(Mat4::IDENTITY, Mat4::IDENTITY);
        let err = data.final_transforms("Run", 0.0).unwrap_err();
        assert!(matches!(err, M3dError::InvalidClipName(name) if name == "Run"));
    }

    #[test]
    fn test_clamps_before_and_after() {
        let data = two_bone_data(Mat4::IDENTITY, Mat4::IDENTITY);
        let duration = data.clip_end_time("Take1").unwrap();
        assert_eq!(duration, 1.0);

        let start = data.final_transforms("Take1", 0.0).unwrap();
        let end = data.final_transforms("Take1", duration).unwrap();
        assert_eq!(data.final_transforms("Take1", -1.0).unwrap(), start);
        assert_eq!(data.final_transforms("Take1", duration + 5.0).unwrap(), end);
    }

    #[test]
    fn test_evaluation_is_bit_identical() {
        let data = two_bone_data(Mat4::IDENTITY, Mat4::from_rotation_z(0.3));
        let a = data.final_transforms("Take1", 0.37).unwrap();
        let b = data.final_transforms("Take1", 0.37).unwrap();
        fn bits(matrices: &[Mat4]) -> Vec<u32> {
            matrices
                .iter()
                .flat_map(Mat4::to_cols_array)
                .map(f32::to_bits)
                .collect()
        }
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_exact_keyframe_hit() {
        let pose = BonePose::new(
            Vec3::new(0.1, 0.2, 0.3),
            Quat::from_xyzw(0.1, 0.7, 0.2, 0.6).normalize(),
            Vec3::splat(1.5),
        );
        let track = BoneTrack::new(vec![
            Keyframe::new(0.0, BonePose::IDENTITY),
            Keyframe::new(0.4, pose),
            Keyframe::new(1.0, BonePose::IDENTITY),
        ])
        .unwrap();
        let skeleton = Skeleton::from_parts(&[None], &[Mat4::IDENTITY]).unwrap();
        let data =
            SkinnedData::new(skeleton, vec![AnimationClip::new("a", vec![Some(track)])]).unwrap();

        let finals = data.final_transforms("a", 0.4).unwrap();
        assert_eq!(finals[0], pose.to_matrix());
    }

    #[test]
    fn test_root_isolation() {
        let skeleton =
            Skeleton::from_parts(&[None, None], &[Mat4::IDENTITY, Mat4::IDENTITY]).unwrap();
        let root = BoneTrack::new(vec![translate_x(0.0, 0.0), translate_x(1.0, 4.0)]).unwrap();
        let calm = BoneTrack::new(vec![translate_x(0.0, 1.0)]).unwrap();
        let wild = BoneTrack::new(vec![
            Keyframe::new(
                0.0,
                BonePose::new(Vec3::splat(9.0), Quat::from_rotation_x(2.0), Vec3::splat(3.0)),
            ),
            translate_x(1.0, -7.0),
        ])
        .unwrap();

        let calm_data = SkinnedData::new(
            skeleton.clone(),
            vec![AnimationClip::new("c", vec![Some(root.clone()), Some(calm)])],
        )
        .unwrap();
        let wild_data = SkinnedData::new(
            skeleton,
            vec![AnimationClip::new("c", vec![Some(root), Some(wild)])],
        )
        .unwrap();

        for t in [0.0, 0.3, 0.9, 2.0] {
            let a = calm_data.final_transforms("c", t).unwrap();
            let b = wild_data.final_transforms("c", t).unwrap();
            assert_eq!(a[0], b[0]);
        }
    }

    #[test]
    fn test_untracked_bone_follows_parent() {
        let skeleton =
            Skeleton::from_parts(&[None, Some(0)], &[Mat4::IDENTITY, Mat4::IDENTITY]).unwrap();
        let root = BoneTrack::new(vec![translate_x(0.0, 2.0)]).unwrap();
        let data =
            SkinnedData::new(skeleton, vec![AnimationClip::new("c", vec![Some(root), None])])
                .unwrap();
        let finals = data.final_transforms("c", 0.0).unwrap();
        assert_eq!(finals[1], finals[0]);
    }

    #[test]
    fn test_world_transforms_match_finals_with_identity_offsets() {
        let data = two_bone_data(Mat4::IDENTITY, Mat4::IDENTITY);
        let id = data.clip_id("Take1").unwrap();
        let worlds = data.world_transforms(id, 0.25);
        let finals = data.final_transforms("Take1", 0.25).unwrap();
        assert_eq!(worlds, finals);
    }

    #[test]
    fn test_bind_pose_evaluates_to_identity() {
        // When every local pose equals the bind pose, the skinning matrices
        // collapse to identity
        let bind_root = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let bind_child_local = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0));
        let bind_child = bind_root * bind_child_local;
        let skeleton = Skeleton::from_parts(
            &[None, Some(0)],
            &[bind_root.inverse(), bind_child.inverse()],
        )
        .unwrap();
        let root = BoneTrack::new(vec![Keyframe::new(
            0.0,
            BonePose::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        )])
        .unwrap();
        let child = BoneTrack::new(vec![Keyframe::new(
            0.0,
            BonePose::from_translation(Vec3::new(0.0, 0.5, 0.0)),
        )])
        .unwrap();
        let data = SkinnedData::new(
            skeleton,
            vec![AnimationClip::new("bind", vec![Some(root), Some(child)])],
        )
        .unwrap();

        for m in data.final_transforms("bind", 0.0).unwrap() {
            assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        }
    }

    #[test]
    fn test_mismatched_track_count() {
        let skeleton = Skeleton::from_parts(&[None], &[Mat4::IDENTITY]).unwrap();
        let clip = AnimationClip::new("c", vec![None, None]);
        assert!(SkinnedData::new(skeleton, vec![clip]).is_err());
    }

    #[test]
    fn test_duplicate_clip_names() {
        let skeleton = Skeleton::from_parts(&[None], &[Mat4::IDENTITY]).unwrap();
        let clips = vec![
            AnimationClip::new("c", vec![None]),
            AnimationClip::new("c", vec![None]),
        ];
        assert!(SkinnedData::new(skeleton, clips).is_err());
    }

    #[test]
    fn test_foreign_clip_id_is_identity() {
        let data = two_bone_data(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut out = [Mat4::ZERO; 2];
        data.final_transforms_into(ClipId(7), 0.5, &mut out);
        assert_eq!(out, [Mat4::IDENTITY; 2]);
    }
}
