//! Integration tests for clip evaluation and instance playback.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use m3d::skinning::{SkinningOptions, VertexSkinner, bounds};
use m3d::{
    AnimationClip, BonePose, BoneTrack, Keyframe, M3dModel, Skeleton, SkinnedData,
    SkinnedModelInstance, SkinnedVertex,
};
use test_case::test_case;

/// Three-bone chain standing along +Y, bind pose one unit apart. The
/// `swing` clip rotates the middle bone a quarter turn about Z over 2 s.
fn chain_model() -> M3dModel {
    let bind = [
        Mat4::IDENTITY,
        Mat4::from_translation(Vec3::Y),
        Mat4::from_translation(Vec3::Y * 2.0),
    ];
    let skeleton = Skeleton::from_parts(
        &[None, Some(0), Some(1)],
        &bind.map(|m| m.inverse()),
    )
    .unwrap();

    let rest = |y: f32| BonePose::from_translation(Vec3::new(0.0, y, 0.0));
    let swing = BoneTrack::new(vec![
        Keyframe::new(0.0, rest(1.0)),
        Keyframe::new(
            2.0,
            BonePose::new(
                Vec3::Y,
                Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
                Vec3::ONE,
            ),
        ),
    ])
    .unwrap();
    let tip = BoneTrack::new(vec![Keyframe::new(0.0, rest(1.0))]).unwrap();
    let idle_root = BoneTrack::new(vec![Keyframe::new(0.0, BonePose::IDENTITY)]).unwrap();

    let vertices = (0..3)
        .map(|bone| SkinnedVertex {
            position: Vec3::new(0.0, bone as f32, 0.0),
            bone_indices: [bone, 0, 0, 0],
            ..Default::default()
        })
        .collect();

    M3dModel {
        vertices,
        indices: vec![0, 1, 2],
        skeleton,
        clips: vec![
            AnimationClip::new("swing", vec![None, Some(swing), Some(tip.clone())]),
            AnimationClip::new("idle", vec![Some(idle_root), None, Some(tip)]),
        ],
        ..Default::default()
    }
}

fn tip_position(transforms: &[Mat4]) -> Vec3 {
    // The tip vertex sits at the tip bone's bind position
    transforms[2].transform_point3(Vec3::Y * 2.0)
}

#[test]
fn test_swing_moves_tip() {
    let data = chain_model().skinned_data().unwrap();

    let start = data.final_transforms("swing", 0.0).unwrap();
    assert!(tip_position(&start).abs_diff_eq(Vec3::Y * 2.0, 1e-5));

    // A quarter turn about Z at the elbow sends the tip towards -X
    let end = data.final_transforms("swing", 2.0).unwrap();
    assert!(tip_position(&end).abs_diff_eq(Vec3::new(-1.0, 1.0, 0.0), 1e-5));
}

#[test_case(-1.0, 0.0 ; "before the first key")]
#[test_case(7.0, 2.0 ; "after the last key")]
#[test_case(f32::INFINITY, 2.0 ; "infinite time")]
fn test_clamped_times(query: f32, equivalent: f32) {
    let data = chain_model().skinned_data().unwrap();
    assert_eq!(
        data.final_transforms("swing", query).unwrap(),
        data.final_transforms("swing", equivalent).unwrap()
    );
}

#[test]
fn test_bind_pose_skinning_is_identity() {
    let model = chain_model();
    let data = model.skinned_data().unwrap();
    let transforms = data.final_transforms("swing", 0.0).unwrap();

    let skinner = VertexSkinner::new(&transforms, SkinningOptions::default());
    let posed = skinner.skin_vertices(&model.vertices);
    for (vertex, bind) in posed.iter().zip(&model.vertices) {
        assert!(vertex.position.abs_diff_eq(bind.position, 1e-5));
    }
    let (min, max) = bounds(&posed).unwrap();
    assert!(min.abs_diff_eq(Vec3::ZERO, 1e-5));
    assert!(max.abs_diff_eq(Vec3::Y * 2.0, 1e-5));
}

#[test]
fn test_instances_loop_independently() {
    let data = Arc::new(chain_model().skinned_data().unwrap());
    let mut fast = SkinnedModelInstance::new(Arc::clone(&data), "swing").unwrap();
    let mut slow = SkinnedModelInstance::new(Arc::clone(&data), "swing").unwrap();

    for _ in 0..8 {
        fast.advance(0.25);
    }
    assert_eq!(fast.time_pos(), 2.0);
    fast.advance(0.25);
    assert_eq!(fast.time_pos(), 0.0);

    slow.advance(0.5);
    assert_eq!(slow.time_pos(), 0.5);
    assert_eq!(
        slow.final_transforms(),
        data.final_transforms("swing", 0.5).unwrap().as_slice()
    );
}

#[test]
fn test_clip_without_keys_past_zero_restarts_every_frame() {
    let data = Arc::new(chain_model().skinned_data().unwrap());
    let mut idle = SkinnedModelInstance::new(data, "idle").unwrap();
    assert_eq!(idle.clip_duration(), 0.0);
    idle.advance(1.0 / 60.0);
    assert_eq!(idle.time_pos(), 0.0);
}

#[test]
fn test_model_survives_file_round_trip() {
    let model = chain_model();
    let mut buffer = Vec::new();
    model.write(&mut buffer).unwrap();
    let parsed = M3dModel::parse(buffer.as_slice()).unwrap();

    let a = model.skinned_data().unwrap();
    let b = parsed.skinned_data().unwrap();
    let names: Vec<_> = b.clip_names().collect();
    assert_eq!(names, vec!["swing", "idle"]);
    for t in [0.0, 0.4, 1.3, 2.0] {
        let expected = a.final_transforms("swing", t).unwrap();
        let actual = b.final_transforms("swing", t).unwrap();
        for (x, y) in expected.iter().zip(&actual) {
            assert!(x.abs_diff_eq(*y, 1e-5));
        }
    }
}

#[test]
fn test_shared_data_from_parts() {
    let parts = chain_model().into_parts().unwrap();
    let shared: Arc<SkinnedData> = Arc::new(parts.skinned);
    let instance = SkinnedModelInstance::new(shared, "idle").unwrap();
    assert_eq!(instance.final_transforms().len(), 3);
    assert_eq!(parts.vertices.len(), 3);
}
