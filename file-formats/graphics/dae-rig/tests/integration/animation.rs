//! Sampling and blending through the public API

use dae_rig::animation::{blend_pose, sample_animation};
use dae_rig::{Animation, AnimationTrack, Bone, NodeId, Pose, Skeleton};

fn z_rotation(degrees: f32) -> [f32; 4] {
    let half = degrees.to_radians() / 2.0;
    [0.0, 0.0, half.sin(), half.cos()]
}

/// Root and child bone; only the root rotates, from 90 to 180 degrees
fn rig() -> (Skeleton, Animation) {
    let root = Bone::new(NodeId(1), "root");
    let mut child = Bone::new(NodeId(2), "child");
    child.parent = Some(0);
    child.bind_position = [0.0, 2.0, 0.0];
    child.bind_rotation = z_rotation(10.0);
    child.bind_scale = [1.0, 3.0, 1.0];
    let skeleton = Skeleton::new(vec![root, child]);

    let rotation: Vec<f32> = [90.0, 120.0, 150.0, 180.0]
        .iter()
        .flat_map(|&degrees| z_rotation(degrees))
        .collect();
    let tracks = vec![
        AnimationTrack {
            bone: 0,
            rotation: Some(rotation),
            ..Default::default()
        },
        AnimationTrack::bind_pose(1),
    ];
    let animation = Animation::new("turn", 30.0, 4, tracks).unwrap();
    (skeleton, animation)
}

fn assert_quat(actual: [f32; 4], expected: [f32; 4]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}

#[test]
fn test_sample_between_frames() {
    let (skeleton, animation) = rig();
    let mut pose = Pose::new(2);
    sample_animation(&animation, &skeleton, &mut pose, 1.5).unwrap();

    // Halfway between 120 and 150 degrees
    assert_quat(pose.rotation(0), z_rotation(135.0));
    assert_eq!(pose.position(0), [0.0, 0.0, 0.0]);

    // The child has no curves and holds its bind pose
    assert_eq!(pose.position(1), [0.0, 2.0, 0.0]);
    assert_eq!(pose.rotation(1), z_rotation(10.0));
    assert_eq!(pose.scale(1), [1.0, 3.0, 1.0]);
}

#[test]
fn test_frame_count_wraps_to_first_frame() {
    let (skeleton, animation) = rig();
    let mut start = Pose::new(2);
    let mut wrapped = Pose::new(2);
    sample_animation(&animation, &skeleton, &mut start, 0.0).unwrap();
    sample_animation(&animation, &skeleton, &mut wrapped, 4.0).unwrap();
    assert_eq!(start, wrapped);
}

#[test]
fn test_blend_between_sampled_poses() {
    let (skeleton, animation) = rig();
    let mut first = Pose::new(2);
    let mut last = Pose::new(2);
    sample_animation(&animation, &skeleton, &mut first, 0.0).unwrap();
    sample_animation(&animation, &skeleton, &mut last, 3.0).unwrap();

    let mut out = Pose::new(2);
    blend_pose(&first, &last, 0.0, &mut out).unwrap();
    assert_eq!(out, first);
    blend_pose(&first, &last, 1.0, &mut out).unwrap();
    assert_eq!(out, last);

    blend_pose(&first, &last, 0.5, &mut out).unwrap();
    assert_quat(out.rotation(0), z_rotation(135.0));
}
