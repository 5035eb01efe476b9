//! Blend tree playback through the public API

use std::sync::Arc;

use dae_rig::blend_tree::NodeState;
use dae_rig::{Animation, AnimationTrack, BlendTreeBuilder, Bone, NodeId, Pose, Skeleton};

fn skeleton() -> Skeleton {
    Skeleton::new(vec![Bone::new(NodeId(1), "root")])
}

/// One-bone animation holding the root at height `y`
fn hold(name: &str, y: f32) -> Arc<Animation> {
    let track = AnimationTrack {
        bone: 0,
        position: Some(vec![0.0, y, 0.0, 0.0, y, 0.0]),
        ..Default::default()
    };
    Arc::new(Animation::new(name, 1.0, 2, vec![track]).unwrap())
}

#[test]
fn test_bool_crossfade_after_half_the_transition() {
    let mut builder = BlendTreeBuilder::new();
    let stand = builder.track(hold("stand", 0.0), true);
    let crouch = builder.track(hold("crouch", -4.0), true);
    let root = builder.boolean("crouching", 2.0, stand, crouch).unwrap();
    let tree = builder.build(root).unwrap();
    tree.validate(&skeleton()).unwrap();

    let mut state = tree.new_state();
    state.params.set("crouching", 1.0);
    for _ in 0..4 {
        tree.tick(0.25, &mut state).unwrap();
    }

    match state.node_state(root.index()) {
        Some(NodeState::Bool { weight }) => assert!((weight - 0.5).abs() < 1e-6),
        other => panic!("unexpected state {other:?}"),
    }

    let mut pose = Pose::default();
    tree.eval(&skeleton(), &mut state, &mut pose).unwrap();
    assert!((pose.position(0)[1] + 2.0).abs() < 1e-5);
}

#[test]
fn test_instances_are_independent() {
    let mut builder = BlendTreeBuilder::new();
    let stand = builder.track(hold("stand", 0.0), true);
    let crouch = builder.track(hold("crouch", -4.0), true);
    let root = builder.boolean("crouching", 0.5, stand, crouch).unwrap();
    let tree = builder.build(root).unwrap();

    let mut a = tree.new_state();
    let mut b = tree.new_state();
    a.params.set("crouching", true);
    tree.tick(1.0, &mut a).unwrap();
    tree.tick(1.0, &mut b).unwrap();

    let mut pose_a = Pose::default();
    let mut pose_b = Pose::default();
    tree.eval(&skeleton(), &mut a, &mut pose_a).unwrap();
    tree.eval(&skeleton(), &mut b, &mut pose_b).unwrap();
    assert_eq!(pose_a.position(0), [0.0, -4.0, 0.0]);
    assert_eq!(pose_b.position(0), [0.0, 0.0, 0.0]);
}

#[test]
fn test_nested_float_inside_bool() {
    let mut builder = BlendTreeBuilder::new();
    let walk = builder.track(hold("walk", 1.0), true);
    let run = builder.track(hold("run", 3.0), true);
    let locomotion = builder.float("speed", 10.0, vec![(0.0, walk), (1.0, run)]).unwrap();
    let idle = builder.track(hold("idle", 0.0), true);
    let root = builder.boolean("moving", 0.0, idle, locomotion).unwrap();
    let tree = builder.build(root).unwrap();

    let mut state = tree.new_state();
    state.params.set("moving", true);
    state.params.set("speed", 0.5);
    tree.tick(0.1, &mut state).unwrap();

    let mut pose = Pose::default();
    tree.eval(&skeleton(), &mut state, &mut pose).unwrap();
    assert!((pose.position(0)[1] - 2.0).abs() < 1e-5);
}
