//! Skeleton merging, completion and sorting

use dae_rig::scene::{SceneNode, SkinController};
use dae_rig::skeleton::{
    SkeletonMerger, add_bone_parents, bones_sorted, check_consistency, merge_skeletons, sort_bones,
};
use dae_rig::{NodeId, RigError, SceneGraph, Skeleton};
use glam::{Mat4, Quat, Vec3};
use pretty_assertions::assert_eq;

// hips(1) -> spine(2) -> neck(3) -> head(4)
//         -> thigh(5) -> shin(6)
//         -> thigh_r(7)
fn graph() -> SceneGraph {
    SceneGraph::new(vec![
        SceneNode::new(1, "hips", None, Mat4::from_translation(Vec3::Y)),
        SceneNode::new(
            2,
            "spine",
            Some(1),
            Mat4::from_rotation_translation(Quat::from_rotation_x(0.1), Vec3::Y),
        ),
        SceneNode::new(3, "neck", Some(2), Mat4::from_translation(Vec3::Y)),
        SceneNode::new(4, "head", Some(3), Mat4::from_translation(Vec3::Y * 0.3)),
        SceneNode::new(5, "thigh", Some(1), Mat4::from_translation(-Vec3::X)),
        SceneNode::new(6, "shin", Some(5), Mat4::from_translation(-Vec3::Y)),
        SceneNode::new(7, "thigh_r", Some(1), Mat4::from_translation(Vec3::X)),
    ])
}

/// Skin over `joints` with inverse bind matrices matching the bind pose
fn skin(graph: &SceneGraph, joints: &[u32]) -> SkinController {
    let mut inverse_bind_matrices = Vec::new();
    for &joint in joints {
        let world = graph.world_matrix(NodeId(joint)).unwrap();
        inverse_bind_matrices.extend(world.inverse().transpose().to_cols_array());
    }
    SkinController {
        name: "skin".to_string(),
        joints: joints.iter().copied().map(NodeId).collect(),
        bind_shape_matrix: Mat4::IDENTITY.to_cols_array(),
        inverse_bind_matrices,
        influences: Vec::new(),
    }
}

fn names(skeleton: &Skeleton) -> Vec<&str> {
    skeleton.bones().iter().map(|b| b.name.as_str()).collect()
}

#[test]
fn test_merge_with_itself_keeps_bone_count() {
    let graph = graph();
    let s = Skeleton::from_skin(&graph, &skin(&graph, &[4, 2, 6])).unwrap();
    let merged = merge_skeletons(&s, &s);
    assert_eq!(merged.bone_count(), s.bone_count());
}

#[test]
fn test_completed_skeleton_sorts() {
    let graph = graph();
    // Joints listed leaf first, with gaps in the hierarchy
    let mut skeleton = Skeleton::from_skin(&graph, &skin(&graph, &[4, 6, 3, 2])).unwrap();
    assert!(!bones_sorted(&skeleton));

    // thigh and hips are missing
    let added = add_bone_parents(&mut skeleton, &graph).unwrap();
    assert_eq!(added, 2);

    let order = sort_bones(&mut skeleton).unwrap();
    assert!(bones_sorted(&skeleton));
    check_consistency(&skeleton, &graph).unwrap();

    assert_eq!(names(&skeleton), vec!["hips", "spine", "thigh", "neck", "shin", "head"]);
    // Old index 0 was the head
    assert_eq!(skeleton.bones()[order[0]].name, "head");
}

#[test]
fn test_merging_two_skins_shares_bones() {
    let graph = graph();
    let upper = Skeleton::from_skin(&graph, &skin(&graph, &[1, 2, 3])).unwrap();
    let lower = Skeleton::from_skin(&graph, &skin(&graph, &[1, 5, 7])).unwrap();

    let mut merger = SkeletonMerger::new();
    assert_eq!(merger.add(&upper), vec![0, 1, 2]);
    assert_eq!(merger.add(&lower), vec![0, 3, 4]);
    let mut skeleton = merger.finish();

    sort_bones(&mut skeleton).unwrap();
    check_consistency(&skeleton, &graph).unwrap();
    assert_eq!(names(&skeleton), vec!["hips", "spine", "thigh", "thigh_r", "neck"]);
}

#[test]
fn test_duplicate_bones_are_rejected() {
    let graph = graph();
    let s = Skeleton::from_skin(&graph, &skin(&graph, &[1])).unwrap();
    let mut bones = s.bones().to_vec();
    bones.extend(s.bones().iter().cloned());

    assert!(matches!(
        check_consistency(&Skeleton::new(bones), &graph),
        Err(RigError::DuplicateBone { first: 0, second: 1, .. })
    ));
}
