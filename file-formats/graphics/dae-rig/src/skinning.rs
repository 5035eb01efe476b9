//! Pose to skinning matrices
//!
//! Composes the decomposed per-bone transforms of a [`Pose`] into world
//! matrices by walking the hierarchy in storage order, then multiplies each
//! world matrix with the bone's inverse bind matrix to get the matrix the
//! vertex shader applies.

use crate::error::{Result, RigError};
use crate::pose::Pose;
use crate::skeleton::Skeleton;
use crate::stream::{mat_compose, mat4_multiply, mat4_multiply_within};

/// World and skin matrices for every bone, 16 column-major floats each
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonMatrices {
    pub world: Vec<f32>,
    pub skin: Vec<f32>,
}

impl SkeletonMatrices {
    pub fn new(bone_count: usize) -> Self {
        Self {
            world: vec![0.0; bone_count * 16],
            skin: vec![0.0; bone_count * 16],
        }
    }

    pub fn bone_count(&self) -> usize {
        self.world.len() / 16
    }

    pub fn world_matrix(&self, bone: usize) -> &[f32] {
        &self.world[bone * 16..bone * 16 + 16]
    }

    pub fn skin_matrix(&self, bone: usize) -> &[f32] {
        &self.skin[bone * 16..bone * 16 + 16]
    }
}

/// Compute world and skin matrices for `pose`
///
/// Bones are processed in storage order and a child reads its parent's world
/// matrix from `out`, so the skeleton must be sorted parents-first (see
/// [`sort_bones`](crate::skeleton::sort_bones)). This is not checked here: an
/// unsorted skeleton produces matrices built from stale parent data.
pub fn export_pose(skeleton: &Skeleton, pose: &Pose, out: &mut SkeletonMatrices) -> Result<()> {
    let count = skeleton.bone_count();
    if pose.bone_count() != count {
        return Err(RigError::LengthMismatch {
            what: "pose bones",
            expected: count,
            actual: pose.bone_count(),
        });
    }
    if out.bone_count() != count {
        *out = SkeletonMatrices::new(count);
    }

    let mut local = [0.0f32; 16];
    for (i, bone) in skeleton.bones().iter().enumerate() {
        mat_compose(&mut local, 0, &pose.pos, i * 3, &pose.rot, i * 4, &pose.scl, i * 3);

        match bone.parent {
            Some(parent) if parent < count => {
                mat4_multiply_within(&mut out.world, i * 16, parent * 16, &local, 0);
            }
            Some(parent) => return Err(RigError::MissingParent { bone: i, parent }),
            None => out.world[i * 16..i * 16 + 16].copy_from_slice(&local),
        }

        mat4_multiply(&mut out.skin, i * 16, &out.world, i * 16, &bone.inv_bind_matrix, 0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::reset_pose;
    use crate::scene::{NodeId, SceneGraph, SceneNode};
    use crate::skeleton::Bone;
    use crate::stream::{MAT4_IDENTITY, mat4_transform_point};
    use glam::{Mat4, Quat, Vec3};

    fn assert_identity(m: &[f32]) {
        for (x, y) in m.iter().zip(MAT4_IDENTITY.iter()) {
            assert!((x - y).abs() < 1e-5, "{m:?} is not identity");
        }
    }

    #[test]
    fn test_single_root_bind_pose_is_identity() {
        let graph = SceneGraph::new(vec![SceneNode::new(
            1,
            "root",
            None,
            Mat4::from_scale_rotation_translation(
                Vec3::new(1.0, 2.0, 1.0),
                Quat::from_rotation_y(0.7),
                Vec3::new(3.0, -1.0, 2.0),
            ),
        )]);
        let skeleton = Skeleton::new(vec![Bone::from_node(&graph, NodeId(1)).unwrap()]);
        let mut pose = Pose::new(1);
        reset_pose(&skeleton, &mut pose);

        let mut matrices = SkeletonMatrices::new(1);
        export_pose(&skeleton, &pose, &mut matrices).unwrap();
        assert_identity(matrices.skin_matrix(0));
    }

    #[test]
    fn test_bind_pose_chain_is_identity() {
        let graph = SceneGraph::new(vec![
            SceneNode::new(1, "root", None, Mat4::from_translation(Vec3::X)),
            SceneNode::new(
                2,
                "child",
                Some(1),
                Mat4::from_rotation_translation(Quat::from_rotation_z(0.5), Vec3::Y),
            ),
        ]);
        let skeleton = Skeleton::from_node(&graph, NodeId(1)).unwrap();
        let mut pose = Pose::new(2);
        reset_pose(&skeleton, &mut pose);

        let mut matrices = SkeletonMatrices::new(2);
        export_pose(&skeleton, &pose, &mut matrices).unwrap();
        assert_identity(matrices.skin_matrix(0));
        assert_identity(matrices.skin_matrix(1));
    }

    #[test]
    fn test_world_matrix_accumulates_parent() {
        let mut child = Bone::new(NodeId(2), "child");
        child.parent = Some(0);
        let skeleton = Skeleton::new(vec![Bone::new(NodeId(1), "root"), child]);

        let mut pose = Pose::new(2);
        pose.pos.copy_from_slice(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let mut matrices = SkeletonMatrices::default();
        export_pose(&skeleton, &pose, &mut matrices).unwrap();
        assert_eq!(matrices.bone_count(), 2);

        let p = mat4_transform_point(&matrices.world, 16, [0.0, 0.0, 0.0]);
        assert!((p[0] - 1.0).abs() < 1e-6);
        assert!((p[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pose_size_mismatch() {
        let skeleton = Skeleton::new(vec![Bone::new(NodeId(1), "root")]);
        let pose = Pose::new(3);
        let mut matrices = SkeletonMatrices::new(1);
        assert!(export_pose(&skeleton, &pose, &mut matrices).is_err());
    }
}
