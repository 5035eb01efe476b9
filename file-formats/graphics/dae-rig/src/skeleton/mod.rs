//! Skeleton model, construction from scene data, merging and sorting
//!
//! A [`Skeleton`] is an ordered list of [`Bone`]s. The position of a bone is
//! its index, and that index is what skin weights, animation tracks and
//! exported matrices refer to. Parents are stored as indices into the same
//! list.

mod bone;
mod merge;

pub use bone::{Bone, INV_BIND_TOLERANCE, same_bone};
pub use merge::{
    SkeletonMerger, add_bone_parents, bones_sorted, check_consistency, merge_skeletons,
    sort_bones,
};

use glam::Mat4;

use crate::error::{Result, RigError};
use crate::scene::{NodeId, SceneGraph, SkinController};

/// Ordered bone list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Self {
        Self { bones }
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn into_bones(self) -> Vec<Bone> {
        self.bones
    }

    pub(crate) fn bones_mut(&mut self) -> &mut Vec<Bone> {
        &mut self.bones
    }

    /// First bone animating `node`
    pub fn find_bone_by_node(&self, node: NodeId) -> Option<usize> {
        self.bones.iter().position(|b| b.node == node)
    }

    /// Number of ancestors of a bone; roots have depth 0
    pub fn bone_depth(&self, index: usize) -> Result<usize> {
        let Some(bone) = self.bones.get(index) else {
            return Err(RigError::BoneOutOfRange {
                index,
                count: self.bones.len(),
            });
        };
        let mut depth = 0;
        let mut current = index;
        let mut next = bone.parent;
        while let Some(parent) = next {
            if parent >= self.bones.len() {
                return Err(RigError::MissingParent {
                    bone: current,
                    parent,
                });
            }
            depth += 1;
            if depth > self.bones.len() {
                return Err(RigError::CyclicHierarchy(format!(
                    "bone {index} ({})",
                    bone.name
                )));
            }
            current = parent;
            next = self.bones[current].parent;
        }
        Ok(depth)
    }

    /// Parent index per bone, `-1` for roots
    pub fn parent_indices(&self) -> Vec<i32> {
        self.bones
            .iter()
            .map(|b| b.parent.map_or(-1, |p| p as i32))
            .collect()
    }

    /// Build the skeleton of a skin controller
    ///
    /// Joint inverse bind matrices arrive row-major and are transposed; the
    /// bind shape matrix is folded into every inverse bind matrix. Parents are
    /// linked only between joints of this skin whose nodes are direct parent
    /// and child; [`add_bone_parents`] closes the remaining gaps.
    pub fn from_skin(graph: &SceneGraph, skin: &SkinController) -> Result<Self> {
        let joint_count = skin.joints.len();
        if skin.inverse_bind_matrices.len() != joint_count * 16 {
            return Err(RigError::LengthMismatch {
                what: "inverse bind matrices",
                expected: joint_count * 16,
                actual: skin.inverse_bind_matrices.len(),
            });
        }

        let bind_shape = Mat4::from_cols_array(&skin.bind_shape_matrix).transpose();

        let mut bones = Vec::with_capacity(joint_count);
        for (index, &joint) in skin.joints.iter().enumerate() {
            let mut raw = [0.0f32; 16];
            raw.copy_from_slice(&skin.inverse_bind_matrices[index * 16..index * 16 + 16]);
            let inv_bind = Mat4::from_cols_array(&raw).transpose() * bind_shape;

            let node = graph.node(joint)?;
            let mut bone = Bone::new(joint, node.name.clone());
            bone.set_bind_pose(graph.local_matrix(joint)?);
            bone.inv_bind_matrix = inv_bind.to_cols_array();
            bone.skinned = true;
            bones.push(bone);
        }

        for index in 0..joint_count {
            if let Some(parent_node) = graph.parent_of(skin.joints[index])? {
                bones[index].parent = skin.joints.iter().position(|&j| j == parent_node);
            }
        }

        log::debug!(
            "skin '{}': {} joints converted to bones",
            skin.name,
            joint_count
        );
        Ok(Self::new(bones))
    }

    /// Build an unskinned skeleton from a node and all its descendants
    ///
    /// Bones are emitted depth-first, so parents always precede children.
    pub fn from_node(graph: &SceneGraph, root: NodeId) -> Result<Self> {
        let mut bones = Vec::new();
        let mut stack = vec![(root, None)];
        while let Some((id, parent)) = stack.pop() {
            if bones.len() > graph.nodes().len() {
                return Err(RigError::CyclicHierarchy(format!("node {id}")));
            }
            let mut bone = Bone::from_node(graph, id)?;
            bone.parent = parent;
            let index = bones.len();
            bones.push(bone);

            let children: Vec<NodeId> = graph.children_of(id).map(|n| n.id).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(index)));
            }
        }
        Ok(Self::new(bones))
    }
}
