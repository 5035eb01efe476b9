//! Bone data and bone identity

use glam::{Mat4, Quat, Vec3};

use crate::error::Result;
use crate::scene::{NodeId, SceneGraph};

/// Maximum per-entry difference for two inverse bind matrices to be equal
pub const INV_BIND_TOLERANCE: f32 = 1e-5;

/// A joint of a skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    /// Scene node this bone animates; the bone's identity
    pub node: NodeId,
    /// Display name
    pub name: String,
    /// Index of the parent bone in the owning skeleton
    pub parent: Option<usize>,
    /// Column-major inverse bind matrix
    pub inv_bind_matrix: [f32; 16],
    pub bind_position: [f32; 3],
    pub bind_rotation: [f32; 4],
    pub bind_scale: [f32; 3],
    /// Whether any geometry is weighted to this bone
    pub skinned: bool,
}

impl Bone {
    /// Create a root bone with identity bind pose and inverse bind matrix
    pub fn new(node: NodeId, name: impl Into<String>) -> Self {
        Self {
            node,
            name: name.into(),
            parent: None,
            inv_bind_matrix: Mat4::IDENTITY.to_cols_array(),
            bind_position: [0.0; 3],
            bind_rotation: [0.0, 0.0, 0.0, 1.0],
            bind_scale: [1.0; 3],
            skinned: false,
        }
    }

    /// Build an unskinned bone for a scene node
    ///
    /// The bind pose is the node's local transform and the inverse bind matrix
    /// the inverse of its world transform.
    pub fn from_node(graph: &SceneGraph, id: NodeId) -> Result<Self> {
        let node = graph.node(id)?;
        let mut bone = Self::new(id, node.name.clone());
        bone.set_bind_pose(graph.local_matrix(id)?);
        bone.inv_bind_matrix = graph.world_matrix(id)?.inverse().to_cols_array();
        Ok(bone)
    }

    /// Decompose a local matrix into the bind position, rotation and scale
    pub fn set_bind_pose(&mut self, local: Mat4) {
        let (scale, rotation, translation) = local.to_scale_rotation_translation();
        self.bind_position = translation.to_array();
        self.bind_rotation = rotation.normalize().to_array();
        self.bind_scale = scale.to_array();
    }

    /// Local bind matrix composed from the decomposed bind pose
    pub fn bind_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.bind_scale),
            Quat::from_array(self.bind_rotation),
            Vec3::from_array(self.bind_position),
        )
    }

    /// Fold a bone that is the same bone as `self` into it
    ///
    /// The skinned flags are OR-ed; everything else of `self` wins.
    pub fn merge(&mut self, other: &Bone) {
        self.skinned |= other.skinned;
    }
}

/// Two bones are the same bone when they animate the same node and their
/// inverse bind matrices agree within [`INV_BIND_TOLERANCE`].
pub fn same_bone(a: &Bone, b: &Bone) -> bool {
    a.node == b.node
        && a
            .inv_bind_matrix
            .iter()
            .zip(&b.inv_bind_matrix)
            .all(|(x, y)| (x - y).abs() <= INV_BIND_TOLERANCE)
}
