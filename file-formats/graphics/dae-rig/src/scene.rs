//! Parsed scene description consumed by the converter
//!
//! These types describe what the COLLADA front-end hands over: a node
//! hierarchy, skin controllers, uniformly sampled animation curves and raw
//! per-attribute indexed geometry. They deserialize from JSON so tooling can
//! feed scenes produced by any external loader.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};

/// Identity of a scene-graph node
///
/// Bones refer to nodes by id, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the visual scene hierarchy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    /// Local transform, column-major
    #[serde(default = "identity_matrix")]
    pub matrix: [f32; 16],
}

fn identity_matrix() -> [f32; 16] {
    Mat4::IDENTITY.to_cols_array()
}

impl SceneNode {
    pub fn new(id: u32, name: &str, parent: Option<u32>, matrix: Mat4) -> Self {
        Self {
            id: NodeId(id),
            name: name.to_string(),
            parent: parent.map(NodeId),
            matrix: matrix.to_cols_array(),
        }
    }
}

/// Node hierarchy with id lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<SceneNode>", into = "Vec<SceneNode>")]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    lookup: HashMap<NodeId, usize>,
}

impl From<Vec<SceneNode>> for SceneGraph {
    fn from(nodes: Vec<SceneNode>) -> Self {
        Self::new(nodes)
    }
}

impl From<SceneGraph> for Vec<SceneNode> {
    fn from(graph: SceneGraph) -> Self {
        graph.nodes
    }
}

impl SceneGraph {
    pub fn new(nodes: Vec<SceneNode>) -> Self {
        let lookup = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();
        Self { nodes, lookup }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&SceneNode> {
        self.lookup
            .get(&id)
            .map(|&index| &self.nodes[index])
            .ok_or(RigError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.lookup.contains_key(&id)
    }

    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn local_matrix(&self, id: NodeId) -> Result<Mat4> {
        Ok(Mat4::from_cols_array(&self.node(id)?.matrix))
    }

    /// Accumulated transform from the scene root down to `id`
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4> {
        let mut world = self.local_matrix(id)?;
        let mut current = self.parent_of(id)?;
        let mut steps = 0;
        while let Some(parent) = current {
            steps += 1;
            if steps > self.nodes.len() {
                return Err(RigError::CyclicHierarchy(format!("node {id}")));
            }
            world = self.local_matrix(parent)? * world;
            current = self.parent_of(parent)?;
        }
        Ok(world)
    }

    /// Direct children of `id`, in storage order
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(move |n| n.parent == Some(id))
    }

    /// Check that every parent exists and the hierarchy is acyclic
    pub fn validate(&self) -> Result<()> {
        if self.lookup.len() != self.nodes.len() {
            return Err(RigError::InvalidScene(
                "scene graph contains duplicate node ids".to_string(),
            ));
        }
        for node in &self.nodes {
            let mut current = node.parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(RigError::CyclicHierarchy(format!("node {}", node.id)));
                }
                current = self.node(parent)?.parent;
            }
        }
        Ok(())
    }
}

/// Skin controller: binds a mesh to a list of joint nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinController {
    #[serde(default)]
    pub name: String,
    pub joints: Vec<NodeId>,
    /// Row-major, as stored in the source document
    #[serde(default = "identity_matrix")]
    pub bind_shape_matrix: [f32; 16],
    /// Row-major, 16 floats per joint
    pub inverse_bind_matrices: Vec<f32>,
    /// Per source position: `(joint index, weight)` pairs
    #[serde(default)]
    pub influences: Vec<Vec<(u32, f32)>>,
}

/// Uniformly sampled curves for one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAnimation {
    pub target: NodeId,
    #[serde(default)]
    pub position: Option<Vec<f32>>,
    #[serde(default)]
    pub rotation: Option<Vec<f32>>,
    #[serde(default)]
    pub scale: Option<Vec<f32>>,
}

/// Animation clip sampled at a uniform frame rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub fps: f32,
    pub frame_count: usize,
    #[serde(default)]
    pub channels: Vec<NodeAnimation>,
}

/// One input of a raw primitive (`<input semantic offset source>`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInput {
    pub semantic: String,
    /// Offset into each interleaved index tuple
    pub offset: usize,
    /// Number of components per element in `data`
    pub dim: usize,
    /// Distance between elements in `data`; defaults to `dim`
    #[serde(default)]
    pub stride: Option<usize>,
    pub data: Vec<f32>,
}

impl RawInput {
    pub fn stride(&self) -> usize {
        self.stride.unwrap_or(self.dim)
    }
}

/// Raw polygon list with one index stream per input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGeometry {
    pub name: String,
    /// Vertex count of every polygon; `None` means triangles
    #[serde(default)]
    pub polygon_sizes: Option<Vec<u32>>,
    /// Number of indices per polygon corner
    pub index_stride: usize,
    pub indices: Vec<u32>,
    pub inputs: Vec<RawInput>,
    /// Skin controller deforming this geometry
    #[serde(default)]
    pub skin: Option<usize>,
}

/// Everything the converter needs from a loaded document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub nodes: SceneGraph,
    #[serde(default)]
    pub skins: Vec<SkinController>,
    #[serde(default)]
    pub geometries: Vec<RawGeometry>,
    #[serde(default)]
    pub animations: Vec<AnimationClip>,
}

impl SceneDescription {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
