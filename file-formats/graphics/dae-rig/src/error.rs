use std::fmt;
use std::io;
use thiserror::Error;

use crate::scene::NodeId;

/// Fatal errors raised by the conversion pipeline and the animation runtime.
///
/// Every variant is a structural problem with the input or a bug upstream; the
/// caller is expected to abort the conversion of the affected asset.
#[derive(Error, Debug)]
pub enum RigError {
    /// I/O error while writing or reading an interchange document
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error while encoding or decoding a JSON document header
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two distinct bones refer to the same node with the same inverse bind matrix
    #[error("Duplicate bone: bones {first} and {second} are the same bone ({name})")]
    DuplicateBone {
        first: usize,
        second: usize,
        name: String,
    },

    /// A bone has a bone parent although its node has no parent node
    #[error("Bone {bone} ({name}) has a parent bone but its node is a scene root")]
    OrphanedBoneParent { bone: usize, name: String },

    /// A bone parent index points outside the skeleton
    #[error("Bone {bone} references parent {parent}, which is not part of the skeleton")]
    MissingParent { bone: usize, parent: usize },

    /// A bone index outside the skeleton
    #[error("Bone index {index} out of range for {count} bones")]
    BoneOutOfRange { index: usize, count: usize },

    /// A bone appears before its parent in storage order
    #[error("Bones are not sorted: bone {bone} precedes its parent {parent}")]
    UnsortedBones { bone: usize, parent: usize },

    /// The bone or node hierarchy contains a cycle
    #[error("Cyclic hierarchy detected at {0}")]
    CyclicHierarchy(String),

    /// The skeleton cannot be addressed by the target resource
    #[error("Too many bones: {count} exceeds the limit of {limit}")]
    TooManyBones { count: usize, limit: usize },

    /// Scene description is malformed
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// A node id is not present in the scene graph
    #[error("Unknown scene node: {0}")]
    UnknownNode(NodeId),

    /// Animation data does not match its skeleton or is malformed
    #[error("Invalid animation: {0}")]
    InvalidAnimation(String),

    /// Blend tree definition is malformed
    #[error("Invalid blend tree: {0}")]
    InvalidBlendTree(String),

    /// Geometry input cannot be converted at all
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Interchange document is malformed
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A caller-supplied buffer has the wrong length
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type using RigError
pub type Result<T> = std::result::Result<T, RigError>;

/// Recoverable data-quality issues.
///
/// These never abort processing: the pipeline substitutes the best available
/// data and records the warning in a [`Diagnostics`] collector.
#[derive(Debug, Clone, PartialEq)]
pub enum DataWarning {
    /// A polygon with more than three vertices was fan-triangulated
    NonTrianglePolygon { geometry: String, vertices: u32 },
    /// A polygon with fewer than three vertices was skipped
    DegeneratePolygon { geometry: String, vertices: u32 },
    /// The source attribute has fewer components than the destination
    InsufficientDimensions {
        semantic: String,
        source: usize,
        destination: usize,
    },
    /// The source attribute has more components than the destination
    ExcessDimensions {
        semantic: String,
        source: usize,
        destination: usize,
    },
    /// An input semantic the converter does not handle
    UnsupportedSemantic { geometry: String, semantic: String },
    /// A vertex had more bone influences than the output stream holds
    TooManyInfluences {
        vertex: usize,
        influences: usize,
        kept: usize,
    },
    /// A vertex had no usable bone influence
    UnweightedVertex { vertex: usize },
    /// An animation channel targets a node that is not a bone
    UntargetedChannel { animation: String, node: NodeId },
    /// Chunks could not be merged because their attribute sets differ
    IncompatibleChunks,
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonTrianglePolygon { geometry, vertices } => write!(
                f,
                "geometry '{geometry}': polygon with {vertices} vertices was triangulated as a fan"
            ),
            Self::DegeneratePolygon { geometry, vertices } => write!(
                f,
                "geometry '{geometry}': skipped degenerate polygon with {vertices} vertices"
            ),
            Self::InsufficientDimensions {
                semantic,
                source,
                destination,
            } => write!(
                f,
                "{semantic}: source has {source} components, {destination} expected; remaining components are zero"
            ),
            Self::ExcessDimensions {
                semantic,
                source,
                destination,
            } => write!(
                f,
                "{semantic}: source has {source} components, only {destination} are used"
            ),
            Self::UnsupportedSemantic { geometry, semantic } => {
                write!(f, "geometry '{geometry}': ignoring input semantic {semantic}")
            }
            Self::TooManyInfluences {
                vertex,
                influences,
                kept,
            } => write!(
                f,
                "vertex {vertex}: {influences} bone influences, keeping the {kept} strongest"
            ),
            Self::UnweightedVertex { vertex } => {
                write!(f, "vertex {vertex} has no bone influence")
            }
            Self::UntargetedChannel { animation, node } => write!(
                f,
                "animation '{animation}': channel for node {node} does not target a bone"
            ),
            Self::IncompatibleChunks => {
                write!(f, "geometry chunks have different attributes and were not merged")
            }
        }
    }
}

/// Collector for [`DataWarning`]s.
///
/// Every warning is forwarded to the `log` facade when it is recorded.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<DataWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning
    pub fn warn(&mut self, warning: DataWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }
}
