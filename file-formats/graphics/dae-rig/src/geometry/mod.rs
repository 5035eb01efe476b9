//! Geometry re-indexing
//!
//! COLLADA primitives index every attribute separately: each polygon corner
//! is a tuple of indices, one per input. GPUs want a single index per vertex.
//! This module compacts the distinct index tuples into dense vertex ids,
//! scatters the attribute data into per-vertex buffers and optionally merges
//! several chunks into one shared set of buffers.

mod merge;
mod reindex;
mod skin;

pub use merge::{ChunkRange, MergedGeometry, merge_chunk_data};
pub use reindex::{CompactIndices, build_chunk, compact_index_tuples, compact_indices, re_index};
pub use skin::{InfluenceStreams, MAX_INFLUENCES, SkinInfluences};

use bitflags::bitflags;

bitflags! {
    /// Vertex attributes present in a geometry chunk
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexAttributes: u8 {
        const POSITION = 0x01;
        const NORMAL = 0x02;
        const TEXCOORD = 0x04;
        const BONE_WEIGHT = 0x08;
        const BONE_INDEX = 0x10;
    }
}

/// Components per position
pub const POSITION_DIM: usize = 3;
/// Components per normal
pub const NORMAL_DIM: usize = 3;
/// Components per texture coordinate
pub const TEXCOORD_DIM: usize = 2;

/// Indexed triangle geometry with one index per vertex
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryChunk {
    pub name: String,
    pub vertex_count: usize,
    pub positions: Option<Vec<f32>>,
    pub normals: Option<Vec<f32>>,
    pub texcoords: Option<Vec<f32>>,
    /// [`MAX_INFLUENCES`] weights per vertex
    pub bone_weights: Option<Vec<f32>>,
    /// [`MAX_INFLUENCES`] bone indices per vertex
    pub bone_indices: Option<Vec<u16>>,
    /// Triangle list
    pub indices: Vec<u32>,
}

impl GeometryChunk {
    pub fn attributes(&self) -> VertexAttributes {
        let mut attributes = VertexAttributes::empty();
        attributes.set(VertexAttributes::POSITION, self.positions.is_some());
        attributes.set(VertexAttributes::NORMAL, self.normals.is_some());
        attributes.set(VertexAttributes::TEXCOORD, self.texcoords.is_some());
        attributes.set(VertexAttributes::BONE_WEIGHT, self.bone_weights.is_some());
        attributes.set(VertexAttributes::BONE_INDEX, self.bone_indices.is_some());
        attributes
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Rewrite bone indices through `remap` (old bone index -> new bone index)
    pub fn remap_bone_indices(&mut self, remap: &[usize]) -> crate::Result<()> {
        if let Some(indices) = &mut self.bone_indices {
            for index in indices.iter_mut() {
                let mapped = remap.get(*index as usize).copied().ok_or_else(|| {
                    crate::RigError::InvalidGeometry(format!(
                        "'{}' references bone {index} outside the skeleton",
                        self.name
                    ))
                })?;
                *index = u16::try_from(mapped).map_err(|_| crate::RigError::TooManyBones {
                    count: mapped + 1,
                    limit: u16::MAX as usize + 1,
                })?;
            }
        }
        Ok(())
    }
}
