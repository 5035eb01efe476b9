//! Merging chunks into shared buffers

use super::{GeometryChunk, VertexAttributes};
use crate::error::{DataWarning, Diagnostics};

/// Where one source chunk ended up inside a [`MergedGeometry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRange {
    pub name: String,
    pub first_vertex: usize,
    pub vertex_count: usize,
    pub first_index: usize,
    pub index_count: usize,
}

/// Several chunks sharing one set of vertex and index buffers
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGeometry {
    pub geometry: GeometryChunk,
    pub ranges: Vec<ChunkRange>,
}

fn append<T: Copy>(dest: &mut Option<Vec<T>>, src: &Option<Vec<T>>) {
    if let (Some(dest), Some(src)) = (dest, src) {
        dest.extend_from_slice(src);
    }
}

/// Concatenate `chunks` into one geometry
///
/// Merging only happens when every chunk carries exactly the same attribute
/// set; otherwise a warning is recorded and `None` is returned. Indices are
/// offset by the number of vertices of the preceding chunks.
pub fn merge_chunk_data(chunks: &[GeometryChunk], diagnostics: &mut Diagnostics) -> Option<MergedGeometry> {
    let first = chunks.first()?;
    let attributes = first.attributes();
    if chunks.iter().any(|chunk| chunk.attributes() != attributes) {
        diagnostics.warn(DataWarning::IncompatibleChunks);
        return None;
    }

    let empty = |flag: VertexAttributes| attributes.contains(flag).then(Vec::new);
    let mut geometry = GeometryChunk {
        name: chunks
            .iter()
            .map(|chunk| chunk.name.as_str())
            .collect::<Vec<_>>()
            .join("+"),
        vertex_count: 0,
        positions: empty(VertexAttributes::POSITION),
        normals: empty(VertexAttributes::NORMAL),
        texcoords: empty(VertexAttributes::TEXCOORD),
        bone_weights: empty(VertexAttributes::BONE_WEIGHT),
        bone_indices: attributes.contains(VertexAttributes::BONE_INDEX).then(Vec::new),
        indices: Vec::new(),
    };
    let mut ranges = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        let base = geometry.vertex_count;
        ranges.push(ChunkRange {
            name: chunk.name.clone(),
            first_vertex: base,
            vertex_count: chunk.vertex_count,
            first_index: geometry.indices.len(),
            index_count: chunk.indices.len(),
        });

        append(&mut geometry.positions, &chunk.positions);
        append(&mut geometry.normals, &chunk.normals);
        append(&mut geometry.texcoords, &chunk.texcoords);
        append(&mut geometry.bone_weights, &chunk.bone_weights);
        append(&mut geometry.bone_indices, &chunk.bone_indices);
        geometry
            .indices
            .extend(chunk.indices.iter().map(|&index| index + base as u32));
        geometry.vertex_count += chunk.vertex_count;
    }

    log::debug!(
        "Merged {} chunks into {} vertices, {} indices",
        chunks.len(),
        geometry.vertex_count,
        geometry.indices.len()
    );
    Some(MergedGeometry { geometry, ranges })
}
