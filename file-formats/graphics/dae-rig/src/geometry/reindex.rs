//! Index compaction and attribute scattering

use std::collections::HashMap;

use super::skin::InfluenceStreams;
use super::MAX_INFLUENCES;
use super::{GeometryChunk, NORMAL_DIM, POSITION_DIM, TEXCOORD_DIM};
use crate::error::{DataWarning, Diagnostics, Result, RigError};
use crate::scene::{RawGeometry, RawInput};

/// Dense relabeling of interleaved source indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompactIndices {
    /// New vertex id of every corner
    pub indices: Vec<u32>,
    /// Source index tuple of every new vertex, `width` entries each
    pub sources: Vec<u32>,
    /// Number of source indices per tuple
    pub width: usize,
}

impl CompactIndices {
    pub fn vertex_count(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.sources.len() / self.width
        }
    }

    /// Source index of `vertex` in tuple slot `slot`
    pub fn source(&self, vertex: usize, slot: usize) -> Option<u32> {
        if slot >= self.width {
            return None;
        }
        self.sources.get(vertex * self.width + slot).copied()
    }
}

/// Relabel the indices found at `offset` of every `stride`-wide corner
///
/// Equal source indices get equal new ids, numbered in order of first use.
pub fn compact_indices(indices: &[u32], stride: usize, offset: usize) -> Result<CompactIndices> {
    compact_index_tuples(indices, stride, &[offset])
}

/// Relabel corners by the tuple of indices found at `offsets`
///
/// Two corners share a new vertex only if they agree on every offset.
/// Every offset must lie inside the stride.
pub fn compact_index_tuples(
    indices: &[u32],
    stride: usize,
    offsets: &[usize],
) -> Result<CompactIndices> {
    let width = offsets.len();
    let mut compact = CompactIndices {
        width,
        ..Default::default()
    };
    if stride == 0 || width == 0 {
        return Ok(compact);
    }
    if let Some(offset) = offsets.iter().find(|&&offset| offset >= stride) {
        return Err(RigError::InvalidGeometry(format!(
            "index offset {offset} outside stride {stride}"
        )));
    }

    let mut seen: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut key = Vec::with_capacity(width);
    for corner in indices.chunks_exact(stride) {
        key.clear();
        key.extend(offsets.iter().map(|&offset| corner[offset]));
        let next = seen.len() as u32;
        let id = *seen.entry(key.clone()).or_insert_with(|| {
            compact.sources.extend_from_slice(&key);
            next
        });
        compact.indices.push(id);
    }
    Ok(compact)
}

/// Scatter attribute values into a per-vertex buffer
///
/// For every corner `i`, the element addressed by
/// `src_indices[i * src_stride + src_offset]` in `src_data` (elements of
/// `src_dim` floats) is copied to the element addressed by
/// `dest_indices[i * dest_stride + dest_offset]` in `dest_data` (elements of
/// `dest_dim` floats). Only `min(src_dim, dest_dim)` components are copied.
#[allow(clippy::too_many_arguments)]
pub fn re_index(
    src_data: &[f32],
    src_indices: &[u32],
    src_stride: usize,
    src_offset: usize,
    src_dim: usize,
    dest_data: &mut [f32],
    dest_indices: &[u32],
    dest_stride: usize,
    dest_offset: usize,
    dest_dim: usize,
) -> Result<()> {
    if src_stride == 0 || dest_stride == 0 {
        return Err(RigError::InvalidGeometry("zero index stride".to_string()));
    }
    if src_offset >= src_stride || dest_offset >= dest_stride {
        return Err(RigError::InvalidGeometry(format!(
            "index offsets {src_offset}/{dest_offset} outside strides {src_stride}/{dest_stride}"
        )));
    }
    let corners = src_indices.len() / src_stride;
    if dest_indices.len() / dest_stride != corners {
        return Err(RigError::LengthMismatch {
            what: "re-indexed corners",
            expected: corners,
            actual: dest_indices.len() / dest_stride,
        });
    }

    let copy = src_dim.min(dest_dim);
    for corner in 0..corners {
        let src = src_indices[corner * src_stride + src_offset] as usize * src_dim;
        let dest = dest_indices[corner * dest_stride + dest_offset] as usize * dest_dim;
        if src + copy > src_data.len() {
            return Err(RigError::InvalidGeometry(format!(
                "source index {} out of range ({} values)",
                src / src_dim.max(1),
                src_data.len()
            )));
        }
        if dest + copy > dest_data.len() {
            return Err(RigError::InvalidGeometry(format!(
                "destination index {} out of range",
                dest / dest_dim.max(1)
            )));
        }
        dest_data[dest..dest + copy].copy_from_slice(&src_data[src..src + copy]);
    }
    Ok(())
}

/// Expand polygons into a triangle list of interleaved index tuples
fn triangulate(geometry: &RawGeometry, diagnostics: &mut Diagnostics) -> Result<Vec<u32>> {
    let stride = geometry.index_stride;
    if stride == 0 {
        return Err(RigError::InvalidGeometry(format!(
            "'{}' has an index stride of 0",
            geometry.name
        )));
    }
    if geometry.indices.len() % stride != 0 {
        return Err(RigError::InvalidGeometry(format!(
            "'{}' has {} indices, not a multiple of the stride {stride}",
            geometry.name,
            geometry.indices.len()
        )));
    }
    let corner = |i: usize| &geometry.indices[i * stride..(i + 1) * stride];
    let corner_count = geometry.indices.len() / stride;

    let Some(sizes) = &geometry.polygon_sizes else {
        if corner_count % 3 != 0 {
            return Err(RigError::InvalidGeometry(format!(
                "'{}' has {corner_count} corners, not a triangle list",
                geometry.name
            )));
        }
        return Ok(geometry.indices.clone());
    };

    let total: usize = sizes.iter().map(|&n| n as usize).sum();
    if total != corner_count {
        return Err(RigError::LengthMismatch {
            what: "polygon corners",
            expected: total,
            actual: corner_count,
        });
    }

    let mut triangles = Vec::with_capacity(geometry.indices.len());
    let mut first = 0;
    for &size in sizes {
        let n = size as usize;
        if n < 3 {
            diagnostics.warn(DataWarning::DegeneratePolygon {
                geometry: geometry.name.clone(),
                vertices: size,
            });
        } else {
            if n > 3 {
                diagnostics.warn(DataWarning::NonTrianglePolygon {
                    geometry: geometry.name.clone(),
                    vertices: size,
                });
            }
            for i in 1..n - 1 {
                triangles.extend_from_slice(corner(first));
                triangles.extend_from_slice(corner(first + i));
                triangles.extend_from_slice(corner(first + i + 1));
            }
        }
        first += n;
    }
    Ok(triangles)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Position,
    Normal,
    Texcoord,
}

impl Slot {
    fn from_semantic(semantic: &str) -> Option<Self> {
        match semantic {
            "POSITION" | "VERTEX" => Some(Self::Position),
            "NORMAL" => Some(Self::Normal),
            "TEXCOORD" => Some(Self::Texcoord),
            _ => None,
        }
    }

    fn dim(self) -> usize {
        match self {
            Self::Position => POSITION_DIM,
            Self::Normal => NORMAL_DIM,
            Self::Texcoord => TEXCOORD_DIM,
        }
    }
}

fn check_dimensions(input: &RawInput, dim: usize, diagnostics: &mut Diagnostics) {
    if input.dim < dim {
        diagnostics.warn(DataWarning::InsufficientDimensions {
            semantic: input.semantic.clone(),
            source: input.dim,
            destination: dim,
        });
    } else if input.dim > dim {
        diagnostics.warn(DataWarning::ExcessDimensions {
            semantic: input.semantic.clone(),
            source: input.dim,
            destination: dim,
        });
    }
}

/// Convert a raw polygon list into an indexed triangle chunk
///
/// Non-triangle polygons are fan-triangulated and unknown input semantics are
/// skipped, both with a warning. When `skin` is given, bone weights and
/// indices are attached per vertex through the position index.
pub fn build_chunk(
    geometry: &RawGeometry,
    skin: Option<&InfluenceStreams>,
    diagnostics: &mut Diagnostics,
) -> Result<GeometryChunk> {
    let triangles = triangulate(geometry, diagnostics)?;
    let stride = geometry.index_stride;

    let mut inputs: Vec<(Slot, &RawInput)> = Vec::new();
    for input in &geometry.inputs {
        if input.offset >= stride {
            return Err(RigError::InvalidGeometry(format!(
                "'{}': {} input offset {} exceeds stride {stride}",
                geometry.name, input.semantic, input.offset
            )));
        }
        match Slot::from_semantic(&input.semantic) {
            // Only the first set of each semantic is used
            Some(slot) if !inputs.iter().any(|&(used, _)| used == slot) => {
                inputs.push((slot, input))
            }
            _ => diagnostics.warn(DataWarning::UnsupportedSemantic {
                geometry: geometry.name.clone(),
                semantic: input.semantic.clone(),
            }),
        }
    }
    let Some(position_slot) = inputs.iter().position(|&(slot, _)| slot == Slot::Position) else {
        return Err(RigError::InvalidGeometry(format!(
            "'{}' has no POSITION input",
            geometry.name
        )));
    };

    let offsets: Vec<usize> = inputs.iter().map(|(_, input)| input.offset).collect();
    let compact = compact_index_tuples(&triangles, stride, &offsets)?;
    let vertex_count = compact.vertex_count();
    log::debug!(
        "Geometry '{}': {} triangles, {vertex_count} vertices",
        geometry.name,
        compact.indices.len() / 3
    );

    let mut chunk = GeometryChunk {
        name: geometry.name.clone(),
        vertex_count,
        indices: compact.indices.clone(),
        ..Default::default()
    };

    for &(slot, input) in &inputs {
        let dim = slot.dim();
        check_dimensions(input, dim, diagnostics);
        let mut data = vec![0.0; vertex_count * dim];
        re_index(
            &input.data,
            &triangles,
            stride,
            input.offset,
            input.stride(),
            &mut data,
            &compact.indices,
            1,
            0,
            dim,
        )?;
        match slot {
            Slot::Position => chunk.positions = Some(data),
            Slot::Normal => chunk.normals = Some(data),
            Slot::Texcoord => chunk.texcoords = Some(data),
        }
    }

    if let Some(streams) = skin {
        let mut weights = Vec::with_capacity(vertex_count * MAX_INFLUENCES);
        let mut bones = Vec::with_capacity(vertex_count * MAX_INFLUENCES);
        for vertex in 0..vertex_count {
            let source = compact.source(vertex, position_slot).ok_or_else(|| {
                RigError::InvalidGeometry(format!("'{}': vertex {vertex} has no source", geometry.name))
            })? as usize;
            let (w, b) = streams.vertex(source).ok_or_else(|| {
                RigError::InvalidGeometry(format!(
                    "'{}': position {source} has no skin influences",
                    geometry.name
                ))
            })?;
            weights.extend_from_slice(w);
            bones.extend_from_slice(b);
        }
        chunk.bone_weights = Some(weights);
        chunk.bone_indices = Some(bones);
    }

    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SkinInfluences;
    use pretty_assertions::assert_eq;

    fn input(semantic: &str, offset: usize, dim: usize, data: Vec<f32>) -> RawInput {
        RawInput {
            semantic: semantic.to_string(),
            offset,
            dim,
            stride: None,
            data,
        }
    }

    /// A quad over four positions with one normal, as a single polygon
    fn quad() -> RawGeometry {
        RawGeometry {
            name: "quad".to_string(),
            polygon_sizes: Some(vec![4]),
            index_stride: 2,
            indices: vec![0, 0, 1, 0, 2, 0, 3, 0],
            inputs: vec![
                input(
                    "VERTEX",
                    0,
                    3,
                    vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                ),
                input("NORMAL", 1, 3, vec![0.0, 0.0, 1.0]),
            ],
            skin: None,
        }
    }

    #[test]
    fn test_compact_first_seen_wins() {
        let compact = compact_indices(&[7, 9, 3, 3, 9, 7], 1, 0).unwrap();
        assert_eq!(compact.indices, vec![0, 1, 2, 2, 1, 0]);
        assert_eq!(compact.sources, vec![7, 9, 3]);
        assert_eq!(compact.vertex_count(), 3);
    }

    #[test]
    fn test_compact_with_offset() {
        // Stride 2: only the second index of each corner counts
        let compact = compact_indices(&[0, 5, 1, 5, 2, 6], 2, 1).unwrap();
        assert_eq!(compact.indices, vec![0, 0, 1]);
    }

    #[test]
    fn test_compact_tuples_split_on_any_difference() {
        let indices = [0, 0, 0, 1, 1, 0, 0, 0];
        let compact = compact_index_tuples(&indices, 2, &[0, 1]).unwrap();
        assert_eq!(compact.indices, vec![0, 1, 2, 0]);
        assert_eq!(compact.source(1, 1), Some(1));
        assert_eq!(compact.source(1, 2), None);
    }

    #[test]
    fn test_reindex_round_trip() {
        let data = [10.0, 11.0, 20.0, 21.0, 30.0, 31.0, 40.0, 41.0];
        let indices = [3, 0, 2, 2, 1, 3, 0, 0];
        let compact = compact_indices(&indices, 1, 0).unwrap();

        let mut dest = vec![0.0; compact.vertex_count() * 2];
        re_index(&data, &indices, 1, 0, 2, &mut dest, &compact.indices, 1, 0, 2).unwrap();

        for (corner, &original) in indices.iter().enumerate() {
            let v = compact.indices[corner] as usize;
            let o = original as usize;
            assert_eq!(&dest[v * 2..v * 2 + 2], &data[o * 2..o * 2 + 2]);
        }
    }

    #[test]
    fn test_reindex_copies_smaller_dimension() {
        let data = [1.0, 2.0, 3.0];
        let mut dest = vec![0.0; 2];
        re_index(&data, &[0], 1, 0, 3, &mut dest, &[0], 1, 0, 2).unwrap();
        assert_eq!(dest, vec![1.0, 2.0]);

        let mut dest = vec![0.0; 3];
        re_index(&data[..2], &[0], 1, 0, 2, &mut dest, &[0], 1, 0, 3).unwrap();
        assert_eq!(dest, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_reindex_out_of_range() {
        let mut dest = vec![0.0; 3];
        assert!(re_index(&[0.0; 3], &[4], 1, 0, 3, &mut dest, &[0], 1, 0, 3).is_err());
    }

    #[test]
    fn test_offsets_outside_stride_are_rejected() {
        assert!(matches!(
            compact_indices(&[0, 1, 2], 1, 1),
            Err(RigError::InvalidGeometry(_))
        ));
        assert!(compact_index_tuples(&[0, 1], 2, &[0, 2]).is_err());

        let mut dest = vec![0.0; 3];
        assert!(matches!(
            re_index(&[0.0; 3], &[0, 1], 1, 1, 3, &mut dest, &[0, 0], 1, 0, 3),
            Err(RigError::InvalidGeometry(_))
        ));
        assert!(re_index(&[0.0; 3], &[0], 1, 0, 3, &mut dest, &[0], 1, 1, 3).is_err());
    }

    #[test]
    fn test_build_chunk_fans_quads() {
        let mut diagnostics = Diagnostics::new();
        let chunk = build_chunk(&quad(), None, &mut diagnostics).unwrap();

        assert_eq!(chunk.vertex_count, 4);
        assert_eq!(chunk.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(chunk.normals.as_ref().map(Vec::len), Some(12));
        assert_eq!(
            diagnostics.warnings(),
            &[DataWarning::NonTrianglePolygon {
                geometry: "quad".to_string(),
                vertices: 4
            }]
        );
    }

    #[test]
    fn test_build_chunk_skips_unknown_semantics() {
        let mut geometry = quad();
        geometry.polygon_sizes = None;
        geometry.indices.truncate(6);
        geometry.inputs.push(input("COLOR", 1, 4, vec![1.0; 4]));

        let mut diagnostics = Diagnostics::new();
        let chunk = build_chunk(&geometry, None, &mut diagnostics).unwrap();
        assert_eq!(chunk.triangle_count(), 1);
        assert!(matches!(
            diagnostics.warnings(),
            [DataWarning::UnsupportedSemantic { .. }]
        ));
    }

    #[test]
    fn test_build_chunk_requires_positions() {
        let mut geometry = quad();
        geometry.inputs.remove(0);
        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            build_chunk(&geometry, None, &mut diagnostics),
            Err(RigError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_build_chunk_attaches_skin() {
        let skin = SkinInfluences::new(vec![
            vec![(0, 1.0)],
            vec![(1, 1.0)],
            vec![(0, 0.5), (1, 0.5)],
            vec![(1, 1.0)],
        ]);
        let mut diagnostics = Diagnostics::new();
        let streams = skin.to_vertex_streams(&mut diagnostics).unwrap();
        let chunk = build_chunk(&quad(), Some(&streams), &mut diagnostics).unwrap();

        let weights = chunk.bone_weights.unwrap();
        let bones = chunk.bone_indices.unwrap();
        assert_eq!(&weights[8..12], &[0.5, 0.5, 0.0, 0.0]);
        assert_eq!(&bones[4..8], &[1, 0, 0, 0]);
    }
}
