//! Header-plus-blob interchange document
//!
//! Converted data is written as a JSON header (`<stem>.json`) describing
//! typed arrays stored in one little-endian binary blob (`<stem>.bin`).
//! Every array is addressed by an [`Accessor`]; array offsets are aligned to
//! 4 bytes.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::converter::Converted;
use crate::error::{Result, RigError};
use crate::geometry::{ChunkRange, GeometryChunk};

/// Format version written into every header
pub const DOCUMENT_VERSION: u32 = 1;

/// Element type of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    F32,
    I32,
    U32,
    U16,
    U8,
}

impl DataType {
    /// Size of one component in bytes
    pub fn size(self) -> usize {
        match self {
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::U16 => 2,
            Self::U8 => 1,
        }
    }
}

/// A typed array inside the binary blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessor {
    pub data_type: DataType,
    pub byte_offset: usize,
    /// Components per element
    pub stride: usize,
    /// Number of elements
    pub count: usize,
}

impl Accessor {
    pub fn byte_length(&self) -> usize {
        self.data_type.size() * self.stride * self.count
    }
}

/// Appends typed arrays to a little-endian blob
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    blob: Vec<u8>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self, data_type: DataType, stride: usize, len: usize) -> Accessor {
        while self.blob.len() % 4 != 0 {
            self.blob.push(0);
        }
        Accessor {
            data_type,
            byte_offset: self.blob.len(),
            stride,
            count: if stride == 0 { 0 } else { len / stride },
        }
    }

    pub fn push_f32(&mut self, values: &[f32], stride: usize) -> Result<Accessor> {
        let accessor = self.begin(DataType::F32, stride, values.len());
        for &value in values {
            self.blob.write_f32::<LittleEndian>(value)?;
        }
        Ok(accessor)
    }

    pub fn push_i32(&mut self, values: &[i32], stride: usize) -> Result<Accessor> {
        let accessor = self.begin(DataType::I32, stride, values.len());
        for &value in values {
            self.blob.write_i32::<LittleEndian>(value)?;
        }
        Ok(accessor)
    }

    pub fn push_u32(&mut self, values: &[u32], stride: usize) -> Result<Accessor> {
        let accessor = self.begin(DataType::U32, stride, values.len());
        for &value in values {
            self.blob.write_u32::<LittleEndian>(value)?;
        }
        Ok(accessor)
    }

    pub fn push_u16(&mut self, values: &[u16], stride: usize) -> Result<Accessor> {
        let accessor = self.begin(DataType::U16, stride, values.len());
        for &value in values {
            self.blob.write_u16::<LittleEndian>(value)?;
        }
        Ok(accessor)
    }

    pub fn push_u8(&mut self, values: &[u8], stride: usize) -> Result<Accessor> {
        let accessor = self.begin(DataType::U8, stride, values.len());
        self.blob.write_all(values)?;
        Ok(accessor)
    }

    pub fn len(&self) -> usize {
        self.blob.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.blob
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonHeader {
    pub bone_count: usize,
    pub names: Vec<String>,
    pub skinned: Vec<bool>,
    /// Parent bone index, -1 for roots
    pub parents: Accessor,
    /// Column-major 4x4 matrices
    pub inverse_bind_matrices: Accessor,
    pub bind_positions: Accessor,
    pub bind_rotations: Accessor,
    pub bind_scales: Accessor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackHeader {
    pub bone: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Accessor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationHeader {
    pub name: String,
    pub fps: f32,
    pub frame_count: usize,
    /// Animated tracks only; other bones hold their bind pose
    pub tracks: Vec<TrackHeader>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryHeader {
    pub name: String,
    pub vertex_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texcoords: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bone_weights: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bone_indices: Option<Accessor>,
    pub indices: Accessor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeHeader {
    pub name: String,
    pub first_vertex: usize,
    pub vertex_count: usize,
    pub first_index: usize,
    pub index_count: usize,
}

impl From<&ChunkRange> for RangeHeader {
    fn from(range: &ChunkRange) -> Self {
        Self {
            name: range.name.clone(),
            first_vertex: range.first_vertex,
            vertex_count: range.vertex_count,
            first_index: range.first_index,
            index_count: range.index_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedHeader {
    pub geometry: GeometryHeader,
    pub ranges: Vec<RangeHeader>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferHeader {
    /// File name of the blob, relative to the header; set when written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub byte_length: usize,
}

/// JSON header of an interchange document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub version: u32,
    pub skeleton: SkeletonHeader,
    pub animations: Vec<AnimationHeader>,
    pub geometries: Vec<GeometryHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<MergedHeader>,
    pub buffer: BufferHeader,
}

/// Header and blob of a converted asset
#[derive(Debug, Clone, PartialEq)]
pub struct InterchangeDocument {
    pub header: DocumentHeader,
    pub blob: Vec<u8>,
}

fn push_optional(builder: &mut DocumentBuilder, values: &Option<Vec<f32>>, stride: usize) -> Result<Option<Accessor>> {
    values
        .as_ref()
        .map(|values| builder.push_f32(values, stride))
        .transpose()
}

fn push_geometry(builder: &mut DocumentBuilder, chunk: &GeometryChunk) -> Result<GeometryHeader> {
    Ok(GeometryHeader {
        name: chunk.name.clone(),
        vertex_count: chunk.vertex_count,
        positions: push_optional(builder, &chunk.positions, 3)?,
        normals: push_optional(builder, &chunk.normals, 3)?,
        texcoords: push_optional(builder, &chunk.texcoords, 2)?,
        bone_weights: push_optional(builder, &chunk.bone_weights, 4)?,
        bone_indices: chunk
            .bone_indices
            .as_ref()
            .map(|indices| builder.push_u16(indices, 4))
            .transpose()?,
        indices: builder.push_u32(&chunk.indices, 3)?,
    })
}

impl InterchangeDocument {
    /// Lay out a conversion result as header plus blob
    pub fn from_converted(converted: &Converted) -> Result<Self> {
        let mut builder = DocumentBuilder::new();
        let bones = converted.skeleton.bones();

        let mut inverse_binds = Vec::with_capacity(bones.len() * 16);
        let mut positions = Vec::with_capacity(bones.len() * 3);
        let mut rotations = Vec::with_capacity(bones.len() * 4);
        let mut scales = Vec::with_capacity(bones.len() * 3);
        for bone in bones {
            inverse_binds.extend_from_slice(&bone.inv_bind_matrix);
            positions.extend_from_slice(&bone.bind_position);
            rotations.extend_from_slice(&bone.bind_rotation);
            scales.extend_from_slice(&bone.bind_scale);
        }

        let skeleton = SkeletonHeader {
            bone_count: bones.len(),
            names: bones.iter().map(|b| b.name.clone()).collect(),
            skinned: bones.iter().map(|b| b.skinned).collect(),
            parents: builder.push_i32(&converted.skeleton.parent_indices(), 1)?,
            inverse_bind_matrices: builder.push_f32(&inverse_binds, 16)?,
            bind_positions: builder.push_f32(&positions, 3)?,
            bind_rotations: builder.push_f32(&rotations, 4)?,
            bind_scales: builder.push_f32(&scales, 3)?,
        };

        let mut animations = Vec::with_capacity(converted.animations.len());
        for animation in &converted.animations {
            let mut tracks = Vec::new();
            for track in animation.tracks.iter().filter(|t| t.is_animated()) {
                tracks.push(TrackHeader {
                    bone: track.bone,
                    position: push_optional(&mut builder, &track.position, 3)?,
                    rotation: push_optional(&mut builder, &track.rotation, 4)?,
                    scale: push_optional(&mut builder, &track.scale, 3)?,
                });
            }
            animations.push(AnimationHeader {
                name: animation.name.clone(),
                fps: animation.fps,
                frame_count: animation.frame_count,
                tracks,
            });
        }

        let geometries = converted
            .chunks
            .iter()
            .map(|chunk| push_geometry(&mut builder, chunk))
            .collect::<Result<Vec<_>>>()?;

        let merged = match &converted.merged {
            Some(merged) => Some(MergedHeader {
                geometry: push_geometry(&mut builder, &merged.geometry)?,
                ranges: merged.ranges.iter().map(RangeHeader::from).collect(),
            }),
            None => None,
        };

        let blob = builder.finish();
        log::debug!("Interchange document: {} byte blob", blob.len());
        Ok(Self {
            header: DocumentHeader {
                version: DOCUMENT_VERSION,
                skeleton,
                animations,
                geometries,
                merged,
                buffer: BufferHeader {
                    uri: None,
                    byte_length: blob.len(),
                },
            },
            blob,
        })
    }

    pub fn header_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.header)?)
    }

    /// Write `<stem>.json` and `<stem>.bin` into `dir`
    ///
    /// Returns the paths of the header and the blob.
    pub fn write_to<P: AsRef<Path>>(&mut self, dir: P, stem: &str) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let bin_name = format!("{stem}.bin");
        self.header.buffer.uri = Some(bin_name.clone());
        let json_path = dir.join(format!("{stem}.json"));
        let bin_path = dir.join(bin_name);

        fs::write(&json_path, self.header_json()?)?;
        fs::write(&bin_path, &self.blob)?;
        log::info!(
            "Wrote {} and {}",
            json_path.display(),
            bin_path.display()
        );
        Ok((json_path, bin_path))
    }

    /// Read a document written by [`write_to`](Self::write_to)
    pub fn read_from<P: AsRef<Path>>(json_path: P) -> Result<Self> {
        let json_path = json_path.as_ref();
        let header: DocumentHeader = serde_json::from_str(&fs::read_to_string(json_path)?)?;
        if header.version != DOCUMENT_VERSION {
            return Err(RigError::InvalidDocument(format!(
                "unsupported version {}",
                header.version
            )));
        }
        let uri = header.buffer.uri.as_deref().ok_or_else(|| {
            RigError::InvalidDocument("header does not name its blob".to_string())
        })?;
        let blob = fs::read(json_path.with_file_name(uri))?;
        if blob.len() != header.buffer.byte_length {
            return Err(RigError::LengthMismatch {
                what: "document blob",
                expected: header.buffer.byte_length,
                actual: blob.len(),
            });
        }
        Ok(Self { header, blob })
    }

    fn bytes(&self, accessor: &Accessor, expected: DataType) -> Result<&[u8]> {
        if accessor.data_type != expected {
            return Err(RigError::InvalidDocument(format!(
                "accessor holds {:?}, read as {expected:?}",
                accessor.data_type
            )));
        }
        let end = accessor.byte_offset + accessor.byte_length();
        self.blob.get(accessor.byte_offset..end).ok_or_else(|| {
            RigError::InvalidDocument(format!(
                "accessor range {}..{end} outside {} byte blob",
                accessor.byte_offset,
                self.blob.len()
            ))
        })
    }

    pub fn read_f32(&self, accessor: &Accessor) -> Result<Vec<f32>> {
        let bytes = self.bytes(accessor, DataType::F32)?;
        let mut values = vec![0.0; bytes.len() / 4];
        Cursor::new(bytes).read_f32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    pub fn read_i32(&self, accessor: &Accessor) -> Result<Vec<i32>> {
        let bytes = self.bytes(accessor, DataType::I32)?;
        let mut values = vec![0; bytes.len() / 4];
        Cursor::new(bytes).read_i32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    pub fn read_u32(&self, accessor: &Accessor) -> Result<Vec<u32>> {
        let bytes = self.bytes(accessor, DataType::U32)?;
        let mut values = vec![0; bytes.len() / 4];
        Cursor::new(bytes).read_u32_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }

    pub fn read_u16(&self, accessor: &Accessor) -> Result<Vec<u16>> {
        let bytes = self.bytes(accessor, DataType::U16)?;
        let mut values = vec![0; bytes.len() / 2];
        Cursor::new(bytes).read_u16_into::<LittleEndian>(&mut values)?;
        Ok(values)
    }
}
