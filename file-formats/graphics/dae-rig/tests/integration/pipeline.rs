//! End-to-end conversion of a small skinned arm scene

use std::path::PathBuf;

use dae_rig::animation::sample_animation;
use dae_rig::error::DataWarning;
use dae_rig::skinning::export_pose;
use dae_rig::stream::mat4_transform_point;
use dae_rig::{
    BoneMatrixTexture, Converted, Converter, ConverterOptions, Diagnostics, InterchangeDocument,
    Pose, SceneDescription, SkeletonMatrices,
};
use pretty_assertions::assert_eq;

fn scene_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/arm.json")
}

fn convert() -> (Converted, Diagnostics) {
    // Surfaces the converter's warn!/debug! output under RUST_LOG
    let _ = env_logger::builder().is_test(true).try_init();
    let scene = SceneDescription::load(scene_path()).expect("scene loads");
    let mut diagnostics = Diagnostics::new();
    let converted = Converter::new(ConverterOptions::default())
        .convert(&scene, &mut diagnostics)
        .expect("scene converts");
    (converted, diagnostics)
}

fn assert_close(actual: [f32; 3], expected: [f32; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
    }
}

#[test]
fn test_skeleton_is_completed_and_sorted() {
    let (converted, diagnostics) = convert();
    let skeleton = &converted.skeleton;

    let names: Vec<_> = skeleton.bones().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["scene_root", "shoulder", "elbow"]);
    assert_eq!(skeleton.parent_indices(), vec![-1, 0, 1]);
    let skinned: Vec<_> = skeleton.bones().iter().map(|b| b.skinned).collect();
    assert_eq!(skinned, vec![false, true, true]);

    assert_eq!(
        diagnostics.warnings(),
        &[DataWarning::NonTrianglePolygon {
            geometry: "arm".to_string(),
            vertices: 4
        }]
    );
}

#[test]
fn test_geometry_uses_final_bone_order() {
    let (converted, _) = convert();
    let chunk = &converted.chunks[0];

    assert_eq!(chunk.vertex_count, 4);
    assert_eq!(chunk.indices, vec![0, 1, 2, 0, 2, 3]);

    let bones = chunk.bone_indices.as_ref().unwrap();
    let weights = chunk.bone_weights.as_ref().unwrap();
    assert_eq!(&bones[0..4], &[1, 0, 0, 0]);
    assert_eq!(&bones[4..8], &[1, 2, 0, 0]);
    assert_eq!(&weights[4..8], &[0.5, 0.5, 0.0, 0.0]);
    assert_eq!(&bones[12..16], &[2, 0, 0, 0]);

    let merged = converted.merged.as_ref().unwrap();
    assert_eq!(merged.ranges.len(), 1);
    assert_eq!(merged.geometry.indices, chunk.indices);
}

#[test]
fn test_bind_pose_frame_gives_identity_skinning() {
    let (converted, _) = convert();
    let skeleton = &converted.skeleton;
    let bend = converted.animation("bend").unwrap();

    let mut pose = Pose::new(skeleton.bone_count());
    let mut matrices = SkeletonMatrices::new(skeleton.bone_count());
    sample_animation(bend, skeleton, &mut pose, 0.0).unwrap();
    export_pose(skeleton, &pose, &mut matrices).unwrap();

    for bone in 0..skeleton.bone_count() {
        let p = mat4_transform_point(&matrices.skin, bone * 16, [1.0, 1.5, 0.0]);
        assert_close(p, [1.0, 1.5, 0.0]);
    }
}

#[test]
fn test_bent_elbow_moves_forearm_vertex() {
    let (converted, _) = convert();
    let skeleton = &converted.skeleton;
    let bend = converted.animation("bend").unwrap();

    let mut pose = Pose::new(skeleton.bone_count());
    let mut matrices = SkeletonMatrices::new(skeleton.bone_count());
    sample_animation(bend, skeleton, &mut pose, 2.0).unwrap();
    export_pose(skeleton, &pose, &mut matrices).unwrap();

    // Vertex 3 sits half a unit above the elbow; a 90 degree bend about Z
    // swings it to the elbow's left
    let p = mat4_transform_point(&matrices.skin, 2 * 16, [1.0, 1.5, 0.0]);
    assert_close(p, [0.5, 1.0, 0.0]);

    // The shoulder does not move
    let p = mat4_transform_point(&matrices.skin, 16, [0.0, 1.0, 0.0]);
    assert_close(p, [0.0, 1.0, 0.0]);
}

#[test]
fn test_texture_upload() {
    let (converted, _) = convert();
    let skeleton = &converted.skeleton;

    let mut pose = Pose::new(skeleton.bone_count());
    dae_rig::animation::reset_pose(skeleton, &mut pose);
    let mut matrices = SkeletonMatrices::new(skeleton.bone_count());
    export_pose(skeleton, &pose, &mut matrices).unwrap();

    let mut texture = BoneMatrixTexture::new(skeleton.bone_count()).unwrap();
    assert_eq!(texture.size(), 4);
    texture.upload(&matrices).unwrap();
    assert_eq!(&texture.data()[..48], matrices.skin.as_slice());
}

#[test]
fn test_document_round_trip() {
    let (converted, _) = convert();
    let dir = tempfile::tempdir().unwrap();

    let mut document = InterchangeDocument::from_converted(&converted).unwrap();
    let (json, _) = document.write_to(dir.path(), "arm").unwrap();

    let loaded = InterchangeDocument::read_from(&json).unwrap();
    let header = &loaded.header;
    assert_eq!(header.skeleton.bone_count, 3);
    assert_eq!(loaded.read_i32(&header.skeleton.parents).unwrap(), vec![-1, 0, 1]);

    let bend = &header.animations[0];
    assert_eq!(bend.tracks.len(), 1);
    assert_eq!(bend.tracks[0].bone, 2);
    let rotation = loaded.read_f32(bend.tracks[0].rotation.as_ref().unwrap()).unwrap();
    assert_eq!(rotation.len(), 12);

    let merged = header.merged.as_ref().unwrap();
    assert_eq!(
        loaded.read_u32(&merged.geometry.indices).unwrap(),
        vec![0, 1, 2, 0, 2, 3]
    );
}

#[test]
fn test_options_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    std::fs::write(&path, r#"{ "fps_override": 30.0, "merge_chunks": false }"#).unwrap();

    let options = ConverterOptions::load(&path).unwrap();
    let scene = SceneDescription::load(scene_path()).unwrap();
    let converted = Converter::new(options)
        .convert(&scene, &mut Diagnostics::new())
        .unwrap();
    assert!(converted.merged.is_none());
    assert_eq!(converted.animations[0].fps, 30.0);
}
