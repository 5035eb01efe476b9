use criterion::{Criterion, criterion_group, criterion_main};
use dae_rig::animation::sample_animation;
use dae_rig::skinning::export_pose;
use dae_rig::{Animation, AnimationTrack, Bone, NodeId, Pose, Skeleton, SkeletonMatrices};
use std::hint::black_box;

const BONES: usize = 64;
const FRAMES: usize = 120;

/// A single chain of bones, every bone rotating about Z
fn create_test_rig() -> (Skeleton, Animation) {
    let bones = (0..BONES)
        .map(|i| {
            let mut bone = Bone::new(NodeId(i as u32), format!("bone{i}"));
            bone.parent = i.checked_sub(1);
            bone.bind_position = [0.0, 1.0, 0.0];
            bone
        })
        .collect();

    let tracks = (0..BONES)
        .map(|bone| {
            let rotation = (0..FRAMES)
                .flat_map(|f| {
                    let half = f as f32 / FRAMES as f32 * std::f32::consts::PI * 0.5;
                    [0.0, 0.0, half.sin(), half.cos()]
                })
                .collect();
            AnimationTrack {
                bone,
                rotation: Some(rotation),
                ..Default::default()
            }
        })
        .collect();

    let animation = Animation::new("wave", 30.0, FRAMES, tracks).unwrap();
    (Skeleton::new(bones), animation)
}

fn bench_sample(c: &mut Criterion) {
    let (skeleton, animation) = create_test_rig();
    let mut pose = Pose::new(BONES);

    c.bench_function("sample_animation", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame += 0.37;
            sample_animation(&animation, &skeleton, &mut pose, black_box(frame)).unwrap();
        })
    });
}

fn bench_sample_and_export(c: &mut Criterion) {
    let (skeleton, animation) = create_test_rig();
    let mut pose = Pose::new(BONES);
    let mut matrices = SkeletonMatrices::new(BONES);

    c.bench_function("sample_and_export_pose", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame += 0.37;
            sample_animation(&animation, &skeleton, &mut pose, black_box(frame)).unwrap();
            export_pose(&skeleton, &pose, &mut matrices).unwrap();
        })
    });
}

criterion_group!(benches, bench_sample, bench_sample_and_export);
criterion_main!(benches);
