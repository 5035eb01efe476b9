//! Combining skin skeletons into one canonical skeleton
//!
//! Every skin controller yields its own skeleton. Before animation can drive
//! all skinned meshes at once those skeletons are folded into a single bone
//! list (deduplicated with [`same_bone`]), completed with the missing
//! ancestor bones, sorted so parents precede children, and checked.

use super::bone::{Bone, same_bone};
use super::Skeleton;
use crate::error::{Result, RigError};
use crate::scene::SceneGraph;

/// Incremental skeleton merge
///
/// Each [`add`](Self::add) returns the remap from the added skeleton's bone
/// indices to merged bone indices, which is what skin joint indices need to
/// be rewritten with.
#[derive(Debug, Default)]
pub struct SkeletonMerger {
    bones: Vec<Bone>,
}

impl SkeletonMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge all bones of `skeleton`
    pub fn add(&mut self, skeleton: &Skeleton) -> Vec<usize> {
        let remap: Vec<usize> = skeleton
            .bones()
            .iter()
            .map(|bone| merge_bone(&mut self.bones, bone))
            .collect();

        // Parents are resolved once the whole skeleton is in, since joints may
        // be listed before their parents.
        for (index, bone) in skeleton.bones().iter().enumerate() {
            if let Some(parent) = bone.parent {
                let merged = &mut self.bones[remap[index]];
                if merged.parent.is_none() {
                    merged.parent = Some(remap[parent]);
                }
            }
        }

        log::debug!(
            "merged {} bones, skeleton now has {}",
            skeleton.bone_count(),
            self.bones.len()
        );
        remap
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn finish(self) -> Skeleton {
        Skeleton::new(self.bones)
    }
}

/// Insert `bone` into `bones` unless an equal bone is present; returns its index
fn merge_bone(bones: &mut Vec<Bone>, bone: &Bone) -> usize {
    if let Some(index) = bones.iter().position(|b| same_bone(b, bone)) {
        bones[index].merge(bone);
        return index;
    }
    let mut copy = bone.clone();
    copy.parent = None;
    bones.push(copy);
    bones.len() - 1
}

/// Merge two skeletons into one bone list, `a`'s bones first
pub fn merge_skeletons(a: &Skeleton, b: &Skeleton) -> Skeleton {
    let mut merger = SkeletonMerger::new();
    merger.add(a);
    merger.add(b);
    merger.finish()
}

/// Add a bone for every scene node between a bone and its scene root
///
/// Missing ancestors are created unskinned and appended; bones without a bone
/// parent are linked to the bone of their parent node. Returns the number of
/// bones added.
pub fn add_bone_parents(skeleton: &mut Skeleton, graph: &SceneGraph) -> Result<usize> {
    let bones = skeleton.bones_mut();
    let initial = bones.len();

    let mut index = 0;
    while index < bones.len() {
        if bones.len() > initial + graph.nodes().len() {
            return Err(RigError::CyclicHierarchy(format!(
                "node {} while adding parents",
                bones[index].node
            )));
        }
        if let Some(parent_node) = graph.parent_of(bones[index].node)? {
            let parent_index = match bones.iter().position(|b| b.node == parent_node) {
                Some(found) => found,
                None => {
                    let parent = Bone::from_node(graph, parent_node)?;
                    log::trace!("adding parent bone '{}' ({parent_node})", parent.name);
                    bones.push(parent);
                    bones.len() - 1
                }
            };
            if bones[index].parent.is_none() {
                bones[index].parent = Some(parent_index);
            }
        }
        index += 1;
    }

    Ok(bones.len() - initial)
}

/// Reorder bones so that every parent precedes its children
///
/// Bones are grouped by depth; within a depth level siblings are grouped by
/// the new position of their parent, and ties keep the original order.
/// Returns the permutation mapping old bone indices to new ones.
pub fn sort_bones(skeleton: &mut Skeleton) -> Result<Vec<usize>> {
    let count = skeleton.bone_count();
    let depths = (0..count)
        .map(|i| skeleton.bone_depth(i))
        .collect::<Result<Vec<_>>>()?;
    let max_depth = depths.iter().copied().max().unwrap_or(0);

    let mut order: Vec<usize> = Vec::with_capacity(count);
    let mut new_index = vec![usize::MAX; count];
    for depth in 0..=max_depth {
        let mut level: Vec<usize> = (0..count).filter(|&i| depths[i] == depth).collect();
        level.sort_by_key(|&i| {
            let parent_position = skeleton.bones()[i].parent.map_or(0, |p| new_index[p]);
            (parent_position, i)
        });
        for i in level {
            new_index[i] = order.len();
            order.push(i);
        }
    }

    let old_bones = std::mem::take(skeleton.bones_mut());
    let mut slots: Vec<Option<Bone>> = old_bones.into_iter().map(Some).collect();
    let mut sorted = Vec::with_capacity(count);
    for &old in &order {
        if let Some(mut bone) = slots[old].take() {
            bone.parent = bone.parent.map(|p| new_index[p]);
            sorted.push(bone);
        }
    }
    *skeleton.bones_mut() = sorted;

    if let Some((bone, parent)) = first_unsorted(skeleton) {
        return Err(RigError::UnsortedBones { bone, parent });
    }
    Ok(new_index)
}

fn first_unsorted(skeleton: &Skeleton) -> Option<(usize, usize)> {
    skeleton
        .bones()
        .iter()
        .enumerate()
        .find_map(|(i, b)| b.parent.filter(|&p| p >= i).map(|p| (i, p)))
}

/// True when no bone appears before its parent
pub fn bones_sorted(skeleton: &Skeleton) -> bool {
    first_unsorted(skeleton).is_none()
}

/// Verify the structural invariants of a skeleton
///
/// Fails on duplicate bones, on parent indices outside the skeleton, and on
/// bones with a bone parent whose node is a scene root.
pub fn check_consistency(skeleton: &Skeleton, graph: &SceneGraph) -> Result<()> {
    let bones = skeleton.bones();
    for (i, a) in bones.iter().enumerate() {
        for (j, b) in bones.iter().enumerate().skip(i + 1) {
            if same_bone(a, b) {
                return Err(RigError::DuplicateBone {
                    first: i,
                    second: j,
                    name: a.name.clone(),
                });
            }
        }
    }

    for (i, bone) in bones.iter().enumerate() {
        let Some(parent) = bone.parent else {
            continue;
        };
        if parent >= bones.len() {
            return Err(RigError::MissingParent { bone: i, parent });
        }
        if graph.parent_of(bone.node)?.is_none() {
            return Err(RigError::OrphanedBoneParent {
                bone: i,
                name: bone.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeId, SceneNode};
    use glam::{Mat4, Vec3};

    // root(1) -> pelvis(2) -> spine(3) -> arm(4)
    //                      -> leg(5)
    fn graph() -> SceneGraph {
        SceneGraph::new(vec![
            SceneNode::new(1, "root", None, Mat4::IDENTITY),
            SceneNode::new(2, "pelvis", Some(1), Mat4::from_translation(Vec3::Y)),
            SceneNode::new(3, "spine", Some(2), Mat4::from_translation(Vec3::Y)),
            SceneNode::new(4, "arm", Some(3), Mat4::from_translation(Vec3::X)),
            SceneNode::new(5, "leg", Some(2), Mat4::from_translation(-Vec3::Y)),
        ])
    }

    fn skinned(graph: &SceneGraph, id: u32) -> Bone {
        let mut bone = Bone::from_node(graph, NodeId(id)).unwrap();
        bone.skinned = true;
        bone
    }

    #[test]
    fn test_merge_with_itself_deduplicates() {
        let graph = graph();
        let mut arm = skinned(&graph, 4);
        let spine = skinned(&graph, 3);
        arm.parent = Some(1);
        let skeleton = Skeleton::new(vec![arm, spine]);

        let merged = merge_skeletons(&skeleton, &skeleton);
        assert_eq!(merged.bone_count(), skeleton.bone_count());
        assert_eq!(merged.bones()[0].parent, Some(1));
    }

    #[test]
    fn test_merger_remaps_shared_bones() {
        let graph = graph();
        let a = Skeleton::new(vec![skinned(&graph, 3), skinned(&graph, 4)]);
        let mut leg = skinned(&graph, 5);
        leg.skinned = false;
        let b = Skeleton::new(vec![leg, skinned(&graph, 3)]);

        let mut merger = SkeletonMerger::new();
        assert_eq!(merger.add(&a), vec![0, 1]);
        assert_eq!(merger.add(&b), vec![2, 0]);
        let merged = merger.finish();
        assert_eq!(merged.bone_count(), 3);
        assert!(!merged.bones()[2].skinned);
    }

    #[test]
    fn test_merge_keeps_distinct_bind_matrices() {
        let graph = graph();
        let a = skinned(&graph, 3);
        let mut b = a.clone();
        b.inv_bind_matrix[13] += 1.0;

        let merged = merge_skeletons(&Skeleton::new(vec![a]), &Skeleton::new(vec![b]));
        assert_eq!(merged.bone_count(), 2);
    }

    #[test]
    fn test_add_bone_parents_closes_hierarchy() {
        let graph = graph();
        let mut skeleton = Skeleton::new(vec![skinned(&graph, 4), skinned(&graph, 5)]);

        let added = add_bone_parents(&mut skeleton, &graph).unwrap();
        assert_eq!(added, 3);
        assert_eq!(skeleton.bone_count(), 5);

        for bone in skeleton.bones() {
            let node_parent = graph.parent_of(bone.node).unwrap();
            let bone_parent = bone.parent.map(|p| skeleton.bones()[p].node);
            assert_eq!(node_parent, bone_parent);
        }
        let synthesized = &skeleton.bones()[skeleton.find_bone_by_node(NodeId(1)).unwrap()];
        assert!(!synthesized.skinned);
    }

    #[test]
    fn test_sort_after_add_parents() {
        let graph = graph();
        let mut skeleton = Skeleton::new(vec![skinned(&graph, 4), skinned(&graph, 5)]);
        add_bone_parents(&mut skeleton, &graph).unwrap();
        assert!(!bones_sorted(&skeleton));

        let permutation = sort_bones(&mut skeleton).unwrap();
        assert!(bones_sorted(&skeleton));
        assert_eq!(permutation.len(), 5);

        let names: Vec<_> = skeleton.bones().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["root", "pelvis", "leg", "spine", "arm"]);
        assert_eq!(skeleton.bones()[permutation[0]].name, "arm");
        assert_eq!(skeleton.bones()[permutation[1]].name, "leg");
        check_consistency(&skeleton, &graph).unwrap();
    }

    #[test]
    fn test_sort_keeps_sibling_order() {
        let graph = graph();
        let mut skeleton = Skeleton::from_node(&graph, NodeId(1)).unwrap();
        let before = skeleton.clone();
        let permutation = sort_bones(&mut skeleton).unwrap();
        // pelvis has children spine and leg; depth order moves leg before arm
        assert_eq!(permutation, vec![0, 1, 2, 4, 3]);
        assert_eq!(skeleton.bones()[3].node, before.bones()[4].node);
    }

    #[test]
    fn test_check_consistency_duplicate() {
        let graph = graph();
        let bone = skinned(&graph, 3);
        let skeleton = Skeleton::new(vec![bone.clone(), bone]);
        assert!(matches!(
            check_consistency(&skeleton, &graph),
            Err(RigError::DuplicateBone {
                first: 0,
                second: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_check_consistency_orphaned_parent() {
        let graph = graph();
        let mut root = skinned(&graph, 1);
        root.parent = Some(1);
        let skeleton = Skeleton::new(vec![root, skinned(&graph, 2)]);
        assert!(matches!(
            check_consistency(&skeleton, &graph),
            Err(RigError::OrphanedBoneParent { bone: 0, .. })
        ));
    }

    #[test]
    fn test_check_consistency_missing_parent() {
        let graph = graph();
        let mut spine = skinned(&graph, 3);
        spine.parent = Some(7);
        let skeleton = Skeleton::new(vec![spine]);
        assert!(matches!(
            check_consistency(&skeleton, &graph),
            Err(RigError::MissingParent { bone: 0, parent: 7 })
        ));
    }
}
