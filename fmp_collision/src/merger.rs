//! Storing synthesized collision groups in a document.

use std::collections::BTreeMap;

use fmp_format::{
    Collider, ColliderInstance, CollisionGroup, CollisionGroupInstance, FmpDocument,
    HavokGroupParameters, Matrix,
};
use tracing::{debug, warn};

use crate::{Error, MeshOptions, Result, Synthesized};

/// Stores `group` in `doc` and places it on the object at `target`.
///
/// The group replaces the one the target already uses, or a group of the same
/// name, keeping its index. Otherwise it's appended. Every other object using
/// the index gets a rebuilt instance; the opaque per-collider values of its old
/// instance survive only if the old instance has the shape of the new tree.
///
/// Returns the index of the group.
///
/// # Errors
///
/// Returns `Err` if `target` isn't an object of `doc` or if the group index
/// can't be stored.
pub fn import(
    doc: &mut FmpDocument,
    target: usize,
    group: CollisionGroup,
    matrices: &BTreeMap<usize, Matrix>,
    flags: &BTreeMap<usize, Vec<MeshOptions>>,
) -> Result<usize> {
    let target_object = doc
        .objects
        .get(target)
        .ok_or(Error::ObjectNotInDocument(target))?;

    let existing = target_object
        .collision_instance
        .as_ref()
        .and_then(|instance| instance.collision_group_index)
        .map(usize::from)
        .filter(|&index| index < doc.collision_groups.len())
        .or_else(|| doc.find_collision_group(&group.name));

    let index = existing.unwrap_or(doc.collision_groups.len());
    // 0xFFFF marks an instance without a group
    let stored_index = u16::try_from(index)
        .ok()
        .filter(|&stored| stored != u16::MAX)
        .ok_or(Error::TooManyGroups(index + 1))?;

    if existing.is_some() {
        debug!(
            "replacing colliders of collision group {} `{}`",
            index, doc.collision_groups[index].name
        );
        doc.collision_groups[index].colliders = group.colliders;
    } else {
        debug!("appending collision group `{}`", group.name);
        doc.collision_groups.push(group);
    }

    let group = &doc.collision_groups[index];
    let fresh = build_instances(&group.colliders, matrices, flags);

    for (object_index, object) in doc.objects.iter_mut().enumerate() {
        if object_index == target {
            object.collision_instance = Some(CollisionGroupInstance {
                collision_group_index: Some(stored_index),
                i_02: 0,
                instances: fresh.clone(),
            });
            continue;
        }

        let instance = match &mut object.collision_instance {
            Some(instance) if instance.collision_group_index == Some(stored_index) => instance,
            _ => continue,
        };

        let mut instances = fresh.clone();
        match instance.check_matches(group) {
            Ok(()) => carry_over(&instance.instances, &mut instances),
            Err(mismatch) => warn!(
                "object `{}`: collision instance discarded, {}",
                object.name, mismatch
            ),
        }
        instance.instances = instances;
    }

    Ok(index)
}

/// [`import`] with the output of [`Synthesizer::synthesize`](crate::Synthesizer::synthesize).
///
/// # Errors
///
/// See [`import`].
pub fn import_synthesized(
    doc: &mut FmpDocument,
    target: usize,
    synthesized: Synthesized,
) -> Result<usize> {
    import(
        doc,
        target,
        synthesized.group,
        &synthesized.matrices,
        &synthesized.flags,
    )
}

/// Builds an instance tree for `colliders`, numbering colliders in pre-order.
#[must_use]
pub fn build_instances(
    colliders: &[Collider],
    matrices: &BTreeMap<usize, Matrix>,
    flags: &BTreeMap<usize, Vec<MeshOptions>>,
) -> Vec<ColliderInstance> {
    let mut index = 0;
    colliders
        .iter()
        .map(|collider| build_instance(collider, &mut index, matrices, flags))
        .collect()
}

fn build_instance(
    collider: &Collider,
    index: &mut usize,
    matrices: &BTreeMap<usize, Matrix>,
    flags: &BTreeMap<usize, Vec<MeshOptions>>,
) -> ColliderInstance {
    let own_index = *index;
    *index += 1;

    let mut instance =
        ColliderInstance::new(matrices.get(&own_index).copied().unwrap_or(Matrix::IDENTITY));

    if let Some(options) = flags.get(&own_index) {
        instance.parameters = options
            .iter()
            .enumerate()
            .map(|(group, options)| HavokGroupParameters {
                group: group as i32,
                param1: options.param1(),
                param2: options.param2(),
                i_12: 0,
            })
            .collect();
    }

    instance.children = collider
        .children
        .iter()
        .map(|child| build_instance(child, index, matrices, flags))
        .collect();

    instance
}

fn carry_over(old: &[ColliderInstance], new: &mut [ColliderInstance]) {
    for (old, new) in old.iter().zip(new) {
        new.i_00 = old.i_00;
        new.f_20 = old.f_20;
        carry_over(&old.children, &mut new.children);
    }
}
