use crate::host_world::HostWorld;
use crate::object_index::IndexRef;
use crate::save_types::SavedTransform;

use super::graph_state::SaveGraph;

/// Store each dynamic object's outer and each actor's attach parent as an
/// index into the global list, else the local list.
pub fn relation_stage(world: &dyn HostWorld, graph: &mut SaveGraph) {
    for global in [true, false] {
        for slot in 0..graph.objects(global).len() {
            let index = graph.objects(global)[slot].object_index;
            let outer = graph
                .registry
                .resolve(index, global)
                .and_then(|id| world.outer_of(id))
                .and_then(|outer| graph.registry.find(outer));
            let record = &mut graph.objects_mut(global)[slot];
            set_outer(&mut record.outer_object_index, &mut record.outer_is_global, outer);
        }
    }

    for global in [true, false] {
        for slot in 0..graph.actors(global).len() {
            let index = graph.actors(global)[slot].custom.object_index;
            let Some(actor) = graph.registry.resolve(index, global) else {
                continue;
            };
            let attachment = world.attach_parent(actor);
            let relative = world
                .root_component(actor)
                .map(|root| world.relative_transform(root))
                .unwrap_or(SavedTransform::IDENTITY);
            let parent_at = attachment
                .as_ref()
                .and_then(|(parent, _)| graph.registry.find(*parent));

            let record = &mut graph.actors_mut(global)[slot];
            match attachment {
                Some((_, socket)) => {
                    set_outer(
                        &mut record.custom.outer_object_index,
                        &mut record.custom.outer_is_global,
                        parent_at,
                    );
                    record.relative_transform = relative;
                    record.attach_socket = socket;
                }
                None => {
                    record.custom.outer_object_index = None;
                    record.attach_socket = None;
                }
            }
        }
    }
}

fn set_outer(index: &mut Option<u32>, is_global: &mut bool, found: Option<IndexRef>) {
    match found {
        Some(at) => {
            *index = Some(at.index);
            *is_global = at.global;
        }
        None => {
            *index = None;
            *is_global = false;
        }
    }
}
