use crate::host_world::HostWorld;

use super::graph_state::SaveGraph;
use super::root_stage::SaveRoots;

/// Register the current level's custom local tags, then every save-capable
/// actor that wants saving and is not tracked yet.
pub fn collect_level_stage(world: &dyn HostWorld, graph: &mut SaveGraph, roots: &SaveRoots) {
    for (tag, actor) in world.custom_local_tags(roots.controller, roots.avatar) {
        graph.add_actor(world, actor, false, Some(tag));
    }

    for actor in world.save_capable_actors() {
        if world.is_pending_kill(actor) || graph.registry.contains(actor) {
            continue;
        }
        match world.save_traits(actor) {
            Some(traits) if traits.should_save => {
                graph.add_actor(world, actor, false, None);
            }
            _ => {}
        }
    }
}
