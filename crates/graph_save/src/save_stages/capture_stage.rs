use bevy::prelude::*;

use crate::custom_capture::{capture, CaptureOptions};
use crate::host_world::{HostWorld, ObjectId};
use crate::property_codec::EncodeContext;
use crate::save_types::PropertyMaps;

use super::graph_state::SaveGraph;

/// Capture every tracked actor (globals first), then every dynamic object
/// until no capture discovers a new one.
///
/// Actor captures may append dynamic objects; object captures may append
/// more. The lists only grow, so the loop ends once both cursors catch up.
pub fn capture_stage(world: &mut dyn HostWorld, graph: &mut SaveGraph) {
    let elapsed = world.elapsed_time();

    for global in [true, false] {
        for slot in 0..graph.actors(global).len() {
            capture_actor(world, graph, global, slot, elapsed);
        }
    }

    let mut cursors = [0usize; 2];
    loop {
        let mut progressed = false;
        for (list, global) in [true, false].into_iter().enumerate() {
            while cursors[list] < graph.objects(global).len() {
                capture_object(world, graph, global, cursors[list], elapsed);
                cursors[list] += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
}

fn capture_actor(world: &mut dyn HostWorld, graph: &mut SaveGraph, global: bool, slot: usize, elapsed: f64) {
    let index = graph.actors(global)[slot].custom.object_index;
    let Some(actor) = graph.registry.resolve(index, global) else {
        error!("Actor record {} has no live object", index);
        return;
    };

    let transform = world.actor_transform(actor);
    let props = capture_record(world, graph, actor, elapsed);
    {
        let record = &mut graph.actors_mut(global)[slot];
        record.transform = transform;
        record.custom.properties = props;
    }

    let component_count = graph.actors(global)[slot].components.len();
    for c in 0..component_count {
        let index = graph.actors(global)[slot].components[c].custom.object_index;
        let Some(component) = graph.registry.resolve(index, global) else {
            continue;
        };
        let relative = world.relative_transform(component);
        let props = capture_record(world, graph, component, elapsed);
        let record = &mut graph.actors_mut(global)[slot].components[c];
        record.transform = relative;
        record.custom.properties = props;
    }
}

fn capture_object(world: &mut dyn HostWorld, graph: &mut SaveGraph, global: bool, slot: usize, elapsed: f64) {
    let index = graph.objects(global)[slot].object_index;
    let Some(object) = graph.registry.resolve(index, global) else {
        error!("Object record {} has no live object", index);
        return;
    };
    let props = capture_record(world, graph, object, elapsed);
    graph.objects_mut(global)[slot].properties = props;
}

fn capture_record(
    world: &mut dyn HostWorld,
    graph: &mut SaveGraph,
    object: ObjectId,
    elapsed: f64,
) -> PropertyMaps {
    let props = {
        let mut cx = EncodeContext::with_refs(elapsed, &mut *graph);
        capture(world, object, &CaptureOptions::default(), &mut cx)
    };

    for asset in world.custom_assets_to_load(object) {
        let preload = world
            .class_of(asset)
            .map(|class| world.schema().kind_of(&class).is_preload_asset())
            .unwrap_or(false);
        if preload {
            graph.add_asset(world.object_path(asset));
        }
    }
    props
}
