use crate::host_world::{HostWorld, ObjectId};
use crate::save_error::SaveError;

use super::graph_state::SaveGraph;

pub const TAG_GAME_INSTANCE: &str = "GameInstance";
pub const TAG_PLAYER_CONTROLLER: &str = "PlayerController";
pub const TAG_PLAYER_PAWN: &str = "PlayerPawn";
pub const TAG_GAME_STATE: &str = "GameState";

/// The four objects every save and restore requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveRoots {
    pub session: ObjectId,
    pub controller: ObjectId,
    pub avatar: ObjectId,
    pub game_state: ObjectId,
}

impl SaveRoots {
    pub fn require(world: &dyn HostWorld) -> Result<Self, SaveError> {
        let valid = |id: Option<ObjectId>, what: &'static str| {
            id.filter(|id| world.is_valid(*id))
                .ok_or(SaveError::MissingCollaborator(what))
        };
        Ok(Self {
            session: valid(world.session_object(), "session object")?,
            controller: valid(world.controller(), "controller")?,
            avatar: valid(world.avatar(), "avatar")?,
            game_state: valid(world.game_state(), "game state")?,
        })
    }
}

/// Register the well-known roots and the custom global tags.
pub fn collect_root_stage(world: &dyn HostWorld, graph: &mut SaveGraph, roots: &SaveRoots) {
    graph.add_object(world, roots.session, true, Some(TAG_GAME_INSTANCE.to_string()));
    graph.add_actor(world, roots.controller, true, Some(TAG_PLAYER_CONTROLLER.to_string()));
    graph.add_actor(world, roots.avatar, true, Some(TAG_PLAYER_PAWN.to_string()));
    graph.add_actor(world, roots.game_state, true, Some(TAG_GAME_STATE.to_string()));

    for (tag, actor) in world.custom_global_tags(roots.controller, roots.avatar) {
        graph.add_actor(world, actor, true, Some(tag));
    }
}
