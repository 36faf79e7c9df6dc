// ---------------------------------------------------------------------------
// Save Stages: the graph assembler, split into ordered stages
// ---------------------------------------------------------------------------
//
// One save pass threads a `SaveGraph` (index lists plus records) through a
// fixed sequence of stages. Each stage takes only what it needs.
//
// ## Pipeline overview
//
// ```text
//   HostWorld
//     |
//     +-- SaveRoots::require        -> fatal if a required root is missing
//     +-- check_save_blocked        -> fatal if any actor vetoes the save
//     +-- collect_root_stage        session object, controller, avatar,
//     |                             game state, custom global tags
//     +-- collect_level_stage       custom local tags, save-capable actors
//     +-- force_attach_parents      attach-parent components of tracked actors
//     +-- capture_stage             actor/component data, then dynamic
//     |                             objects discovered while encoding
//     +-- relation_stage            outers and attach parents by index
//     |
//     +---> build_snapshot(..) -> Snapshot
// ```
//
// Registration assigns indices in discovery order, so a record's
// `object_index` is only meaningful together with the snapshot it lives in.

mod assemble;
mod attach_parent_stage;
mod capture_stage;
mod graph_state;
mod level_stage;
mod relation_stage;
mod root_stage;

pub use assemble::*;
pub use attach_parent_stage::*;
pub use capture_stage::*;
pub use graph_state::*;
pub use level_stage::*;
pub use relation_stage::*;
pub use root_stage::*;
