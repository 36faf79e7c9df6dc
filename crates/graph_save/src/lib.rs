pub mod custom_capture;
pub mod debug_compare;
pub mod host_world;
pub mod memory_world;
pub mod object_index;
pub mod property_codec;
pub mod reflect;
pub mod restore_pipeline;
mod save_config;
mod save_error;
pub mod save_helpers;
mod save_plugin;
mod save_session;
pub mod save_stages;
pub mod save_types;
pub mod store;


pub use host_world::{HostWorld, ObjectId, SaveTraits, StatusSink};
pub use memory_world::MemoryWorld;
pub use restore_pipeline::{RestoreOptions, RestorePipeline, RestoreReport, RestoreState};
pub use save_config::SaveConfig;
pub use save_error::SaveError;
pub use save_plugin::{
    ActiveRestore, GraphSavePlugin, LevelActivatedEvent, LevelChangeRequestEvent, LoadRequestEvent,
    LoadingStatus, NewGameRequestEvent, RestoreFinishedEvent, SaveLoadState, SaveRequestEvent,
};
pub use save_session::SaveSession;
pub use save_types::Snapshot;
pub use store::{FileStore, MemoryStore, SaveStore};
