// ---------------------------------------------------------------------------
// Snapshot version
// ---------------------------------------------------------------------------

/// Current snapshot layout version.
/// v1 = levels, global actors/objects, assets to load, save times
///
/// Snapshots newer than this are rejected on load. Older layouts are not
/// migrated.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;
