// ---------------------------------------------------------------------------
// SaveError: fatal failures of save, load and restore operations
// ---------------------------------------------------------------------------
//
// Only structural problems live here. A single field that fails to decode is
// a `FieldIssue` (see `property_codec`), logged and skipped, never a
// `SaveError`.

use std::fmt;

/// Errors that abort a save, load or restore operation.
#[derive(Debug)]
pub enum SaveError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// Bitcode encoding failed.
    Encode(String),
    /// Bitcode decoding or header validation failed (corrupt or invalid save data).
    Decode(String),
    /// Snapshot version is newer than this build supports.
    VersionMismatch { expected_max: u32, found: u32 },
    /// The requested slot holds no save data.
    NoData,
    /// A required collaborator (session object, controller, avatar, game state) is absent.
    MissingCollaborator(&'static str),
    /// A save-capable actor vetoed saving.
    SaveBlocked { actor: String, reason: String },
    /// No level record exists for the level being restored and no level change is in progress.
    LevelDataMissing(String),
    /// A required well-known root has no record under its tag.
    MissingTaggedObject(String),
    /// A dynamic object's outer chain could not be resolved.
    UnresolvedOuter { name: String, class: String },
    /// An object index has no live object or no backing record.
    MissingRecord { index: u32, global: bool },
    /// An actor or object could not be spawned for a record.
    SpawnFailed { name: String, class: String },
    /// A record that should match an existing actor found none.
    ActorNotFound { name: String },
    /// An actor's saved attach parent did not resolve to a component.
    MissingAttachParent { name: String, index: u32 },
    /// Another save or restore is already in flight.
    Busy(&'static str),
    /// The slot name is empty after sanitising.
    InvalidSlotName(String),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "I/O error: {e}"),
            SaveError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            SaveError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            SaveError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: snapshot is v{found}, but this build only supports up to v{expected_max}"
            ),
            SaveError::NoData => write!(f, "No save data available to load"),
            SaveError::MissingCollaborator(what) => write!(f, "Missing required {what}"),
            SaveError::SaveBlocked { actor, reason } => {
                write!(f, "Saving is blocked by {actor}: {reason}")
            }
            SaveError::LevelDataMissing(level) => {
                write!(f, "No saved data for level \"{level}\"")
            }
            SaveError::MissingTaggedObject(tag) => {
                write!(f, "No saved record with tag \"{tag}\"")
            }
            SaveError::UnresolvedOuter { name, class } => write!(
                f,
                "Could not resolve the outer of \"{name}\" (class \"{class}\")"
            ),
            SaveError::MissingRecord { index, global } => write!(
                f,
                "No object at {} index {index}",
                if *global { "global" } else { "local" }
            ),
            SaveError::SpawnFailed { name, class } => {
                write!(f, "Failed to spawn \"{name}\" of class \"{class}\"")
            }
            SaveError::ActorNotFound { name } => {
                write!(f, "Failed to respawn or find actor \"{name}\"")
            }
            SaveError::MissingAttachParent { name, index } => {
                write!(f, "Failed to find attach parent {index} for \"{name}\"")
            }
            SaveError::Busy(what) => write!(f, "Cannot start: {what}"),
            SaveError::InvalidSlotName(slot) => write!(f, "Invalid save slot name \"{slot}\""),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<bitcode::Error> for SaveError {
    fn from(e: bitcode::Error) -> Self {
        SaveError::Decode(e.to_string())
    }
}
