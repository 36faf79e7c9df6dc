// ---------------------------------------------------------------------------
// Store: named slots holding encoded snapshots
// ---------------------------------------------------------------------------
//
// ## Stored bytes
//
// ```text
//   Snapshot --bitcode--> bytes --lz4 (optional)--> payload
//   [GSAV header: version, flags, timestamp, size, xxh32(payload)] ++ payload
// ```
//
// Load reverses it and then rejects snapshots newer than
// `CURRENT_SNAPSHOT_VERSION`. Both stores share `encode_snapshot` and
// `decode_snapshot`, so the in-memory store exercises the exact file format.

mod atomic_write;
mod file_header;
mod file_store;
mod memory_store;

pub use atomic_write::atomic_write;
pub use file_header::{FileHeader, FLAG_COMPRESSED, HEADER_FORMAT_VERSION, HEADER_SIZE, MAGIC};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use crate::save_error::SaveError;
use crate::save_types::{Snapshot, CURRENT_SNAPSHOT_VERSION};

use file_header::{unwrap_header, wrap_with_header};

/// Where snapshots live between sessions.
pub trait SaveStore: Send + Sync {
    fn save(&mut self, slot: &str, snapshot: &Snapshot) -> Result<(), SaveError>;
    /// `Ok(None)` when the slot is empty.
    fn load(&self, slot: &str) -> Result<Option<Snapshot>, SaveError>;
    fn exists(&self, slot: &str) -> bool;
    /// Returns false when there was nothing to delete.
    fn delete(&mut self, slot: &str) -> Result<bool, SaveError>;
    fn copy(&mut self, from: &str, to: &str) -> Result<(), SaveError>;
    /// Slot names, sorted.
    fn list_slots(&self) -> Result<Vec<String>, SaveError>;
}

/// Encode a snapshot into its stored form.
pub fn encode_snapshot(snapshot: &Snapshot, compress: bool) -> Vec<u8> {
    let encoded = snapshot.encode();
    let (payload, flags) = if compress {
        (lz4_flex::compress_prepend_size(&encoded), FLAG_COMPRESSED)
    } else {
        (encoded.clone(), 0)
    };
    wrap_with_header(&payload, flags, snapshot.timestamp, encoded.len())
}

/// Decode stored bytes, validating header, checksum and snapshot version.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, SaveError> {
    let (header, payload) = unwrap_header(bytes)?;
    let snapshot = if header.is_compressed() {
        let raw = lz4_flex::decompress_size_prepended(payload)
            .map_err(|e| SaveError::Decode(format!("LZ4 decompression failed: {e}")))?;
        Snapshot::decode(&raw)?
    } else {
        Snapshot::decode(payload)?
    };
    if snapshot.version > CURRENT_SNAPSHOT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected_max: CURRENT_SNAPSHOT_VERSION,
            found: snapshot.version,
        });
    }
    Ok(snapshot)
}
