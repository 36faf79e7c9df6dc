// ---------------------------------------------------------------------------
// file_header: fixed header in front of every stored snapshot
// ---------------------------------------------------------------------------
//
// Header format (28 bytes, little-endian):
//   [0..4]   Magic bytes: "GSAV"
//   [4..8]   Header format version (u32)
//   [8..12]  Flags (u32: bit 0 = LZ4-compressed payload)
//   [12..20] Timestamp (Unix epoch, u64)
//   [20..24] Encoded snapshot size before compression (u32)
//   [24..28] xxHash32 checksum of the payload (everything after the header)
//
// Unlike older save formats there is no headerless fallback: bytes that do
// not start with the magic are rejected.

use xxhash_rust::xxh32::xxh32;

use crate::save_error::SaveError;

pub const MAGIC: [u8; 4] = *b"GSAV";

pub const HEADER_SIZE: usize = 28;

/// Layout version of the header itself, independent of the snapshot version.
pub const HEADER_FORMAT_VERSION: u32 = 1;

pub const FLAG_COMPRESSED: u32 = 1;

const XXHASH_SEED: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Prepend a header to `payload`.
pub fn wrap_with_header(payload: &[u8], flags: u32, timestamp: u64, uncompressed_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&HEADER_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&timestamp.to_le_bytes());
    out.extend_from_slice(&(uncompressed_size as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(payload, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

/// Validate the header and return it with the payload that follows.
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), SaveError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(SaveError::Decode("not a graph save file (bad magic)".to_string()));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::Decode(format!(
            "save file is too short ({} bytes, need at least {} for the header)",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&bytes[12..20]);
    let header = FileHeader {
        format_version: le_u32(bytes, 4),
        flags: le_u32(bytes, 8),
        timestamp: u64::from_le_bytes(ts),
        uncompressed_size: le_u32(bytes, 20),
        checksum: le_u32(bytes, 24),
    };

    if header.format_version > HEADER_FORMAT_VERSION {
        return Err(SaveError::Decode(format!(
            "save file uses header format version {}, but this build only supports up to {}",
            header.format_version, HEADER_FORMAT_VERSION
        )));
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != header.checksum {
        return Err(SaveError::Decode(format!(
            "save file is corrupted: checksum mismatch (expected {:#010X}, got {:#010X})",
            header.checksum, computed
        )));
    }
    Ok((header, payload))
}
