// ---------------------------------------------------------------------------
// Save types: records, snapshot and version constants
// ---------------------------------------------------------------------------

mod records;
mod size;
mod snapshot;
mod version;

pub use records::*;
pub use size::*;
pub use snapshot::*;
pub use version::*;
