// ---------------------------------------------------------------------------
// Reflect: explicit per-class field tables
// ---------------------------------------------------------------------------
//
// The host registers a `ClassSchema` for every class it wants saved. The
// engine never inspects host memory; it reads and writes `FieldValue`s
// through `HostWorld::get_field` / `set_field`, driven by these tables.

mod field_type;
mod field_value;
mod schema_registry;

pub use field_type::*;
pub use field_value::*;
pub use schema_registry::*;
