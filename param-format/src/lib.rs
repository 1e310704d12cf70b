//! Param-format: schema-driven codec for Param tabular binary files
//!
//! A Param file is a small header, a directory of `(entry_count, entry_size)`
//! pairs, and one payload per directory entry. Each payload is a run of
//! fixed-size records. The bytes of a record mean nothing on their own; an
//! external [`Schema`] supplies the field layout for every section.
//!
//! # Key Features
//!
//! - **Byte-exact round trip**: an unmodified file re-encodes to the same bytes,
//!   including reserved header bytes, unclaimed record bytes and trailing data
//! - **Local patching**: editing a field rewrites only the bytes it claims
//! - **Structural edits**: add/insert/remove entries, add/remove sections
//! - **Lenient loading**: unreadable input becomes an empty container
//!
//! # File Layout
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0x00 | 8 | magic (`PARAM\0\0\0`) |
//! | 0x08 | 4 | data pointer |
//! | 0x0C | 4 | unknown1 |
//! | 0x10 | 4 | section count |
//! | 0x14 | 8 | unknown2 (upper half is the record kind id) |
//! | 0x18 | 4 | record kind id |
//! | 0x1C | 4 | reserved |
//! | 0x20 | 8 × n | directory |
//! | data pointer | | section payloads, back to back |
//!
//! All integers are little-endian.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use param_format::{FieldDescriptor, FieldType, Layout, Param, SchemaMap};
//!
//! let mut schema = SchemaMap::new();
//! schema.insert_layout(0, 0, Layout::new(vec![FieldDescriptor::new("id", 0, 4, FieldType::U32)]));
//!
//! let mut param = Param::decode(b"not a param file", Arc::new(schema));
//! assert!(param.is_empty());
//! assert!(!param.load(b""));
//! ```

mod cursor;
mod entry;
mod error;
mod field;
mod param;
mod schema;
mod section;

pub use cursor::{
    patch, read_bool, read_bytes, read_clamped, read_cstring, read_i8, read_i16, read_i32,
    read_u8, read_u16, read_u32, write_fixed,
};
pub use entry::Entry;
pub use error::{ParamError, Result};
pub use field::{Field, FieldValue, Rgba};
pub use param::{read_directory, DirectoryEntry, Header, Param};
pub use schema::{EmptySchema, Enumeration, FieldDescriptor, FieldType, Layout, Schema, SchemaMap};
pub use section::Section;

// =============================================================================
// Constants
// =============================================================================

/// Param format magic
pub const PARAM_MAGIC: &[u8; 8] = b"PARAM\0\0\0";

/// Size of the fixed header, including the magic
pub const HEADER_SIZE: usize = 0x20;

/// Size of one `(entry_count, entry_size)` directory pair
pub const DIRECTORY_ENTRY_SIZE: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(PARAM_MAGIC.len(), 8);
        assert_eq!(HEADER_SIZE, 0x20);
        assert_eq!(DIRECTORY_ENTRY_SIZE, 8);
    }
}
