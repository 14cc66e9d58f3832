//! # tracedissect: bounded dissection of trace logs and schema-described JSON
//!
//! Two dissection engines that share one output model: a tree of typed fields with absolute
//! byte ranges plus a list of diagnostics with stable codes.
//!
//! - **TTL** ([`ttl`]): a length-prefixed, variant-tagged binary vehicle-bus trace log
//!   (file header, blocks, entries, bus payloads). Every record level reads through a cursor
//!   bounded to its declared length, so malformed input yields diagnostics and an
//!   `unparsed` remainder, never a panic.
//! - **JSON+** ([`json`]): a JSON document walked against a [`schema::SchemaDictionary`] for
//!   typed rendering, enum labels, display hints, info summaries and optional external parser
//!   delegation.
//!
//! ## Building blocks
//!
//! - [`cursor::ByteCursor`]: bounds-checked little/big-endian reads over a borrowed buffer
//! - [`field::FieldSink`]: where walkers put fields; [`field::FieldTree`] keeps them,
//!   [`field::NullSink`] only checks nesting
//! - [`bitfield`]: packed-word tables and decoding
//! - [`dissector::SubDissector`]: capability for embedded payloads
//!
//! ## Usage
//!
//! ```no_run
//! use tracedissect::{Dissection, TtlDissector};
//!
//! let bytes = std::fs::read("trace.ttl").unwrap();
//! if let Dissection::Matched { tree, consumed } = TtlDissector::new().dissect(&bytes, 0).unwrap() {
//!     print!("{}", tracedissect::dump::render(&tree, &bytes));
//!     println!("{} bytes", consumed);
//! }
//! ```

pub mod bitfield;
pub mod cursor;
pub mod dissector;
pub mod dump;
pub mod field;
pub mod json;
pub mod profile;
pub mod schema;
pub mod ttl;
pub mod value;

pub use cursor::{ByteCursor, CursorError, Endianness};
pub use dissector::{Dissection, SubDissector, SubDissectors};
pub use field::{ByteRange, DiagCode, Diagnostic, EngineError, FieldNode, FieldSink, FieldTree, NodeId, NullSink, Severity};
pub use json::{JsonPlusDissector, JsonPlusOptions};
pub use profile::{get_walk_profile, reset_walk_profile};
pub use schema::{SchemaDictionary, SchemaError};
pub use ttl::{TtlDissector, TtlOptions};
pub use value::{FieldValue, SemanticType};
