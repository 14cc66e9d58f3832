//! TTL trace log dissection.
//!
//! A TTL file is a fixed prologue (`"TTL "`, version, block size, header size), a logfile
//! info region, an optional configuration blob (version 10 and later) and then trace data
//! split into blocks of `block_size` bytes. Each block packs entries; each entry starts with
//! a 12-byte header whose first word carries the entry kind (top nibble) and the entry's
//! declared size (low 12 bits). All integers are little-endian.
//!
//! ## Recovery
//!
//! The walker always advances by a record's *declared* size, never by what its handler
//! consumed, so one bad entry cannot shift the rest of its block. Bytes a handler leaves
//! unread show up as a `ttl.unparsed` field; nothing is dropped silently. A block or entry
//! that declares zero bytes ends its loop with a diagnostic instead of spinning.
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`walker`] | file, header, block and entry levels |
//! | [`dispatch`] | entry kind selection |
//! | [`address`] | 13-bit source/destination addresses and their function tables |
//! | [`bus`] | bus-data payloads (Ethernet, CAN, LIN, FlexRay) |
//! | [`tables`] | bitfield and label tables |

pub mod address;
pub mod bus;
pub mod dispatch;
pub mod tables;
pub mod walker;

pub use address::{Address, DeviceClass, FunctionInfo, InterfaceType};
pub use dispatch::EntryKind;
pub use walker::TtlDissector;

use crate::cursor::CursorError;
use crate::field::EngineError;

/// `"TTL "` as it appears on the wire.
pub const TTL_MAGIC: [u8; 4] = *b"TTL ";
/// Magic, version, block size, header size.
pub const PROLOGUE_SIZE: usize = 16;
/// Smallest header size that still holds the prologue.
pub const MIN_HEADER_SIZE: u32 = PROLOGUE_SIZE as u32;
/// Header sizes above this are treated as implausible.
pub const MAX_HEADER_SIZE: u32 = 1 << 20;
pub const LOGFILE_INFO_SIZE: usize = 160;
/// First file version carrying the configuration blob and a mandatory logfile info region.
pub const CONFIG_MIN_VERSION: u32 = 10;
/// Fixed entry header; also the smallest valid entry.
pub const ENTRY_HEADER_SIZE: usize = 12;

/// Runtime switches for the TTL walker.
#[derive(Debug, Clone, Default)]
pub struct TtlOptions {
    /// When set, an entry declaring fewer than [`ENTRY_HEADER_SIZE`] bytes ends its block
    /// instead of advancing by the declared size.
    pub resync_on_short_entry: bool,
}

impl TtlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resync_on_short_entry(mut self, on: bool) -> Self {
        self.resync_on_short_entry = on;
        self
    }
}

/// Failure of one walker step: either the engine is broken, or a read hit the end of the
/// region the step was given. The latter is recovered by the enclosing level.
#[derive(Debug, thiserror::Error)]
pub(crate) enum StepError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Bounds(#[from] CursorError),
}
