//! Entry kind selection.
//!
//! The kind nibble picks exactly one body handler. Only bus data has a known body layout;
//! every other kind, and any unknown nibble, is a terminal variant that reads nothing and
//! leaves the body to be reported as unparsed.

use super::address::{read_address, Address};
use super::bus::dissect_bus_data;
use super::tables::{status_table, META1, META2, TYPE_SIZE};
use super::walker::WalkCtx;
use super::StepError;
use crate::bitfield::emit_word;
use crate::cursor::{ByteCursor, Endianness};
use crate::field::FieldSink;
use crate::value::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    BusData,
    Command,
    Journal,
    SegmentedMessage,
    SendFrame,
    Padding,
    SoftwareData,
    DroppedFrames,
    Unknown(u8),
}

impl EntryKind {
    pub fn from_nibble(n: u8) -> Self {
        match n & 0x0F {
            0 => EntryKind::BusData,
            1 => EntryKind::Command,
            2 => EntryKind::Journal,
            3 => EntryKind::SegmentedMessage,
            4 => EntryKind::SendFrame,
            5 => EntryKind::Padding,
            6 => EntryKind::SoftwareData,
            7 => EntryKind::DroppedFrames,
            other => EntryKind::Unknown(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::BusData => "Bus Data",
            EntryKind::Command => "Command",
            EntryKind::Journal => "Journal",
            EntryKind::SegmentedMessage => "Segmented Message",
            EntryKind::SendFrame => "Send Frame",
            EntryKind::Padding => "Padding",
            EntryKind::SoftwareData => "Software Data",
            EntryKind::DroppedFrames => "Dropped Frames",
            EntryKind::Unknown(_) => "Unknown",
        }
    }
}

/// Splits the first entry word into kind and declared size.
pub fn split_type_size(word: u16) -> (EntryKind, usize) {
    (EntryKind::from_nibble((word >> 12) as u8), (word & 0x0FFF) as usize)
}

/// Decoded 12-byte entry header.
#[derive(Debug, Clone, Copy)]
pub struct EntryHeader {
    pub kind: EntryKind,
    pub size: usize,
    pub meta1: u16,
    pub destination: Address,
    pub meta2: u16,
    pub source: Address,
    pub status: u16,
}

impl EntryHeader {
    pub fn compressed_timestamp(&self) -> bool {
        self.meta1 & 0x0002 != 0
    }
}

/// Emits the kind/size word. Separate from the rest of the header so that a too-short entry
/// still gets it.
pub(crate) fn read_type_size(
    cur: &mut ByteCursor<'_>,
    sink: &mut dyn FieldSink,
) -> Result<(EntryKind, usize), StepError> {
    let range = cur.range_ahead(2);
    let word = cur.read_u16(Endianness::Little)?;
    emit_word(sink, "ttl.entry.type_size", range, FieldValue::UInt16(word), word as u64, TYPE_SIZE)?;
    Ok(split_type_size(word))
}

/// Emits the remaining ten header bytes.
pub(crate) fn read_header_rest(
    cur: &mut ByteCursor<'_>,
    sink: &mut dyn FieldSink,
    kind: EntryKind,
    size: usize,
) -> Result<EntryHeader, StepError> {
    let range = cur.range_ahead(2);
    let meta1 = cur.read_u16(Endianness::Little)?;
    emit_word(sink, "ttl.entry.meta1", range, FieldValue::UInt16(meta1), meta1 as u64, META1)?;

    let destination = read_address(cur, sink, "ttl.entry.dst")?;

    let range = cur.range_ahead(2);
    let meta2 = cur.read_u16(Endianness::Little)?;
    emit_word(sink, "ttl.entry.meta2", range, FieldValue::UInt16(meta2), meta2 as u64, META2)?;

    let source = read_address(cur, sink, "ttl.entry.src")?;

    // Status bits are laid out per interface, which the source address has just told us.
    let range = cur.range_ahead(2);
    let status = cur.read_u16(Endianness::Little)?;
    let table = status_table(source.interface_type());
    emit_word(sink, "ttl.entry.status", range, FieldValue::UInt16(status), status as u64, table)?;

    Ok(EntryHeader { kind, size, meta1, destination, meta2, source, status })
}

/// Runs the body handler for the entry kind. `body` is bounded to the entry's declared size
/// minus its header.
pub(crate) fn dispatch_entry(
    header: &EntryHeader,
    body: &mut ByteCursor<'_>,
    sink: &mut dyn FieldSink,
    ctx: &WalkCtx<'_>,
) -> Result<(), StepError> {
    match header.kind {
        EntryKind::BusData => dissect_bus_data(header, body, sink, ctx),
        EntryKind::Command
        | EntryKind::Journal
        | EntryKind::SegmentedMessage
        | EntryKind::SendFrame
        | EntryKind::Padding
        | EntryKind::SoftwareData
        | EntryKind::DroppedFrames
        | EntryKind::Unknown(_) => Ok(()),
    }
}
