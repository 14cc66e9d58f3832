//! Bus-data entry bodies.
//!
//! After the timestamp, the layout depends on the interface behind the entry's source
//! address. Each handler reads only from the body cursor it is given, which ends where the
//! entry's declared size ends.

use super::address::InterfaceType;
use super::dispatch::EntryHeader;
use super::tables::{CAN_ID, FLEXRAY_ERRORS, LIN_PID};
use super::walker::WalkCtx;
use super::StepError;
use crate::bitfield::emit_word;
use crate::cursor::{ByteCursor, Endianness};
use crate::field::FieldSink;
use crate::value::FieldValue;

/// FlexRay frame variants, taken from status bits 2..0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexRayFrameKind {
    Regular,
    Aborted,
    ZeroPulse,
    OnePulse,
    ErrorInformation,
    Unknown(u8),
}

impl FlexRayFrameKind {
    pub fn from_status(status: u16) -> Self {
        match (status & 0x7) as u8 {
            0 => FlexRayFrameKind::Regular,
            1 => FlexRayFrameKind::Aborted,
            2 => FlexRayFrameKind::ZeroPulse,
            3 => FlexRayFrameKind::OnePulse,
            4 => FlexRayFrameKind::ErrorInformation,
            other => FlexRayFrameKind::Unknown(other),
        }
    }
}

pub(crate) fn dissect_bus_data(
    header: &EntryHeader,
    body: &mut ByteCursor<'_>,
    sink: &mut dyn FieldSink,
    ctx: &WalkCtx<'_>,
) -> Result<(), StepError> {
    read_timestamp(header, body, sink)?;
    match header.source.interface_type() {
        InterfaceType::Ethernet => ethernet(body, sink, ctx),
        InterfaceType::Can => can(body, sink),
        InterfaceType::Lin => lin(body, sink),
        InterfaceType::FlexRay => flexray(header, body, sink),
        InterfaceType::Unsupported => Ok(()),
    }
}

fn read_timestamp(header: &EntryHeader, body: &mut ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(), StepError> {
    if header.compressed_timestamp() {
        let range = body.range_ahead(4);
        let ns = body.read_u32(Endianness::Little)?;
        sink.add_field("ttl.entry.timestamp_offset", range, FieldValue::TimeRelative(ns as i64));
    } else {
        let range = body.range_ahead(8);
        let ns = body.read_u64(Endianness::Little)?;
        sink.add_field("ttl.entry.timestamp", range, FieldValue::TimeAbsolute(ns));
    }
    Ok(())
}

fn ethernet(body: &mut ByteCursor<'_>, sink: &mut dyn FieldSink, ctx: &WalkCtx<'_>) -> Result<(), StepError> {
    if body.is_empty() {
        return Ok(());
    }
    let frame = body.rest();
    let node = sink.open_valued("ttl.eth.frame", frame.window(), FieldValue::Bytes);
    if let Some(eth) = ctx.subs.get("eth") {
        eth.dissect(frame, sink)?;
    }
    sink.close_subtree(node)?;
    Ok(())
}

fn can(body: &mut ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(), StepError> {
    let range = body.range_ahead(4);
    let id = body.read_u32(Endianness::Little)?;
    let node = emit_word(sink, "ttl.can.id", range, FieldValue::UInt32(id), id as u64, CAN_ID)?;
    sink.append_text(node, &format!("{:#x}", id & 0x1FFF_FFFF));
    if !body.is_empty() {
        let data = body.rest();
        let node = sink.add_field("ttl.can.data", data.window(), FieldValue::Bytes);
        sink.append_text(node, &format!("{} bytes", data.capacity()));
    }
    Ok(())
}

fn lin(body: &mut ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(), StepError> {
    let range = body.range_ahead(1);
    let pid = body.read_u8()?;
    emit_word(sink, "ttl.lin.pid", range, FieldValue::UInt8(pid), pid as u64, LIN_PID)?;
    // The checksum byte is only present behind at least one data byte.
    match body.remaining() {
        0 => {}
        1 => {
            let data = body.rest();
            sink.add_field("ttl.lin.data", data.window(), FieldValue::Bytes);
        }
        n => {
            let data = body.sub_slice(n - 1)?;
            sink.add_field("ttl.lin.data", data.window(), FieldValue::Bytes);
            let range = body.range_ahead(1);
            let checksum = body.read_u8()?;
            sink.add_field("ttl.lin.checksum", range, FieldValue::UInt8(checksum));
        }
    }
    Ok(())
}

fn flexray(header: &EntryHeader, body: &mut ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(), StepError> {
    match FlexRayFrameKind::from_status(header.status) {
        FlexRayFrameKind::Regular | FlexRayFrameKind::Aborted => {
            let range = body.range_ahead(2);
            let frame_id = body.read_u16(Endianness::Little)?;
            sink.add_field("ttl.flexray.frame_id", range, FieldValue::UInt16(frame_id));
            let range = body.range_ahead(1);
            let cycle = body.read_u8()?;
            sink.add_field("ttl.flexray.cycle", range, FieldValue::UInt8(cycle));
            let range = body.range_ahead(2);
            let crc = body.read_u16(Endianness::Little)?;
            sink.add_field("ttl.flexray.header_crc", range, FieldValue::UInt16(crc));
            if !body.is_empty() {
                let data = body.rest();
                sink.add_field("ttl.flexray.data", data.window(), FieldValue::Bytes);
            }
        }
        FlexRayFrameKind::ZeroPulse | FlexRayFrameKind::OnePulse => {
            let range = body.range_ahead(2);
            let len = body.read_u16(Endianness::Little)?;
            sink.add_field("ttl.flexray.pulse_length", range, FieldValue::UInt16(len));
        }
        FlexRayFrameKind::ErrorInformation => {
            let range = body.range_ahead(2);
            let flags = body.read_u16(Endianness::Little)?;
            emit_word(sink, "ttl.flexray.error", range, FieldValue::UInt16(flags), flags as u64, FLEXRAY_ERRORS)?;
        }
        FlexRayFrameKind::Unknown(_) => {}
    }
    Ok(())
}
