//! File, header, block and entry levels of the TTL walk.
//!
//! Each level gets a cursor bounded to the bytes its parent declared for it. Read failures
//! inside a level are turned into diagnostics by that level's caller; only
//! [`EngineError`]s leave [`TtlDissector::dissect`].

use super::dispatch::{dispatch_entry, read_header_rest, read_type_size, split_type_size, EntryKind};
use super::{
    StepError, TtlOptions, CONFIG_MIN_VERSION, ENTRY_HEADER_SIZE, LOGFILE_INFO_SIZE, MAX_HEADER_SIZE,
    MIN_HEADER_SIZE, PROLOGUE_SIZE, TTL_MAGIC,
};
use crate::cursor::{ByteCursor, CursorError, Endianness};
use crate::dissector::{Dissection, SubDissector, SubDissectors};
use crate::field::{ByteRange, DiagCode, EngineError, FieldSink, FieldTree, NodeId, Severity};
use crate::profile::ProfileGuard;
use crate::value::FieldValue;
use tracing::{debug, trace};

/// Shared, read-only state for one walk.
pub(crate) struct WalkCtx<'a> {
    pub options: &'a TtlOptions,
    pub subs: &'a SubDissectors,
}

/// What the prologue said, after clamping.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    version: u32,
    block_size: u32,
}

enum EntryStep {
    Next,
    EndBlock,
}

/// TTL dissector. Immutable once built; one instance can serve any number of threads.
#[derive(Debug, Clone, Default)]
pub struct TtlDissector {
    options: TtlOptions,
    subs: SubDissectors,
}

impl TtlDissector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: TtlOptions) -> Self {
        self.options = options;
        self
    }

    /// Sibling dissectors: `eth` for Ethernet frames, `ttl.config` for the configuration blob.
    pub fn with_sub_dissectors(mut self, subs: SubDissectors) -> Self {
        self.subs = subs;
        self
    }

    /// True when the bytes at the cursor start with the magic and a full prologue.
    pub fn probe(cur: &ByteCursor<'_>) -> bool {
        cur.remaining() >= PROLOGUE_SIZE && cur.remaining_bytes().starts_with(&TTL_MAGIC)
    }

    /// Dissects `buf` from `offset`.
    pub fn dissect(&self, buf: &[u8], offset: usize) -> Result<Dissection, EngineError> {
        let cur = ByteCursor::at(buf, offset);
        if !Self::probe(&cur) {
            return Ok(Dissection::NoMatch);
        }
        let mut tree = FieldTree::new();
        let consumed = self.walk(cur, &mut tree)?;
        Ok(Dissection::Matched { tree: tree.finish()?, consumed })
    }

    fn walk(&self, mut cur: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<usize, EngineError> {
        let start = cur.offset();
        let ctx = WalkCtx { options: &self.options, subs: &self.subs };
        let root = sink.open_subtree("ttl", cur.window());

        let header = walk_header(&mut cur, sink, &ctx)?;
        debug!(version = header.version, block_size = header.block_size, data_start = cur.offset(), "ttl header");

        if header.block_size == 0 {
            let consumed = cur.offset() - start;
            if !cur.is_empty() {
                let rest = cur.rest();
                sink.add_field("ttl.unparsed", rest.window(), FieldValue::Bytes);
            }
            sink.close_subtree(root)?;
            return Ok(consumed);
        }

        let mut index = 0usize;
        while !cur.is_empty() {
            let len = (header.block_size as usize).min(cur.remaining());
            let Ok(block) = cur.sub_slice(len) else { break };
            walk_block(block, index, sink, &ctx)?;
            index += 1;
        }
        debug!(blocks = index, "ttl trace data walked");

        sink.close_subtree(root)?;
        Ok(cur.offset() - start)
    }
}

impl SubDissector for TtlDissector {
    fn dissect(&self, data: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<usize, EngineError> {
        if !Self::probe(&data) {
            return Ok(0);
        }
        self.walk(data, sink)
    }
}

/// Splits a step result: engine failures propagate, bound failures are handed back.
fn settle<T>(r: Result<T, StepError>) -> Result<Result<T, CursorError>, EngineError> {
    match r {
        Ok(v) => Ok(Ok(v)),
        Err(StepError::Bounds(e)) => Ok(Err(e)),
        Err(StepError::Engine(e)) => Err(e),
    }
}

fn walk_header(cur: &mut ByteCursor<'_>, sink: &mut dyn FieldSink, ctx: &WalkCtx<'_>) -> Result<FileHeader, EngineError> {
    let _g = ProfileGuard::new("Header");
    let node = sink.open_subtree("ttl.header", cur.range_ahead(PROLOGUE_SIZE));
    let header = match settle(header_fields(cur, sink, ctx))? {
        Ok(h) => h,
        Err(e) => {
            sink.diag(Severity::Warn, DiagCode::HeaderTruncated, cur.range_ahead(cur.remaining()), &e.to_string());
            FileHeader { version: 0, block_size: 0 }
        }
    };
    sink.close_subtree(node)?;
    Ok(header)
}

fn header_fields(cur: &mut ByteCursor<'_>, sink: &mut dyn FieldSink, ctx: &WalkCtx<'_>) -> Result<FileHeader, StepError> {
    let available = cur.remaining();

    let range = cur.range_ahead(4);
    let magic = cur.read_bytes(4)?;
    sink.add_field("ttl.header.magic", range, FieldValue::Str(String::from_utf8_lossy(magic).into_owned()));

    let range = cur.range_ahead(4);
    let version = cur.read_u32(Endianness::Little)?;
    sink.add_field("ttl.header.version", range, FieldValue::UInt32(version));

    let range = cur.range_ahead(4);
    let block_size = cur.read_u32(Endianness::Little)?;
    sink.add_field("ttl.header.block_size", range, FieldValue::UInt32(block_size));
    if block_size == 0 {
        sink.diag(Severity::Warn, DiagCode::BlockSizeTooShort, range, "block size is 0, trace data is not walked");
    }

    let range = cur.range_ahead(4);
    let header_size = cur.read_u32(Endianness::Little)?;
    sink.add_field("ttl.header.header_size", range, FieldValue::UInt32(header_size));

    let mut effective = header_size as usize;
    if header_size < MIN_HEADER_SIZE {
        sink.diag(
            Severity::Error,
            DiagCode::HeaderSizeTooShort,
            range,
            &format!("header size {} is smaller than the {}-byte header structure", header_size, MIN_HEADER_SIZE),
        );
        effective = PROLOGUE_SIZE;
    } else if header_size > MAX_HEADER_SIZE {
        sink.diag(
            Severity::Error,
            DiagCode::HeaderSizeTooLong,
            range,
            &format!("header size {} exceeds the {}-byte maximum", header_size, MAX_HEADER_SIZE),
        );
        effective = MAX_HEADER_SIZE as usize;
    }
    if effective > available {
        sink.diag(
            Severity::Warn,
            DiagCode::HeaderTruncated,
            range,
            &format!("header size {} but only {} bytes available", effective, available),
        );
        effective = available;
    }

    let mut region = cur.sub_slice(effective - PROLOGUE_SIZE)?;
    if region.remaining() >= LOGFILE_INFO_SIZE {
        let info = region.sub_slice(LOGFILE_INFO_SIZE)?;
        read_logfile_info(info, sink)?;
    } else {
        if version >= CONFIG_MIN_VERSION {
            sink.diag(
                Severity::Error,
                DiagCode::LogfileInfoTooShort,
                region.window(),
                &format!(
                    "logfile info region is {} bytes, version {} requires {}",
                    region.remaining(),
                    version,
                    LOGFILE_INFO_SIZE
                ),
            );
        }
        if !region.is_empty() {
            let rest = region.rest();
            sink.add_field("ttl.logfile_info", rest.window(), FieldValue::Bytes);
        }
    }

    if !region.is_empty() {
        let blob = region.rest();
        if version >= CONFIG_MIN_VERSION {
            let node = sink.open_valued("ttl.config", blob.window(), FieldValue::Bytes);
            if let Some(config) = ctx.subs.get("ttl.config") {
                let used = config.dissect(blob, sink)?;
                trace!(used, len = blob.capacity(), "configuration handed off");
            }
            sink.close_subtree(node)?;
        } else {
            sink.add_field("ttl.unparsed", blob.window(), FieldValue::Bytes);
        }
    }

    Ok(FileHeader { version, block_size })
}

fn read_logfile_info(mut info: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(), StepError> {
    let node = sink.open_subtree("ttl.logfile_info", info.window());
    let result = logfile_info_fields(&mut info, sink);
    sink.close_subtree(node)?;
    result
}

fn version_quad(cur: &mut ByteCursor<'_>) -> Result<String, CursorError> {
    let mut parts = [0u16; 4];
    for p in parts.iter_mut() {
        *p = cur.read_u16(Endianness::Little)?;
    }
    Ok(format!("{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[3]))
}

fn logfile_info_fields(info: &mut ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(), StepError> {
    let range = info.range_ahead(4);
    let serial = info.read_u32(Endianness::Little)?;
    sink.add_field("ttl.logfile_info.serial_number", range, FieldValue::UInt32(serial));

    let range = info.range_ahead(8);
    let sw = version_quad(info)?;
    sink.add_field("ttl.logfile_info.sw_version", range, FieldValue::Str(sw));

    let range = info.range_ahead(8);
    let hw = version_quad(info)?;
    sink.add_field("ttl.logfile_info.hw_version", range, FieldValue::Str(hw));

    let range = info.range_ahead(8);
    let created = info.read_u64(Endianness::Little)?;
    sink.add_field("ttl.logfile_info.creation_time", range, FieldValue::TimeAbsolute(created));

    let range = info.range_ahead(8);
    let completed = info.read_u64(Endianness::Little)?;
    sink.add_field("ttl.logfile_info.completion_time", range, FieldValue::TimeAbsolute(completed));

    let range = info.range_ahead(32);
    let supplier = info.read_padded_str(32)?;
    sink.add_field("ttl.logfile_info.supplier", range, FieldValue::Str(supplier));

    let range = info.range_ahead(64);
    let description = info.read_padded_str(64)?;
    sink.add_field("ttl.logfile_info.description", range, FieldValue::Str(description));

    if !info.is_empty() {
        let reserved = info.rest();
        sink.add_field("ttl.logfile_info.reserved", reserved.window(), FieldValue::Bytes);
    }
    Ok(())
}

fn walk_block(mut block: ByteCursor<'_>, index: usize, sink: &mut dyn FieldSink, ctx: &WalkCtx<'_>) -> Result<(), EngineError> {
    let _g = ProfileGuard::new("Block");
    trace!(index, offset = block.offset(), len = block.capacity(), "block");
    let node = sink.open_subtree("ttl.block", block.window());
    sink.set_label(node.id(), &format!("Block {}", index));

    while block.remaining() >= ENTRY_HEADER_SIZE {
        match walk_entry(&mut block, sink, ctx)? {
            EntryStep::Next => {}
            EntryStep::EndBlock => break,
        }
    }
    if !block.is_empty() {
        let rest = block.rest();
        sink.add_field("ttl.unparsed", rest.window(), FieldValue::Bytes);
    }
    sink.close_subtree(node)?;
    Ok(())
}

fn walk_entry(block: &mut ByteCursor<'_>, sink: &mut dyn FieldSink, ctx: &WalkCtx<'_>) -> Result<EntryStep, EngineError> {
    let _g = ProfileGuard::new("Entry");
    let start = block.offset();
    let Ok(word) = block.peek_u16(Endianness::Little) else {
        return Ok(EntryStep::EndBlock);
    };
    let (kind, declared) = split_type_size(word);

    if declared < ENTRY_HEADER_SIZE {
        let node = sink.open_subtree("ttl.entry", ByteRange::new(start, declared));
        sink.append_text(node.id(), kind.label());
        let mut head = *block;
        // Only the type/size word is trusted; nothing past it is read.
        if let Err(e) = settle(read_type_size(&mut head, sink))? {
            debug!(error = %e, "entry type/size word unreadable");
        }
        sink.diag(
            Severity::Error,
            DiagCode::EntrySizeTooShort,
            ByteRange::new(start, 2),
            &format!("entry size {} is smaller than the {}-byte entry header", declared, ENTRY_HEADER_SIZE),
        );
        sink.close_subtree(node)?;
        debug!(offset = start, declared, "entry shorter than its header");
        if block.skip(declared).is_err() || declared == 0 || ctx.options.resync_on_short_entry {
            return Ok(EntryStep::EndBlock);
        }
        return Ok(EntryStep::Next);
    }

    let span = declared.min(block.remaining());
    let node = sink.open_subtree("ttl.entry", ByteRange::new(start, span));
    sink.append_text(node.id(), kind.label());
    if span < declared {
        sink.diag(
            Severity::Error,
            DiagCode::EntrySizeTooLong,
            ByteRange::new(start, 2),
            &format!("entry size {} exceeds the {} bytes left in the block", declared, span),
        );
    }

    let Ok(mut entry) = block.sub_slice(span) else {
        sink.close_subtree(node)?;
        return Ok(EntryStep::EndBlock);
    };
    if let Err(e) = settle(entry_fields(&mut entry, node.id(), sink, ctx))? {
        sink.diag(
            Severity::Warn,
            DiagCode::EntryTruncated,
            entry.range_ahead(entry.remaining()),
            &format!("entry ends inside a field: {}", e),
        );
    }
    if !entry.is_empty() {
        let rest = entry.rest();
        sink.add_field("ttl.unparsed", rest.window(), FieldValue::Bytes);
    }
    sink.close_subtree(node)?;
    Ok(EntryStep::Next)
}

fn entry_fields(
    entry: &mut ByteCursor<'_>,
    node: NodeId,
    sink: &mut dyn FieldSink,
    ctx: &WalkCtx<'_>,
) -> Result<(), StepError> {
    let (kind, size) = read_type_size(entry, sink)?;
    let header = read_header_rest(entry, sink, kind, size)?;
    let _g = (kind == EntryKind::BusData).then(|| ProfileGuard::new("BusData"));
    if kind == EntryKind::BusData {
        sink.append_text(node, &format!("({})", header.source.interface_type().label()));
    }
    dispatch_entry(&header, entry, sink, ctx)
}
