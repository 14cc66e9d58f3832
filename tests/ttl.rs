//! TTL integration tests: header recovery, block/entry walking, bus payloads, sub-dissector
//! hand-off, and bounds/containment properties over random and mutated files.

use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use tracedissect::cursor::ByteCursor;
use tracedissect::field::{ByteRange, DiagCode, FieldSink, FieldTree, NodeId, NullSink, Severity};
use tracedissect::ttl::{TtlOptions, LOGFILE_INFO_SIZE, PROLOGUE_SIZE};
use tracedissect::value::FieldValue;
use tracedissect::{dump, Dissection, EngineError, SubDissector, SubDissectors, TtlDissector};

const HEADER_LEN: usize = PROLOGUE_SIZE + LOGFILE_INFO_SIZE;
const TIMESTAMP: u64 = 123_456_789;

const LOGGER_ETH1: u16 = 0x0001;
const LOGGER_CAN1: u16 = 0x0008;
const LOGGER_LIN1: u16 = 0x0010;
const LOGGER_FLEXRAY_A: u16 = 0x0018;
/// Device 2, function 0x11: tap CAN B.
const TAP2_CAN_B: u16 = (2 << 6) | 0x11;

fn prologue(version: u32, block_size: u32, header_size: u32) -> Vec<u8> {
    let mut v = b"TTL ".to_vec();
    v.extend(version.to_le_bytes());
    v.extend(block_size.to_le_bytes());
    v.extend(header_size.to_le_bytes());
    v
}

fn logfile_info() -> Vec<u8> {
    let mut v = Vec::new();
    v.extend(42u32.to_le_bytes());
    for x in [1u16, 2, 3, 4, 5, 6, 7, 8] {
        v.extend(x.to_le_bytes());
    }
    v.extend(1_000_000_000u64.to_le_bytes());
    v.extend(2_000_000_000u64.to_le_bytes());
    let mut supplier = b"ACME".to_vec();
    supplier.resize(32, 0);
    v.extend(supplier);
    let mut description = b"bench run".to_vec();
    description.resize(64, 0);
    v.extend(description);
    v.resize(LOGFILE_INFO_SIZE, 0);
    v
}

fn file(version: u32, block_size: u32, config: &[u8], data: &[u8]) -> Vec<u8> {
    let header_size = HEADER_LEN + config.len();
    let mut v = prologue(version, block_size, header_size as u32);
    v.extend(logfile_info());
    v.extend(config);
    v.extend(data);
    v
}

fn entry(kind: u8, meta1: u16, src: u16, status: u16, body: &[u8]) -> Vec<u8> {
    let size = 12 + body.len();
    let word = ((kind as u16) << 12) | size as u16;
    let mut v = Vec::new();
    v.extend(word.to_le_bytes());
    v.extend(meta1.to_le_bytes());
    v.extend(0u16.to_le_bytes());
    v.extend(0u16.to_le_bytes());
    v.extend(src.to_le_bytes());
    v.extend(status.to_le_bytes());
    v.extend(body);
    v
}

fn bus(src: u16, status: u16, payload: &[u8]) -> Vec<u8> {
    let mut body = TIMESTAMP.to_le_bytes().to_vec();
    body.extend(payload);
    entry(0, 0, src, status, &body)
}

fn matched(d: Dissection) -> (FieldTree, usize) {
    match d {
        Dissection::Matched { tree, consumed } => (tree, consumed),
        Dissection::NoMatch => panic!("expected a match"),
    }
}

fn dissect(bytes: &[u8]) -> (FieldTree, usize) {
    matched(TtlDissector::new().dissect(bytes, 0).expect("engine"))
}

fn value_of(tree: &FieldTree, name: &str) -> FieldValue {
    let id = tree.find(name).unwrap_or_else(|| panic!("no field {name}"));
    tree.node(id).value.clone()
}

fn child_names(tree: &FieldTree, id: NodeId) -> Vec<String> {
    tree.children(id).map(|c| c.name.clone()).collect()
}

/// Direct children of `id` tile its range exactly.
fn contiguous(tree: &FieldTree, id: NodeId) -> Result<(), String> {
    let node = tree.node(id);
    let mut kids: Vec<ByteRange> = tree.children(id).map(|c| c.range).collect();
    kids.sort_by_key(|r| r.start);
    let mut at = node.range.start;
    for r in &kids {
        if r.start != at {
            return Err(format!("{} {}: child {} does not start at {}", node.name, node.range, r, at));
        }
        at = r.end();
    }
    if at != node.range.end() {
        return Err(format!("{} {}: children end at {}", node.name, node.range, at));
    }
    Ok(())
}

fn assert_containment(tree: &FieldTree) {
    for name in ["ttl.block", "ttl.entry"] {
        for id in tree.find_all(name) {
            contiguous(tree, id).unwrap();
        }
    }
}

/// Records every call and claims the whole payload.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(usize, usize)>>,
}

impl SubDissector for Recorder {
    fn dissect(&self, data: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<usize, EngineError> {
        self.calls.lock().unwrap().push((data.offset(), data.remaining()));
        sink.add_field("mock.payload", data.window(), FieldValue::Bytes);
        Ok(data.remaining())
    }
}

#[test]
fn test_not_this_format() {
    let d = TtlDissector::new();
    assert!(!d.dissect(b"", 0).unwrap().is_match());
    assert!(!d.dissect(b"TTL \x0a\0\0\0\0\0\0\0", 0).unwrap().is_match());
    assert!(!d.dissect(&prologue(10, 64, 176)[..15], 0).unwrap().is_match());
    let mut wrong = prologue(10, 64, 16);
    wrong[0] = b'X';
    assert!(!d.dissect(&wrong, 0).unwrap().is_match());
    let good = file(10, 64, &[], &[]);
    assert!(!d.dissect(&good, good.len() + 5).unwrap().is_match());
    assert_eq!(d.dissect(&good, 0).unwrap().consumed(), HEADER_LEN);
}

#[test]
fn test_offset_ranges_are_absolute() {
    let mut buf = vec![0xEE; 5];
    buf.extend(file(10, 64, &[], &entry(5, 0, 0, 0, &[])));
    let (tree, consumed) = matched(TtlDissector::new().dissect(&buf, 5).unwrap());
    assert_eq!(consumed, buf.len() - 5);
    let header = tree.find("ttl.header").unwrap();
    assert_eq!(tree.node(header).range, ByteRange::new(5, HEADER_LEN));
    let e = tree.find("ttl.entry").unwrap();
    assert_eq!(tree.node(e).range, ByteRange::new(5 + HEADER_LEN, 12));
}

#[test]
fn test_header_size_too_short_is_attached_to_header() {
    let bytes = prologue(10, 64, 8);
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(consumed, PROLOGUE_SIZE);
    let header = tree.find("ttl.header").unwrap();
    let d = tree.diagnostics_with(DiagCode::HeaderSizeTooShort).next().expect("diagnostic");
    assert_eq!(d.severity, Severity::Error);
    assert_eq!(d.parent, Some(header));
    assert_eq!(value_of(&tree, "ttl.header.header_size"), FieldValue::UInt32(8));
    assert_eq!(tree.node(tree.find("ttl.header.header_size").unwrap()).parent, Some(header));
}

#[test]
fn test_block_size_zero_walks_no_blocks() {
    let bytes = file(10, 0, &[], &[1, 2, 3, 4, 5]);
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(tree.diagnostics_with(DiagCode::BlockSizeTooShort).count(), 1);
    let d = tree.diagnostics_with(DiagCode::BlockSizeTooShort).next().unwrap();
    assert_eq!(d.parent, tree.find("ttl.header"));
    assert!(tree.find_all("ttl.block").is_empty());
    let unparsed = tree.find("ttl.unparsed").unwrap();
    assert_eq!(tree.node(unparsed).range, ByteRange::new(HEADER_LEN, 5));
    assert_eq!(consumed, HEADER_LEN);
}

#[test]
fn test_logfile_info_fields() {
    let bytes = file(10, 1024, &[], &[]);
    let (tree, consumed) = dissect(&bytes);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(consumed, HEADER_LEN);
    assert_eq!(value_of(&tree, "ttl.header.magic"), FieldValue::Str("TTL ".into()));
    assert_eq!(value_of(&tree, "ttl.header.version"), FieldValue::UInt32(10));
    assert_eq!(value_of(&tree, "ttl.logfile_info.serial_number"), FieldValue::UInt32(42));
    assert_eq!(value_of(&tree, "ttl.logfile_info.sw_version"), FieldValue::Str("1.2.3.4".into()));
    assert_eq!(value_of(&tree, "ttl.logfile_info.hw_version"), FieldValue::Str("5.6.7.8".into()));
    assert_eq!(value_of(&tree, "ttl.logfile_info.creation_time"), FieldValue::TimeAbsolute(1_000_000_000));
    assert_eq!(value_of(&tree, "ttl.logfile_info.completion_time"), FieldValue::TimeAbsolute(2_000_000_000));
    assert_eq!(value_of(&tree, "ttl.logfile_info.supplier"), FieldValue::Str("ACME".into()));
    assert_eq!(value_of(&tree, "ttl.logfile_info.description"), FieldValue::Str("bench run".into()));
    let info = tree.find("ttl.logfile_info").unwrap();
    assert_eq!(tree.node(info).range, ByteRange::new(PROLOGUE_SIZE, LOGFILE_INFO_SIZE));
    contiguous(&tree, info).unwrap();
}

#[test]
fn test_short_entry_advances_by_declared_size() {
    let mut data = vec![0x03, 0x00, 0xAA];
    data.extend(entry(5, 0, 0, 0, &[]));
    let bytes = file(10, data.len() as u32, &[], &data);
    let (tree, _) = dissect(&bytes);

    let entries = tree.find_all("ttl.entry");
    assert_eq!(entries.len(), 2);
    assert_eq!(child_names(&tree, entries[0]), vec!["ttl.entry.type_size"]);
    assert_eq!(tree.node(entries[0]).range, ByteRange::new(HEADER_LEN, 3));
    let d = tree.diagnostics_with(DiagCode::EntrySizeTooShort).next().expect("diagnostic");
    assert_eq!(d.parent, Some(entries[0]));
    assert_eq!(d.severity, Severity::Error);
    assert!(tree.node(entries[1]).annotations.contains(&"Padding".to_string()));
    assert_eq!(tree.node(entries[1]).range, ByteRange::new(HEADER_LEN + 3, 12));
    assert!(tree.find("ttl.unparsed").is_none());
}

#[test]
fn test_resync_on_short_entry_ends_block() {
    let mut data = vec![0x03, 0x00, 0xAA];
    data.extend(entry(5, 0, 0, 0, &[]));
    let bytes = file(10, data.len() as u32, &[], &data);
    let dissector = TtlDissector::new().with_options(TtlOptions::new().with_resync_on_short_entry(true));
    let (tree, _) = matched(dissector.dissect(&bytes, 0).unwrap());
    assert_eq!(tree.find_all("ttl.entry").len(), 1);
    let unparsed = tree.find("ttl.unparsed").unwrap();
    assert_eq!(tree.node(unparsed).range, ByteRange::new(HEADER_LEN + 3, 12));
}

#[test]
fn test_zero_size_entries_make_progress() {
    let data = vec![0u8; 28];
    let bytes = file(10, 14, &[], &data);
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(consumed, bytes.len());
    assert_eq!(tree.find_all("ttl.block").len(), 2);
    assert_eq!(tree.diagnostics_with(DiagCode::EntrySizeTooShort).count(), 2);
    let unparsed = tree.find_all("ttl.unparsed");
    assert_eq!(tree.node(unparsed[0]).range, ByteRange::new(HEADER_LEN, 14));
    assert_eq!(tree.node(unparsed[1]).range, ByteRange::new(HEADER_LEN + 14, 14));
}

#[test]
fn test_ethernet_frame_goes_to_eth() {
    let frame: Vec<u8> = (0u8..14).collect();
    let data = bus(LOGGER_ETH1, 0x0001, &frame);
    let bytes = file(10, 512, &[], &data);
    let rec = Arc::new(Recorder::default());
    let dissector = TtlDissector::new().with_sub_dissectors(SubDissectors::new().with("eth", rec.clone()));
    let (tree, consumed) = matched(dissector.dissect(&bytes, 0).unwrap());
    assert_eq!(consumed, bytes.len());
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());

    let e = tree.find("ttl.entry").unwrap();
    let notes = &tree.node(e).annotations;
    assert!(notes.contains(&"Bus Data".to_string()));
    assert!(notes.contains(&"(Ethernet)".to_string()));
    assert_eq!(value_of(&tree, "ttl.entry.timestamp"), FieldValue::TimeAbsolute(TIMESTAMP));
    assert_eq!(value_of(&tree, "ttl.eth.status.crc_error"), FieldValue::Bool(true));

    let eth = tree.find("ttl.eth.frame").unwrap();
    assert_eq!(tree.node(eth).range, ByteRange::new(HEADER_LEN + 20, 14));
    let payload = tree.find("mock.payload").unwrap();
    assert_eq!(tree.node(payload).parent, Some(eth));
    assert_eq!(*rec.calls.lock().unwrap(), vec![(HEADER_LEN + 20, 14)]);
    assert_containment(&tree);
}

#[test]
fn test_ethernet_without_eth_dissector_is_opaque() {
    let bytes = file(10, 512, &[], &bus(LOGGER_ETH1, 0, &[1, 2, 3]));
    let (tree, _) = dissect(&bytes);
    let eth = tree.find("ttl.eth.frame").unwrap();
    assert_eq!(tree.node(eth).value, FieldValue::Bytes);
    assert_eq!(tree.children(eth).count(), 0);
}

#[test]
fn test_can_payload() {
    let mut payload = 0x8000_0123u32.to_le_bytes().to_vec();
    payload.extend([1, 2, 3, 4, 5, 6, 7, 8]);
    let bytes = file(10, 512, &[], &bus(TAP2_CAN_B, 0x0002, &payload));
    let (tree, _) = dissect(&bytes);
    assert!(tree.diagnostics().is_empty());

    let e = tree.find("ttl.entry").unwrap();
    assert!(tree.node(e).annotations.contains(&"(CAN)".to_string()));
    let src = tree.find("ttl.entry.src").unwrap();
    assert_eq!(tree.node(src).annotations, vec!["Tap 2 / CAN B (cascade 0)".to_string()]);

    let id = tree.find("ttl.can.id").unwrap();
    assert_eq!(tree.node(id).value, FieldValue::UInt32(0x8000_0123));
    assert_eq!(value_of(&tree, "ttl.can.id.value"), FieldValue::UInt64(0x123));
    let ext = tree.find("ttl.can.id.extended").unwrap();
    assert_eq!(tree.node(ext).value, FieldValue::Bool(true));
    assert_eq!(tree.node(ext).annotations, vec!["Extended".to_string()]);
    assert_eq!(value_of(&tree, "ttl.can.status.crc_error"), FieldValue::Bool(true));
    let data = tree.find("ttl.can.data").unwrap();
    assert_eq!(tree.node(data).range.len, 8);
    assert_containment(&tree);
}

#[test]
fn test_lin_checksum_only_after_data() {
    let mut data = bus(LOGGER_LIN1, 0, &[0x85, 1, 2, 3, 0x55]);
    data.extend(bus(LOGGER_LIN1, 0, &[0x06, 9]));
    let bytes = file(10, 512, &[], &data);
    let (tree, _) = dissect(&bytes);
    assert!(tree.diagnostics().is_empty());
    let pids = tree.find_all("ttl.lin.pid");
    assert_eq!(pids.len(), 2);
    assert_eq!(value_of(&tree, "ttl.lin.pid.id"), FieldValue::UInt64(5));
    assert_eq!(value_of(&tree, "ttl.lin.pid.parity"), FieldValue::UInt64(2));
    let lin_data = tree.find_all("ttl.lin.data");
    assert_eq!(tree.node(lin_data[0]).range.len, 3);
    assert_eq!(tree.node(lin_data[1]).range.len, 1);
    let checksums = tree.find_all("ttl.lin.checksum");
    assert_eq!(checksums.len(), 1);
    assert_eq!(tree.node(checksums[0]).value, FieldValue::UInt8(0x55));
    assert_containment(&tree);
}

#[test]
fn test_flexray_frame_kinds() {
    let mut regular = 0x0042u16.to_le_bytes().to_vec();
    regular.push(7);
    regular.extend(0x1234u16.to_le_bytes());
    regular.extend([9, 9]);
    let mut data = bus(LOGGER_FLEXRAY_A, 0x0000, &regular);
    data.extend(bus(LOGGER_FLEXRAY_A, 0x0004, &0x0005u16.to_le_bytes()));
    data.extend(bus(LOGGER_FLEXRAY_A, 0x0002, &100u16.to_le_bytes()));
    data.extend(bus(LOGGER_FLEXRAY_A, 0x0007, &[1, 2]));
    let bytes = file(10, 1024, &[], &data);
    let (tree, _) = dissect(&bytes);
    assert!(tree.diagnostics().is_empty());

    assert_eq!(value_of(&tree, "ttl.flexray.frame_id"), FieldValue::UInt16(0x42));
    assert_eq!(value_of(&tree, "ttl.flexray.cycle"), FieldValue::UInt8(7));
    assert_eq!(value_of(&tree, "ttl.flexray.header_crc"), FieldValue::UInt16(0x1234));
    assert_eq!(tree.node(tree.find("ttl.flexray.data").unwrap()).range.len, 2);
    assert_eq!(value_of(&tree, "ttl.flexray.error.syntax"), FieldValue::Bool(true));
    assert_eq!(value_of(&tree, "ttl.flexray.error.content"), FieldValue::Bool(false));
    assert_eq!(value_of(&tree, "ttl.flexray.error.boundary_violation"), FieldValue::Bool(true));
    assert_eq!(value_of(&tree, "ttl.flexray.pulse_length"), FieldValue::UInt16(100));
    let kind = tree.find("ttl.flexray.status.frame_kind").unwrap();
    assert_eq!(tree.node(kind).value.enum_label(), Some("Regular Frame"));

    // Unknown frame kind: payload left unparsed.
    let entries = tree.find_all("ttl.entry");
    let last = *entries.last().unwrap();
    assert!(tree.child(last, "ttl.unparsed").is_some());
    assert_containment(&tree);
}

#[test]
fn test_compressed_timestamp() {
    let mut body = 500u32.to_le_bytes().to_vec();
    body.extend(0x0000_0011u32.to_le_bytes());
    let bytes = file(10, 512, &[], &entry(0, 0x0002, LOGGER_CAN1, 0, &body));
    let (tree, _) = dissect(&bytes);
    assert_eq!(value_of(&tree, "ttl.entry.timestamp_offset"), FieldValue::TimeRelative(500));
    assert!(tree.find("ttl.entry.timestamp").is_none());
    assert_eq!(value_of(&tree, "ttl.entry.meta1.compressed_timestamp"), FieldValue::Bool(true));
    assert_eq!(value_of(&tree, "ttl.can.id.value"), FieldValue::UInt64(0x11));
}

#[test]
fn test_truncated_body_is_reported_and_unparsed() {
    let bytes = file(10, 512, &[], &entry(0, 0, LOGGER_CAN1, 0, &[1, 2, 3, 4]));
    let (tree, _) = dissect(&bytes);
    let d = tree.diagnostics_with(DiagCode::EntryTruncated).next().expect("diagnostic");
    assert_eq!(d.severity, Severity::Warn);
    let e = tree.find("ttl.entry").unwrap();
    assert_eq!(d.parent, Some(e));
    let unparsed = tree.child(e, "ttl.unparsed").unwrap();
    assert_eq!(tree.node(unparsed).range, ByteRange::new(HEADER_LEN + 12, 4));
    assert_containment(&tree);
}

#[test]
fn test_entry_size_too_long_is_clamped() {
    let mut data = 0x0064u16.to_le_bytes().to_vec();
    data.extend([0u8; 10]);
    data.extend(TIMESTAMP.to_le_bytes());
    let bytes = file(10, 512, &[], &data);
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(consumed, bytes.len());
    assert_eq!(tree.diagnostics_with(DiagCode::EntrySizeTooLong).count(), 1);
    let e = tree.find("ttl.entry").unwrap();
    assert_eq!(tree.node(e).range, ByteRange::new(HEADER_LEN, 20));
    assert_containment(&tree);
}

#[test]
fn test_non_bus_kinds_leave_body_unparsed() {
    let mut data = entry(2, 0, LOGGER_CAN1, 0, &[1, 2, 3, 4, 5, 6]);
    data.extend(entry(0xC, 0, 0, 0, &[7, 7]));
    let bytes = file(10, 512, &[], &data);
    let (tree, _) = dissect(&bytes);
    let entries = tree.find_all("ttl.entry");
    assert!(tree.node(entries[0]).annotations.contains(&"Journal".to_string()));
    assert!(tree.node(entries[1]).annotations.contains(&"Unknown".to_string()));
    let first_unparsed = tree.child(entries[0], "ttl.unparsed").unwrap();
    assert_eq!(tree.node(first_unparsed).range.len, 6);
    assert!(tree.find("ttl.entry.timestamp").is_none());
    assert_containment(&tree);
}

#[test]
fn test_header_size_too_long_and_truncated() {
    let mut bytes = prologue(10, 64, 2 << 20);
    bytes.extend(logfile_info());
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(tree.diagnostics_with(DiagCode::HeaderSizeTooLong).count(), 1);
    assert_eq!(tree.diagnostics_with(DiagCode::HeaderTruncated).count(), 1);
    assert_eq!(consumed, bytes.len());
    assert!(tree.find("ttl.logfile_info.serial_number").is_some());
}

#[test]
fn test_header_truncated_only() {
    let mut bytes = prologue(10, 64, 300);
    bytes.extend(logfile_info());
    let (tree, consumed) = dissect(&bytes);
    let codes: Vec<_> = tree.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![DiagCode::HeaderTruncated]);
    assert_eq!(consumed, HEADER_LEN);
}

#[test]
fn test_logfile_info_too_short_depends_on_version() {
    let mut bytes = prologue(10, 64, 100);
    bytes.extend([0u8; 84]);
    let (tree, _) = dissect(&bytes);
    assert_eq!(tree.diagnostics_with(DiagCode::LogfileInfoTooShort).count(), 1);
    let info = tree.find("ttl.logfile_info").unwrap();
    assert_eq!(tree.node(info).value, FieldValue::Bytes);
    assert_eq!(tree.node(info).range, ByteRange::new(PROLOGUE_SIZE, 84));

    let mut old = prologue(9, 64, 100);
    old.extend([0u8; 84]);
    let (tree, _) = dissect(&old);
    assert_eq!(tree.diagnostics_with(DiagCode::LogfileInfoTooShort).count(), 0);
}

#[test]
fn test_old_version_extra_header_is_unparsed() {
    let mut bytes = prologue(9, 64, (HEADER_LEN + 8) as u32);
    bytes.extend(logfile_info());
    bytes.extend([0xAB; 8]);
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(consumed, HEADER_LEN + 8);
    assert!(tree.find("ttl.config").is_none());
    let header = tree.find("ttl.header").unwrap();
    let unparsed = tree.child(header, "ttl.unparsed").unwrap();
    assert_eq!(tree.node(unparsed).range, ByteRange::new(HEADER_LEN, 8));
}

#[test]
fn test_config_blob_goes_to_config_dissector() {
    let config = [0x5A; 12];
    let bytes = file(10, 64, &config, &entry(5, 0, 0, 0, &[]));
    let rec = Arc::new(Recorder::default());
    let dissector = TtlDissector::new().with_sub_dissectors(SubDissectors::new().with("ttl.config", rec.clone()));
    let (tree, consumed) = matched(dissector.dissect(&bytes, 0).unwrap());
    assert_eq!(consumed, bytes.len());
    assert_eq!(*rec.calls.lock().unwrap(), vec![(HEADER_LEN, 12)]);
    let cfg = tree.find("ttl.config").unwrap();
    assert_eq!(tree.node(cfg).range, ByteRange::new(HEADER_LEN, 12));
    assert_eq!(child_names(&tree, cfg), vec!["mock.payload"]);

    let (plain, _) = dissect(&bytes);
    let cfg = plain.find("ttl.config").unwrap();
    assert_eq!(plain.children(cfg).count(), 0);
    assert_eq!(plain.node(plain.find("ttl.entry").unwrap()).range.start, HEADER_LEN + 12);
}

#[test]
fn test_multiple_blocks_with_partial_last_block() {
    let mut data = entry(5, 0, 0, 0, &[0u8; 20]);
    data.extend(entry(5, 0, 0, 0, &[]));
    data.extend([0xFF; 8]);
    let bytes = file(10, 32, &[], &data);
    let (tree, consumed) = dissect(&bytes);
    assert_eq!(consumed, HEADER_LEN + 52);
    let blocks = tree.find_all("ttl.block");
    assert_eq!(blocks.len(), 2);
    assert_eq!(tree.node(blocks[0]).label.as_deref(), Some("Block 0"));
    assert_eq!(tree.node(blocks[1]).label.as_deref(), Some("Block 1"));
    assert_eq!(tree.node(blocks[1]).range, ByteRange::new(HEADER_LEN + 32, 20));
    assert_eq!(child_names(&tree, blocks[1]), vec!["ttl.entry", "ttl.unparsed"]);
    assert_containment(&tree);
}

#[test]
fn test_null_sink_pass_agrees_with_tree() {
    let mut data = bus(LOGGER_CAN1, 0, &[1, 2, 3, 4, 5]);
    data.extend([0x03, 0x00, 0x00]);
    let bytes = file(10, 64, &[], &data);
    let (tree, consumed) = dissect(&bytes);
    let mut sink = NullSink::new();
    let n = SubDissector::dissect(&TtlDissector::new(), ByteCursor::new(&bytes), &mut sink).unwrap();
    assert_eq!(n, consumed);
    assert_eq!(sink.diagnostic_count(), tree.diagnostics().len());
    assert_eq!(SubDissector::dissect(&TtlDissector::new(), ByteCursor::new(b"nope"), &mut sink).unwrap(), 0);
}

#[test]
fn test_dump_renders_tree() {
    let bytes = file(10, 64, &[], &bus(LOGGER_ETH1, 0, &[0xde, 0xad]));
    let (tree, _) = dissect(&bytes);
    let text = dump::render(&tree, &bytes);
    assert!(text.starts_with("ttl @0.."));
    assert!(text.contains("  ttl.header @0..176"));
    assert!(text.contains("ttl.header.magic: \"TTL \" @0..4"));
    assert!(text.contains("ttl.eth.frame: de ad @196..198"));
    assert!(!text.contains("diagnostics:"));
}

fn sample_file() -> Vec<u8> {
    let mut data = bus(LOGGER_ETH1, 0, &[1, 2, 3, 4, 5, 6]);
    data.extend(bus(LOGGER_CAN1, 0x0004, &[0x23, 0x01, 0, 0x80, 9, 9]));
    data.extend(bus(LOGGER_LIN1, 0, &[0x85, 1, 2, 0x33]));
    data.extend(entry(2, 0, 0, 0, &[4; 6]));
    data.extend(bus(LOGGER_FLEXRAY_A, 0, &[1, 0, 2, 3, 4, 5]));
    file(10, 128, &[0x11; 4], &data)
}

fn check_bounds(bytes: &[u8], offset: usize) -> Result<Option<FieldTree>, TestCaseError> {
    match TtlDissector::new().dissect(bytes, offset) {
        Ok(Dissection::NoMatch) => Ok(None),
        Ok(Dissection::Matched { tree, consumed }) => {
            prop_assert!(consumed <= bytes.len() - offset);
            for (id, _) in tree.walk() {
                prop_assert!(tree.node(id).range.end() <= bytes.len(), "{} beyond buffer", tree.node(id).name);
            }
            Ok(Some(tree))
        }
        Err(e) => Err(TestCaseError::fail(format!("engine error: {e}"))),
    }
}

proptest! {
    #[test]
    fn random_bytes_are_bounds_safe(bytes in prop::collection::vec(any::<u8>(), 0..600), offset in 0usize..700) {
        let offset = offset % (bytes.len() + 1);
        check_bounds(&bytes, offset)?;
    }

    #[test]
    fn random_prologues_are_bounds_safe(
        version in 0u32..16,
        block_size in prop_oneof![Just(0u32), 1u32..64, any::<u32>()],
        header_size in prop_oneof![0u32..400, any::<u32>()],
        tail in prop::collection::vec(any::<u8>(), 0..400),
    ) {
        let mut bytes = prologue(version, block_size, header_size);
        bytes.extend(tail);
        prop_assert!(check_bounds(&bytes, 0)?.is_some());
    }

    #[test]
    fn mutated_files_stay_contained(mutations in prop::collection::vec((any::<usize>(), any::<u8>()), 0..12)) {
        let mut bytes = sample_file();
        for (at, b) in mutations {
            let i = at % bytes.len();
            bytes[i] = b;
        }
        if let Some(tree) = check_bounds(&bytes, 0)? {
            if tree.diagnostics_with(DiagCode::EntrySizeTooShort).next().is_none() {
                for name in ["ttl.block", "ttl.entry"] {
                    for id in tree.find_all(name) {
                        if let Err(e) = contiguous(&tree, id) {
                            return Err(TestCaseError::fail(e));
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_sample_file_is_clean() {
    let bytes = sample_file();
    let (tree, consumed) = dissect(&bytes);
    assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
    assert_eq!(consumed, bytes.len());
    assert_eq!(tree.find_all("ttl.entry").len(), 5);
    assert_containment(&tree);
}
