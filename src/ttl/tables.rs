//! Static label and bitfield tables for TTL entries.

use super::address::InterfaceType;
use crate::bitfield::BitSpec;

pub const ENTRY_KINDS: &[(u64, &str)] = &[
    (0, "Bus Data"),
    (1, "Command"),
    (2, "Journal"),
    (3, "Segmented Message"),
    (4, "Send Frame"),
    (5, "Padding"),
    (6, "Software Data"),
    (7, "Dropped Frames"),
];

pub const TIMESTAMP_SOURCES: &[(u64, &str)] = &[(0, "Logger"), (1, "Tap")];

pub const ACK_MODES: &[(u64, &str)] = &[(0, "No Ack"), (1, "Ack"), (2, "Nack"), (3, "Reserved")];

pub const FLEXRAY_FRAME_KINDS: &[(u64, &str)] = &[
    (0, "Regular Frame"),
    (1, "Aborted Frame"),
    (2, "0-Pulse"),
    (3, "1-Pulse"),
    (4, "Error Information"),
];

pub const TYPE_SIZE: &[BitSpec] = &[
    BitSpec::table("ttl.entry.type", 0xF000, ENTRY_KINDS),
    BitSpec::plain("ttl.entry.size", 0x0FFF),
];

pub const META1: &[BitSpec] = &[
    BitSpec::flag("ttl.entry.meta1.frame_duplication", 0x0001),
    BitSpec::flag_labeled("ttl.entry.meta1.compressed_timestamp", 0x0002, "Compressed", "Normal"),
    BitSpec::table("ttl.entry.meta1.timestamp_source", 0x0004, TIMESTAMP_SOURCES),
    BitSpec::plain("ttl.entry.meta1.reserved", 0xFFF8),
];

pub const META2: &[BitSpec] = &[
    BitSpec::table("ttl.entry.meta2.ack_mode", 0x0003, ACK_MODES),
    BitSpec::plain("ttl.entry.meta2.reserved", 0xFFFC),
];

pub const ADDRESS: &[BitSpec] = &[
    BitSpec::plain("ttl.address.cascade", 0x1C00),
    BitSpec::plain("ttl.address.device", 0x03C0),
    BitSpec::plain("ttl.address.function", 0x003F),
    BitSpec::plain("ttl.address.reserved", 0xE000),
];

pub const ETH_STATUS: &[BitSpec] = &[
    BitSpec::flag("ttl.eth.status.crc_error", 0x0001),
    BitSpec::flag("ttl.eth.status.too_short", 0x0002),
    BitSpec::flag("ttl.eth.status.too_long", 0x0004),
    BitSpec::flag("ttl.eth.status.phy_error", 0x0008),
    BitSpec::plain("ttl.eth.status.reserved", 0xFFF0),
];

pub const CAN_STATUS: &[BitSpec] = &[
    BitSpec::flag("ttl.can.status.ack_error", 0x0001),
    BitSpec::flag("ttl.can.status.crc_error", 0x0002),
    BitSpec::flag("ttl.can.status.form_error", 0x0004),
    BitSpec::flag("ttl.can.status.stuff_error", 0x0008),
    BitSpec::flag("ttl.can.status.bit_error", 0x0010),
    BitSpec::flag("ttl.can.status.fd_format", 0x0020),
    BitSpec::flag("ttl.can.status.bit_rate_switch", 0x0040),
    BitSpec::flag("ttl.can.status.error_state", 0x0080),
    BitSpec::plain("ttl.can.status.reserved", 0xFF00),
];

pub const LIN_STATUS: &[BitSpec] = &[
    BitSpec::flag("ttl.lin.status.checksum_error", 0x0001),
    BitSpec::flag("ttl.lin.status.no_slave_response", 0x0002),
    BitSpec::flag("ttl.lin.status.parity_error", 0x0004),
    BitSpec::flag("ttl.lin.status.sync_error", 0x0008),
    BitSpec::flag("ttl.lin.status.wake_up", 0x0010),
    BitSpec::plain("ttl.lin.status.reserved", 0xFFE0),
];

pub const FLEXRAY_STATUS: &[BitSpec] = &[
    BitSpec::table("ttl.flexray.status.frame_kind", 0x0007, FLEXRAY_FRAME_KINDS),
    BitSpec::flag_labeled("ttl.flexray.status.channel", 0x0008, "B", "A"),
    BitSpec::flag("ttl.flexray.status.null_frame", 0x0010),
    BitSpec::flag("ttl.flexray.status.sync_frame", 0x0020),
    BitSpec::flag("ttl.flexray.status.startup_frame", 0x0040),
    BitSpec::flag("ttl.flexray.status.payload_preamble", 0x0080),
    BitSpec::plain("ttl.flexray.status.reserved", 0xFF00),
];

pub const GENERIC_STATUS: &[BitSpec] = &[BitSpec::plain("ttl.entry.status.raw", 0xFFFF)];

pub const CAN_ID: &[BitSpec] = &[
    BitSpec::plain("ttl.can.id.value", 0x1FFF_FFFF),
    BitSpec::flag("ttl.can.id.error_frame", 0x2000_0000),
    BitSpec::flag("ttl.can.id.rtr", 0x4000_0000),
    BitSpec::flag_labeled("ttl.can.id.extended", 0x8000_0000, "Extended", "Standard"),
];

pub const LIN_PID: &[BitSpec] = &[
    BitSpec::plain("ttl.lin.pid.id", 0x3F),
    BitSpec::plain("ttl.lin.pid.parity", 0xC0),
];

pub const FLEXRAY_ERRORS: &[BitSpec] = &[
    BitSpec::flag("ttl.flexray.error.syntax", 0x0001),
    BitSpec::flag("ttl.flexray.error.content", 0x0002),
    BitSpec::flag("ttl.flexray.error.boundary_violation", 0x0004),
    BitSpec::flag("ttl.flexray.error.tx_conflict", 0x0008),
    BitSpec::plain("ttl.flexray.error.reserved", 0xFFF0),
];

/// Status word layout for an interface.
pub fn status_table(iface: InterfaceType) -> &'static [BitSpec] {
    match iface {
        InterfaceType::Ethernet => ETH_STATUS,
        InterfaceType::Can => CAN_STATUS,
        InterfaceType::Lin => LIN_STATUS,
        InterfaceType::FlexRay => FLEXRAY_STATUS,
        InterfaceType::Unsupported => GENERIC_STATUS,
    }
}
