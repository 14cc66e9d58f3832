//! Source/destination addresses and the interface they imply.
//!
//! An address packs cascade level (bits 12..10), device (bits 9..6) and function
//! (bits 5..0). Device 0 is the logger itself; every other device is a tap. Each device class
//! has its own function table, and the function entry decides how bus data from that
//! address is interpreted.

use super::tables::ADDRESS;
use crate::bitfield::emit_word;
use crate::cursor::{ByteCursor, Endianness};
use crate::field::FieldSink;
use crate::value::FieldValue;

use super::StepError;

/// Payload family of a bus-data entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    Ethernet,
    Can,
    Lin,
    FlexRay,
    Unsupported,
}

impl InterfaceType {
    pub fn label(&self) -> &'static str {
        match self {
            InterfaceType::Ethernet => "Ethernet",
            InterfaceType::Can => "CAN",
            InterfaceType::Lin => "LIN",
            InterfaceType::FlexRay => "FlexRay",
            InterfaceType::Unsupported => "Unsupported",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub code: u8,
    pub name: &'static str,
    pub interface: InterfaceType,
}

const fn func(code: u8, name: &'static str, interface: InterfaceType) -> FunctionInfo {
    FunctionInfo { code, name, interface }
}

use InterfaceType::{Can, Ethernet, FlexRay, Lin, Unsupported};

static LOGGER_FUNCTIONS: &[FunctionInfo] = &[
    func(0x00, "Logger", Unsupported),
    func(0x01, "ETH1", Ethernet),
    func(0x02, "ETH2", Ethernet),
    func(0x03, "ETH3", Ethernet),
    func(0x04, "ETH4", Ethernet),
    func(0x08, "CAN1", Can),
    func(0x09, "CAN2", Can),
    func(0x0A, "CAN3", Can),
    func(0x0B, "CAN4", Can),
    func(0x0C, "CAN5", Can),
    func(0x0D, "CAN6", Can),
    func(0x0E, "CAN7", Can),
    func(0x0F, "CAN8", Can),
    func(0x10, "LIN1", Lin),
    func(0x11, "LIN2", Lin),
    func(0x12, "LIN3", Lin),
    func(0x13, "LIN4", Lin),
    func(0x18, "FlexRay A", FlexRay),
    func(0x19, "FlexRay B", FlexRay),
];

static TAP_FUNCTIONS: &[FunctionInfo] = &[
    func(0x00, "Tap", Unsupported),
    func(0x01, "ETH A", Ethernet),
    func(0x02, "ETH B", Ethernet),
    func(0x03, "ETH C", Ethernet),
    func(0x04, "ETH D", Ethernet),
    func(0x05, "ETH E", Ethernet),
    func(0x06, "ETH F", Ethernet),
    func(0x10, "CAN A", Can),
    func(0x11, "CAN B", Can),
    func(0x12, "CAN C", Can),
    func(0x13, "CAN D", Can),
    func(0x14, "CAN E", Can),
    func(0x15, "CAN F", Can),
    func(0x16, "CAN G", Can),
    func(0x17, "CAN H", Can),
    func(0x20, "LIN A", Lin),
    func(0x21, "LIN B", Lin),
    func(0x28, "FlexRay A", FlexRay),
    func(0x29, "FlexRay B", FlexRay),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Logger,
    Tap,
}

impl DeviceClass {
    pub fn functions(&self) -> &'static [FunctionInfo] {
        match self {
            DeviceClass::Logger => LOGGER_FUNCTIONS,
            DeviceClass::Tap => TAP_FUNCTIONS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceClass::Logger => "Logger",
            DeviceClass::Tap => "Tap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address(pub u16);

impl Address {
    pub fn cascade(&self) -> u8 {
        ((self.0 >> 10) & 0x7) as u8
    }

    pub fn device(&self) -> u8 {
        ((self.0 >> 6) & 0xF) as u8
    }

    pub fn function(&self) -> u8 {
        (self.0 & 0x3F) as u8
    }

    pub fn device_class(&self) -> DeviceClass {
        if self.device() == 0 {
            DeviceClass::Logger
        } else {
            DeviceClass::Tap
        }
    }

    pub fn function_info(&self) -> Option<&'static FunctionInfo> {
        let code = self.function();
        self.device_class().functions().iter().find(|f| f.code == code)
    }

    pub fn interface_type(&self) -> InterfaceType {
        self.function_info().map(|f| f.interface).unwrap_or(InterfaceType::Unsupported)
    }

    /// Human-readable form, e.g. `Tap 3 / CAN B (cascade 1)`.
    pub fn describe(&self) -> String {
        let class = self.device_class();
        let func = self.function_info().map(|f| f.name.to_string()).unwrap_or_else(|| format!("Function {:#04x}", self.function()));
        match class {
            DeviceClass::Logger => format!("Logger / {} (cascade {})", func, self.cascade()),
            DeviceClass::Tap => format!("Tap {} / {} (cascade {})", self.device(), func, self.cascade()),
        }
    }
}

/// Reads an address word and emits it with its sub-fields. Used for source and destination.
pub(crate) fn read_address(
    cur: &mut ByteCursor<'_>,
    sink: &mut dyn FieldSink,
    name: &str,
) -> Result<Address, StepError> {
    let range = cur.range_ahead(2);
    let raw = cur.read_u16(Endianness::Little)?;
    let addr = Address(raw);
    let id = emit_word(sink, name, range, FieldValue::UInt16(raw), raw as u64, ADDRESS)?;
    sink.append_text(id, &addr.describe());
    Ok(addr)
}
