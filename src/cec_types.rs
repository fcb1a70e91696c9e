//! Addressing and message vocabulary of the CEC bus (HDMI 1.4 supplement 1).

use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{EnumIter, IntoStaticStr};

/// 4-bit bus identity. Address 15 doubles as broadcast (as destination) and
/// unregistered (as initiator).
#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalAddress(pub u8);

impl LogicalAddress {
    pub const TV: LogicalAddress = LogicalAddress(0);
    pub const RECORDING_DEVICE_1: LogicalAddress = LogicalAddress(1);
    pub const RECORDING_DEVICE_2: LogicalAddress = LogicalAddress(2);
    pub const TUNER_1: LogicalAddress = LogicalAddress(3);
    pub const PLAYBACK_DEVICE_1: LogicalAddress = LogicalAddress(4);
    pub const AUDIO_SYSTEM: LogicalAddress = LogicalAddress(5);
    pub const TUNER_2: LogicalAddress = LogicalAddress(6);
    pub const TUNER_3: LogicalAddress = LogicalAddress(7);
    pub const PLAYBACK_DEVICE_2: LogicalAddress = LogicalAddress(8);
    pub const RECORDING_DEVICE_3: LogicalAddress = LogicalAddress(9);
    pub const TUNER_4: LogicalAddress = LogicalAddress(10);
    pub const PLAYBACK_DEVICE_3: LogicalAddress = LogicalAddress(11);
    pub const FREE_USE: LogicalAddress = LogicalAddress(14);
    pub const UNREGISTERED: LogicalAddress = LogicalAddress(15);
    pub const BROADCAST: LogicalAddress = LogicalAddress(15);

    /// Keeps the low nibble only, the way the address is carried in a header.
    pub const fn from_nibble(value: u8) -> LogicalAddress {
        LogicalAddress(value & 0x0f)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn broadcast() -> LogicalAddress {
        Self::BROADCAST
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 16-bit topology address (n.n.n.n), assigned by HDMI wiring.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalAddress(pub u16);

impl PhysicalAddress {
    pub const INVALID: PhysicalAddress = PhysicalAddress(0xffff);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl Default for PhysicalAddress {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [hi, lo] = self.0.to_be_bytes();
        write!(f, "{}.{}.{}.{}", hi >> 4, hi & 0x0f, lo >> 4, lo & 0x0f)
    }
}

const TV_ADDRESSES: [LogicalAddress; 3] = [
    LogicalAddress::TV,
    LogicalAddress::FREE_USE,
    LogicalAddress::UNREGISTERED,
];
const RECORDING_ADDRESSES: [LogicalAddress; 4] = [
    LogicalAddress::RECORDING_DEVICE_1,
    LogicalAddress::RECORDING_DEVICE_2,
    LogicalAddress::RECORDING_DEVICE_3,
    LogicalAddress::UNREGISTERED,
];
const TUNER_ADDRESSES: [LogicalAddress; 5] = [
    LogicalAddress::TUNER_1,
    LogicalAddress::TUNER_2,
    LogicalAddress::TUNER_3,
    LogicalAddress::TUNER_4,
    LogicalAddress::UNREGISTERED,
];
const PLAYBACK_ADDRESSES: [LogicalAddress; 4] = [
    LogicalAddress::PLAYBACK_DEVICE_1,
    LogicalAddress::PLAYBACK_DEVICE_2,
    LogicalAddress::PLAYBACK_DEVICE_3,
    LogicalAddress::UNREGISTERED,
];
const AUDIO_SYSTEM_ADDRESSES: [LogicalAddress; 2] =
    [LogicalAddress::AUDIO_SYSTEM, LogicalAddress::UNREGISTERED];

#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(
    IntoPrimitive, TryFromPrimitive, IntoStaticStr, EnumIter, Clone, Copy, PartialEq, Eq, Debug,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CecDeviceType {
    TV = 0,
    RECORDING_DEVICE = 1,
    RESERVED = 2,
    TUNER = 3,
    PLAYBACK_DEVICE = 4,
    AUDIO_SYSTEM = 5,
    PURE_CEC_SWITCH = 6,
    VIDEO_PROCESSOR = 7,
}

impl CecDeviceType {
    /// Logical addresses this type may claim, in priority order, always
    /// ending with [`LogicalAddress::UNREGISTERED`]. Empty for types that
    /// never take part in allocation.
    pub fn candidate_addresses(self) -> &'static [LogicalAddress] {
        match self {
            CecDeviceType::TV => &TV_ADDRESSES,
            CecDeviceType::RECORDING_DEVICE => &RECORDING_ADDRESSES,
            CecDeviceType::TUNER => &TUNER_ADDRESSES,
            CecDeviceType::PLAYBACK_DEVICE => &PLAYBACK_ADDRESSES,
            CecDeviceType::AUDIO_SYSTEM => &AUDIO_SYSTEM_ADDRESSES,
            CecDeviceType::RESERVED
            | CecDeviceType::PURE_CEC_SWITCH
            | CecDeviceType::VIDEO_PROCESSOR => &[],
        }
    }
}

#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(IntoPrimitive, TryFromPrimitive, IntoStaticStr, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CecOpCode {
    FEATURE_ABORT = 0x00,
    IMAGE_VIEW_ON = 0x04,
    TUNER_STEP_INCREMENT = 0x05,
    TUNER_STEP_DECREMENT = 0x06,
    TUNER_DEVICE_STATUS = 0x07,
    GIVE_TUNER_DEVICE_STATUS = 0x08,
    RECORD_ON = 0x09,
    RECORD_STATUS = 0x0a,
    RECORD_OFF = 0x0b,
    TEXT_VIEW_ON = 0x0d,
    RECORD_TV_SCREEN = 0x0f,
    GIVE_DECK_STATUS = 0x1a,
    DECK_STATUS = 0x1b,
    SET_MENU_LANGUAGE = 0x32,
    CLEAR_ANALOGUE_TIMER = 0x33,
    SET_ANALOGUE_TIMER = 0x34,
    TIMER_STATUS = 0x35,
    STANDBY = 0x36,
    PLAY = 0x41,
    DECK_CONTROL = 0x42,
    TIMER_CLEARED_STATUS = 0x43,
    USER_CONTROL_PRESSED = 0x44,
    USER_CONTROL_RELEASED = 0x45,
    GIVE_OSD_NAME = 0x46,
    SET_OSD_NAME = 0x47,
    SET_OSD_STRING = 0x64,
    SET_TIMER_PROGRAM_TITLE = 0x67,
    SYSTEM_AUDIO_MODE_REQUEST = 0x70,
    GIVE_AUDIO_STATUS = 0x71,
    SET_SYSTEM_AUDIO_MODE = 0x72,
    REPORT_AUDIO_STATUS = 0x7a,
    GIVE_SYSTEM_AUDIO_MODE_STATUS = 0x7d,
    SYSTEM_AUDIO_MODE_STATUS = 0x7e,
    ROUTING_CHANGE = 0x80,
    ROUTING_INFORMATION = 0x81,
    ACTIVE_SOURCE = 0x82,
    GIVE_PHYSICAL_ADDRESS = 0x83,
    REPORT_PHYSICAL_ADDRESS = 0x84,
    REQUEST_ACTIVE_SOURCE = 0x85,
    SET_STREAM_PATH = 0x86,
    DEVICE_VENDOR_ID = 0x87,
    VENDOR_COMMAND = 0x89,
    VENDOR_REMOTE_BUTTON_DOWN = 0x8a,
    VENDOR_REMOTE_BUTTON_UP = 0x8b,
    GIVE_DEVICE_VENDOR_ID = 0x8c,
    MENU_REQUEST = 0x8d,
    MENU_STATUS = 0x8e,
    GIVE_DEVICE_POWER_STATUS = 0x8f,
    REPORT_POWER_STATUS = 0x90,
    GET_MENU_LANGUAGE = 0x91,
    SELECT_ANALOGUE_SERVICE = 0x92,
    SELECT_DIGITAL_SERVICE = 0x93,
    SET_DIGITAL_TIMER = 0x97,
    CLEAR_DIGITAL_TIMER = 0x99,
    SET_AUDIO_RATE = 0x9a,
    INACTIVE_SOURCE = 0x9d,
    CEC_VERSION = 0x9e,
    GET_CEC_VERSION = 0x9f,
    VENDOR_COMMAND_WITH_ID = 0xa0,
    CLEAR_EXTERNAL_TIMER = 0xa1,
    SET_EXTERNAL_TIMER = 0xa2,
    REPORT_SHORT_AUDIO_DESCRIPTOR = 0xa3,
    REQUEST_SHORT_AUDIO_DESCRIPTOR = 0xa4,
    INITIATE_ARC = 0xc0,
    REPORT_ARC_INITIATED = 0xc1,
    REPORT_ARC_TERMINATED = 0xc2,
    REQUEST_ARC_INITIATION = 0xc3,
    REQUEST_ARC_TERMINATION = 0xc4,
    TERMINATE_ARC = 0xc5,
    CDC_MESSAGE = 0xf8,
    ABORT = 0xff,
}

impl CecOpCode {
    /// Human readable opcode name, or `None` for codes outside the table.
    pub fn name_of(opcode: u8) -> Option<&'static str> {
        CecOpCode::try_from(opcode).ok().map(|op| op.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn allocating_types_end_with_unregistered() {
        for device_type in CecDeviceType::iter() {
            let candidates = device_type.candidate_addresses();
            if let Some(last) = candidates.last() {
                assert_eq!(*last, LogicalAddress::UNREGISTERED);
                assert!(candidates[..candidates.len() - 1]
                    .iter()
                    .all(|a| *a != LogicalAddress::UNREGISTERED));
            }
        }
    }

    #[test]
    fn only_non_allocating_types_have_no_candidates() {
        let empty: heapless::Vec<CecDeviceType, 8> = CecDeviceType::iter()
            .filter(|t| t.candidate_addresses().is_empty())
            .collect();
        assert_eq!(
            empty.as_slice(),
            &[
                CecDeviceType::RESERVED,
                CecDeviceType::PURE_CEC_SWITCH,
                CecDeviceType::VIDEO_PROCESSOR
            ]
        );
    }

    #[test]
    fn device_type_round_trips_through_its_wire_value() {
        assert_eq!(u8::from(CecDeviceType::AUDIO_SYSTEM), 5);
        assert_eq!(
            CecDeviceType::try_from(4u8).ok(),
            Some(CecDeviceType::PLAYBACK_DEVICE)
        );
        assert!(CecDeviceType::try_from(8u8).is_err());
    }

    #[test]
    fn opcode_names() {
        assert_eq!(CecOpCode::name_of(0x83), Some("GIVE_PHYSICAL_ADDRESS"));
        assert_eq!(CecOpCode::name_of(0x01), None);
    }

    #[test]
    fn physical_address_renders_dotted() {
        extern crate std;
        use std::string::ToString;
        assert_eq!(PhysicalAddress(0x2100).to_string(), "2.1.0.0");
        assert!(!PhysicalAddress::INVALID.is_valid());
    }
}
