//! Electrical bit timing of the CEC line, in microseconds (CEC 5.2).

pub const STARTBIT_TIME_LOW: u32 = 3700;
pub const STARTBIT_TIME: u32 = 4500;
pub const STARTBIT_TIMEOUT: u32 = 5000;

pub const BIT_TIME_LOW_1: u32 = 600;
pub const BIT_TIME_LOW_0: u32 = 1500;
pub const BIT_TIME: u32 = 2400;
/// Nominal sample point of a data/ack bit, measured from its falling edge.
pub const BIT_TIME_SAMPLE: u32 = 1050;
/// Length of the low pulse a follower uses to flag a bit period error.
pub const BIT_TIME_ERR: u32 = 3600;
pub const BIT_TIMEOUT: u32 = 3000;

pub const BIT_TIME_LOW_MARGIN: u32 = 300;
pub const BIT_TIME_MARGIN: u32 = 450;

/// Settle time after the line was released (rising edge).
pub const MAX_RISE_TIME: u32 = 250;
/// Settle time after the line was pulled low (falling edge).
pub const MAX_FALL_TIME: u32 = 50;

pub const MAX_RETRANSMIT: u8 = 5;

/// Signal free time a contender waits before its start bit (CEC 9.1), in
/// nominal bit periods.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SignalFreeKind {
    SameInitiator = 7,
    NewInitiator = 5,
    Retransmit = 3,
}

impl SignalFreeKind {
    pub fn required_free_time(self) -> u32 {
        self as u32 * BIT_TIME
    }
}

pub fn within(elapsed: u32, nominal: u32, margin: u32) -> bool {
    elapsed >= nominal - margin && elapsed <= nominal + margin
}

/// Decodes the low phase of a data, EOM or ACK bit. `None` when the pulse
/// matches neither encoding.
pub fn decode_low_time(elapsed: u32) -> Option<bool> {
    if within(elapsed, BIT_TIME_LOW_1, BIT_TIME_LOW_MARGIN) {
        Some(true)
    } else if within(elapsed, BIT_TIME_LOW_0, BIT_TIME_LOW_MARGIN) {
        Some(false)
    } else {
        None
    }
}

pub fn low_time_of(bit: bool) -> u32 {
    if bit {
        BIT_TIME_LOW_1
    } else {
        BIT_TIME_LOW_0
    }
}
