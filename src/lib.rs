#![no_std]
//! HDMI-CEC over a bit-banged open-drain line.
//!
//! [`Device`] is the line protocol: start bits, data/EOM/ACK bits,
//! arbitration, retransmission and logical address allocation, all derived
//! from line samples and microsecond timestamps. The hardware is reached only
//! through [`CecPort`]. [`Driver`] wraps a device for sharing between the
//! line polling context and the application.

#[macro_use]
mod fmt;

mod allocator;
mod buffer;
mod cec;
pub mod cec_types;
mod config;
mod driver;
mod error;
mod frame;
mod port;
pub mod timing;

#[cfg(feature = "rp2040")]
pub mod rp;

pub use buffer::{MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
pub use cec::{Device, State};
pub use cec_types::{CecDeviceType, CecOpCode, LogicalAddress, PhysicalAddress};
pub use config::DeviceConfig;
pub use driver::Driver;
pub use error::{FrameError, TransmitError};
pub use frame::{CecFrame, MAX_CEC_OPERANDS};
pub use port::CecPort;
