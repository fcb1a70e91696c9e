use core::fmt;

use heapless::Vec;

use crate::buffer::{MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
use crate::cec_types::{CecOpCode, LogicalAddress};
use crate::error::FrameError;

pub const MAX_CEC_OPERANDS: usize = MAX_PAYLOAD_LEN - 1;

/// A decoded frame: header split into addresses, then opcode and operands.
#[derive(Default, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CecFrame {
    pub initiator: LogicalAddress,
    pub dest: LogicalAddress,
    pub opcode: Option<u8>,
    pub operands: Vec<u8, MAX_CEC_OPERANDS>,
}

impl CecFrame {
    pub fn from_bytes(bytes: &[u8]) -> Result<CecFrame, FrameError> {
        let (&header, payload) = bytes.split_first().ok_or(FrameError::Empty)?;
        if bytes.len() > MAX_FRAME_LEN {
            return Err(FrameError::TooLong);
        }
        let operands = payload.get(1..).unwrap_or(&[]);
        Ok(CecFrame {
            initiator: LogicalAddress::from_nibble(header >> 4),
            dest: LogicalAddress::from_nibble(header),
            opcode: payload.first().copied(),
            operands: Vec::from_slice(operands).map_err(|_| FrameError::TooLong)?,
        })
    }

    pub fn header(&self) -> u8 {
        (self.initiator.0 << 4) | (self.dest.0 & 0x0f)
    }

    /// Opcode followed by operands, the part handed to `transmit_frame`.
    pub fn payload(&self) -> Vec<u8, MAX_PAYLOAD_LEN> {
        let mut payload = Vec::new();
        if let Some(opcode) = self.opcode {
            // Capacity is one more than the operand capacity, so neither fails.
            let _ = payload.push(opcode);
            let _ = payload.extend_from_slice(&self.operands);
        }
        payload
    }

    pub fn is_polling_message(&self) -> bool {
        self.initiator == self.dest && self.opcode.is_none()
    }

    pub fn opcode_name(&self) -> Option<&'static str> {
        self.opcode.and_then(CecOpCode::name_of)
    }
}

/// `RX`/`TX` log rendering: `(src->dst) 4F:84:20:00:05`.
impl fmt::Display for CecFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}->{}) {:02X}", self.initiator, self.dest, self.header())?;
        for byte in self.opcode.iter().chain(self.operands.iter()) {
            write!(f, ":{:02X}", byte)?;
        }
        Ok(())
    }
}
