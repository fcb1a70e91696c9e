use crate::cec_types::LogicalAddress;

/// Header plus the longest payload a CEC frame can carry.
pub const MAX_FRAME_LEN: usize = 16;
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - 1;

/// Bits arriving from the line, shifted in MSB first.
pub(crate) struct RxBuffer {
    data: [u8; MAX_FRAME_LEN],
    bits: usize,
}

impl RxBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; MAX_FRAME_LEN],
            bits: 0,
        }
    }

    pub fn reset(&mut self) {
        self.bits = 0;
    }

    /// Bits beyond the capacity are dropped.
    pub fn push_bit(&mut self, bit: bool) {
        let idx = self.bits >> 3;
        if idx < self.data.len() {
            self.data[idx] = (self.data[idx] << 1) | bit as u8;
            self.bits += 1;
        }
    }

    pub fn at_byte_boundary(&self) -> bool {
        self.bits & 7 == 0
    }

    pub fn len(&self) -> usize {
        self.bits >> 3
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Destination nibble of the header; only meaningful after the first byte.
    pub fn destination(&self) -> LogicalAddress {
        LogicalAddress::from_nibble(self.data[0])
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum FrameKind {
    /// Header-only <Polling Message>; answered by presence, never retried.
    Poll,
    Data,
}

/// The single pending outgoing frame and the transmit cursor over it.
pub(crate) struct TxBuffer {
    data: [u8; MAX_FRAME_LEN],
    len: usize,
    bit_idx: usize,
    kind: FrameKind,
}

impl TxBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; MAX_FRAME_LEN],
            len: 0,
            bit_idx: 0,
            kind: FrameKind::Data,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.len != 0
    }

    /// Caller guarantees nothing is pending and the payload fits.
    pub fn stage(&mut self, source: LogicalAddress, dest: LogicalAddress, payload: &[u8]) {
        self.data[0] = (source.0 << 4) | (dest.0 & 0x0f);
        self.data[1..=payload.len()].copy_from_slice(payload);
        self.len = payload.len() + 1;
        self.bit_idx = 0;
        self.kind = if payload.is_empty() {
            FrameKind::Poll
        } else {
            FrameKind::Data
        };
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn destination(&self) -> LogicalAddress {
        LogicalAddress::from_nibble(self.data[0])
    }

    pub fn rewind(&mut self) {
        self.bit_idx = 0;
    }

    pub fn at_byte_boundary(&self) -> bool {
        self.bit_idx & 7 == 0
    }

    /// Every staged byte has been clocked out.
    pub fn is_exhausted(&self) -> bool {
        self.bit_idx >> 3 == self.len
    }

    /// Returns the next bit, MSB first, and advances the cursor.
    pub fn next_bit(&mut self) -> bool {
        let byte = self.data[self.bit_idx >> 3];
        let bit = (byte << (self.bit_idx & 7)) & 0x80 != 0;
        self.bit_idx += 1;
        bit
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }
}
