use core::fmt;

/// Why a frame was not accepted for transmission. The device is left
/// untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// No logical address has been claimed yet.
    NotReady,
    /// Monitor mode never drives the line.
    MonitorMode,
    /// A previous frame is still waiting to be sent.
    Busy,
    /// Payload longer than 15 bytes.
    TooLong,
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransmitError::NotReady => "no logical address claimed",
            TransmitError::MonitorMode => "monitor mode is active",
            TransmitError::Busy => "a frame is already pending",
            TransmitError::TooLong => "payload exceeds 15 bytes",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Not even a header byte was received.
    Empty,
    TooLong,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameError::Empty => "no blocks",
            FrameError::TooLong => "more than 16 blocks",
        })
    }
}
