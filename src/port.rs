use crate::cec_types::LogicalAddress;

/// Everything the protocol machine needs from its surroundings: one open-drain
/// line and three notifications.
pub trait CecPort {
    /// Sampled level of the shared line, `true` when released (high).
    fn line_state(&mut self) -> bool;

    /// `true` releases the line to its pulled-up idle level, `false` pulls it
    /// low. Never called while the device is in monitor mode.
    fn set_line_state(&mut self, high: bool);

    /// A frame ended by EOM or by a negative acknowledge. `frame` holds the
    /// header followed by the payload bytes received so far.
    fn on_receive_complete(&mut self, frame: &[u8], ack: bool);

    /// Final outcome of the pending frame: acknowledged, or given up on.
    fn on_transmit_complete(&mut self, frame: &[u8], ack: bool);

    /// Address allocation finished.
    fn on_ready(&mut self, logical_address: LogicalAddress);
}
