use crate::allocator::{Allocator, Step};
use crate::buffer::{FrameKind, RxBuffer, TxBuffer, MAX_PAYLOAD_LEN};
use crate::cec_types::{CecDeviceType, LogicalAddress, PhysicalAddress};
use crate::config::DeviceConfig;
use crate::error::TransmitError;
use crate::port::CecPort;
use crate::timing::{
    decode_low_time, low_time_of, within, SignalFreeKind, BIT_TIME, BIT_TIMEOUT, BIT_TIME_ERR,
    BIT_TIME_LOW_0, BIT_TIME_LOW_MARGIN, BIT_TIME_MARGIN, BIT_TIME_SAMPLE, MAX_FALL_TIME,
    MAX_RETRANSMIT, MAX_RISE_TIME, STARTBIT_TIME, STARTBIT_TIMEOUT, STARTBIT_TIME_LOW,
};

/// Phase of the line protocol. `*1` phases wait for the rising edge that ends
/// the low part of a bit, `*2` phases for the falling edge that starts the
/// next one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Idle,
    RxStartBit1,
    RxStartBit2,
    RxDataBit1,
    RxDataBit2,
    RxEom1,
    RxEom2,
    RxAck1,
    RxAck2,
    /// Holding the line low as follower ACK or broadcast NAK.
    RxAckSent,
    RxLineError,
    /// Waiting out the signal free time before contending.
    TxWait,
    TxStartBit1,
    TxStartBit2,
    TxDataBit1,
    TxDataBit2,
    TxEom1,
    TxEom2,
    TxAck1,
    TxAck2,
    TxAckTest,
    /// Follower still holds its ACK low.
    TxAckWait,
}

impl State {
    /// An edge we did not cause in these states means another initiator is
    /// driving the bus. Followers legitimately pull the line during the ACK
    /// test and wait phases.
    fn yields_on_edge(self) -> bool {
        matches!(
            self,
            State::TxWait
                | State::TxStartBit1
                | State::TxStartBit2
                | State::TxDataBit1
                | State::TxDataBit2
                | State::TxEom1
                | State::TxEom2
                | State::TxAck1
                | State::TxAck2
        )
    }

    pub fn is_transmitting(self) -> bool {
        self.yields_on_edge() || matches!(self, State::TxAckTest | State::TxAckWait)
    }
}

/// One CEC endpoint driven entirely by line sampling.
///
/// [`run`](Device::run) must be called at least every 40µs or on every line
/// edge; it never blocks. A device is inert until
/// [`initialize`](Device::initialize) is called.
pub struct Device<P: CecPort> {
    port: P,
    state: State,

    physical_address: PhysicalAddress,
    device_type: CecDeviceType,
    logical_address: Option<LogicalAddress>,
    promiscuous: bool,
    monitor_mode: bool,

    rx: RxBuffer,
    tx: TxBuffer,
    allocator: Allocator,
    retries: u8,

    ack: bool,
    eom: bool,
    follower: bool,
    broadcast: bool,
    last_transmitter: bool,

    last_line: bool,
    line_set_time: u32,
    bit_start_time: u32,
    wait_time: u32,
}

impl<P: CecPort> Device<P> {
    pub const fn new(port: P) -> Self {
        Self {
            port,
            state: State::Idle,
            physical_address: PhysicalAddress::INVALID,
            device_type: CecDeviceType::RESERVED,
            logical_address: None,
            promiscuous: false,
            monitor_mode: true,
            rx: RxBuffer::new(),
            tx: TxBuffer::new(),
            allocator: Allocator::new(),
            retries: 0,
            ack: false,
            eom: false,
            follower: false,
            broadcast: false,
            last_transmitter: false,
            last_line: true,
            line_set_time: 0,
            bit_start_time: 0,
            wait_time: 0,
        }
    }

    /// Binds the configuration and, when the device type allocates and the
    /// physical address is valid, queues the first <Polling Message>.
    pub fn initialize(&mut self, config: &DeviceConfig) {
        self.physical_address = config.physical_address;
        self.device_type = config.device_type;
        self.promiscuous = config.promiscuous;
        self.monitor_mode = config.monitor_mode;
        self.logical_address = None;
        self.tx.clear();
        self.retries = 0;

        let allocates = self.physical_address.is_valid() && !self.monitor_mode;
        let candidates: &'static [LogicalAddress] = if allocates {
            self.device_type.candidate_addresses()
        } else {
            &[]
        };
        match self.allocator.start(candidates) {
            Some(first) => {
                debug!("polling logical address {}", first);
                self.tx.stage(first, first, &[]);
            }
            None => info!("no logical address allocation"),
        }
    }

    /// Queues `payload` (opcode and operands) for `dest`. The frame goes out
    /// once the bus has been free long enough.
    pub fn transmit_frame(
        &mut self,
        dest: LogicalAddress,
        payload: &[u8],
    ) -> Result<(), TransmitError> {
        let source = self.logical_address.ok_or(TransmitError::NotReady)?;
        self.stage(source, dest, payload)
    }

    fn stage(
        &mut self,
        source: LogicalAddress,
        dest: LogicalAddress,
        payload: &[u8],
    ) -> Result<(), TransmitError> {
        if self.monitor_mode {
            return Err(TransmitError::MonitorMode);
        }
        if self.tx.is_pending() {
            return Err(TransmitError::Busy);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(TransmitError::TooLong);
        }
        self.tx.stage(source, dest, payload);
        self.retries = 0;
        Ok(())
    }

    /// Advances the protocol. `now` is a free running microsecond counter;
    /// wraparound is fine.
    pub fn run(&mut self, now: u32) {
        let settle = if self.last_line {
            MAX_RISE_TIME
        } else {
            MAX_FALL_TIME
        };
        if now.wrapping_sub(self.line_set_time) < settle {
            return;
        }

        let mut line = self.port.line_state();
        let elapsed = now.wrapping_sub(self.bit_start_time);
        if line == self.last_line && self.wait_time > elapsed {
            return;
        }

        if line != self.last_line && self.state.yields_on_edge() {
            debug!("lost arbitration, listening");
            self.state = State::Idle;
        }

        self.wait_time = 0;
        self.state = self.step(now, elapsed, &mut line);
        self.last_line = line;
    }

    fn step(&mut self, now: u32, elapsed: u32, line: &mut bool) -> State {
        match self.state {
            State::Idle => self.idle(now, *line),

            State::RxStartBit1 => {
                if within(elapsed, STARTBIT_TIME_LOW, BIT_TIME_LOW_MARGIN) {
                    self.wait_time = STARTBIT_TIMEOUT;
                    State::RxStartBit2
                } else {
                    trace!("start bit low for {}us", elapsed);
                    State::Idle
                }
            }
            State::RxStartBit2 => {
                if within(elapsed, STARTBIT_TIME, BIT_TIME_MARGIN) {
                    self.bit_start_time = now;
                    self.wait_time = BIT_TIMEOUT;
                    State::RxDataBit1
                } else {
                    trace!("start bit period {}us", elapsed);
                    State::Idle
                }
            }

            State::RxDataBit1 => {
                let bit = self.receive_bit(elapsed);
                self.rx.push_bit(bit);
                self.wait_time = BIT_TIMEOUT;
                State::RxDataBit2
            }
            State::RxEom1 => {
                self.eom = self.receive_bit(elapsed);
                self.wait_time = BIT_TIMEOUT;
                State::RxEom2
            }
            State::RxAck1 => {
                let bit = self.receive_bit(elapsed);
                // A pulled-down ACK bit acknowledges unicast and rejects broadcast.
                self.ack = bit == self.broadcast;
                if self.eom || !self.ack {
                    self.finish_receive();
                    State::Idle
                } else {
                    self.wait_time = BIT_TIMEOUT;
                    State::RxAck2
                }
            }
            State::RxDataBit2 | State::RxEom2 | State::RxAck2 => {
                self.receive_bit_end(now, elapsed, line)
            }
            State::RxAckSent => {
                self.drive(true, now, line);
                if self.eom || !self.ack {
                    self.finish_receive();
                    State::Idle
                } else {
                    self.wait_time = BIT_TIMEOUT;
                    State::RxAck2
                }
            }
            State::RxLineError => {
                self.drive(true, now, line);
                State::Idle
            }

            State::TxWait => {
                self.drive(false, now, line);
                self.bit_start_time = now;
                self.tx.rewind();
                self.retries += 1;
                self.last_transmitter = true;
                self.broadcast = self.tx.destination().is_broadcast();
                self.wait_time = STARTBIT_TIME_LOW;
                State::TxStartBit1
            }
            State::TxStartBit1 => {
                self.drive(true, now, line);
                self.wait_time = STARTBIT_TIME;
                State::TxStartBit2
            }
            State::TxDataBit1 => {
                self.drive(true, now, line);
                self.wait_time = BIT_TIME;
                State::TxDataBit2
            }
            State::TxEom1 => {
                self.drive(true, now, line);
                self.wait_time = BIT_TIME;
                State::TxEom2
            }
            State::TxStartBit2 | State::TxDataBit2 | State::TxEom2 | State::TxAck2 => {
                self.drive(false, now, line);
                self.bit_start_time = now;
                let (bit, next) = match self.state {
                    State::TxDataBit2 if self.tx.at_byte_boundary() => {
                        self.eom = self.tx.is_exhausted();
                        (self.eom, State::TxEom1)
                    }
                    // The initiator sends a 1 and lets followers pull it down.
                    State::TxEom2 => (true, State::TxAck1),
                    _ => (self.tx.next_bit(), State::TxDataBit1),
                };
                self.wait_time = low_time_of(bit);
                next
            }
            State::TxAck1 => {
                self.drive(true, now, line);
                self.wait_time = BIT_TIME_SAMPLE;
                State::TxAckTest
            }
            State::TxAckTest => {
                if *line != self.broadcast {
                    self.transmit_attempt_failed();
                    State::Idle
                } else if self.eom {
                    self.finish_transmit(true);
                    State::Idle
                } else {
                    self.wait_time = BIT_TIME;
                    if *line {
                        State::TxAck2
                    } else {
                        State::TxAckWait
                    }
                }
            }
            State::TxAckWait => {
                self.wait_time = BIT_TIME;
                State::TxAck2
            }
        }
    }

    fn idle(&mut self, now: u32, line: bool) -> State {
        if !line {
            // Falling edge of a start bit.
            self.rx.reset();
            self.bit_start_time = now;
            self.ack = true;
            self.follower = false;
            self.broadcast = false;
            self.last_transmitter = false;
            self.wait_time = STARTBIT_TIMEOUT;
            return State::RxStartBit1;
        }
        if !self.tx.is_pending() {
            return State::Idle;
        }
        if self.retries > MAX_RETRANSMIT {
            if self.allocator.is_probing() {
                // Outbid every time, never refused: the address is still unknown.
                debug!("poll lost arbitration {} times, starting over", self.retries);
                self.retries = 0;
            } else {
                warn!("giving up after {} attempts", self.retries);
                self.finish_transmit(false);
                return State::Idle;
            }
        }
        let free_time = if self.retries > 0 {
            SignalFreeKind::Retransmit
        } else if self.last_transmitter {
            SignalFreeKind::SameInitiator
        } else {
            SignalFreeKind::NewInitiator
        };
        self.wait_time = free_time.required_free_time();
        State::TxWait
    }

    /// Decodes the low phase just ended. Out of tolerance pulses read as 1
    /// and poison the acknowledge of the whole frame.
    fn receive_bit(&mut self, elapsed: u32) -> bool {
        match decode_low_time(elapsed) {
            Some(bit) => bit,
            None => {
                trace!("bit low for {}us, will NAK", elapsed);
                self.ack = false;
                true
            }
        }
    }

    fn receive_bit_end(&mut self, now: u32, elapsed: u32, line: &mut bool) -> State {
        if elapsed > BIT_TIME + BIT_TIME_MARGIN {
            trace!("bit period timed out");
            return State::Idle;
        }
        self.bit_start_time = now;
        if elapsed >= BIT_TIME - BIT_TIME_MARGIN {
            if self.state == State::RxEom2 {
                return self.acknowledge(now, line);
            }
            self.wait_time = BIT_TIMEOUT;
            return if self.state == State::RxDataBit2 && self.rx.at_byte_boundary() {
                State::RxEom1
            } else {
                State::RxDataBit1
            };
        }

        // Bit period too short: hold the line low long enough for every
        // initiator to notice.
        if self.monitor_mode {
            return State::Idle;
        }
        debug!("bit period of {}us, flagging line error", elapsed);
        self.drive(false, now, line);
        self.wait_time = BIT_TIME_ERR;
        State::RxLineError
    }

    /// Falling edge of the ACK bit: decide whether to pull it down.
    fn acknowledge(&mut self, now: u32, line: &mut bool) -> State {
        self.wait_time = BIT_TIMEOUT;
        let dest = self.rx.destination();
        if dest.is_broadcast() {
            self.broadcast = true;
        } else if Some(dest) == self.logical_address {
            self.follower = true;
        }

        if (self.follower && self.ack) || (self.broadcast && !self.ack) {
            self.drive(false, now, line);
            self.wait_time = BIT_TIME_LOW_0;
            State::RxAckSent
        } else if !self.ack || (!self.promiscuous && !self.broadcast) {
            State::Idle
        } else {
            State::RxAck1
        }
    }

    fn finish_receive(&mut self) {
        debug!("received {} bytes, ack {}", self.rx.len(), self.ack);
        self.port.on_receive_complete(self.rx.as_slice(), self.ack);
    }

    fn transmit_attempt_failed(&mut self) {
        if self.tx.kind() == FrameKind::Poll || self.retries > MAX_RETRANSMIT {
            self.finish_transmit(false);
        } else {
            debug!(
                "no acknowledge, attempt {} of {}",
                self.retries,
                MAX_RETRANSMIT + 1
            );
        }
    }

    fn finish_transmit(&mut self, acked: bool) {
        let kind = self.tx.kind();
        self.port.on_transmit_complete(self.tx.as_slice(), acked);
        self.tx.clear();
        if kind == FrameKind::Poll {
            self.advance_allocation(acked);
        }
    }

    fn advance_allocation(&mut self, acked: bool) {
        match self.allocator.probe_result(acked) {
            Some(Step::Probe(next)) => {
                debug!("logical address taken, polling {}", next);
                self.tx.stage(next, next, &[]);
                self.retries = 0;
            }
            Some(Step::Claim(address)) => {
                info!("claimed logical address {}", address);
                self.logical_address = Some(address);
                self.port.on_ready(address);
            }
            None => {}
        }
    }

    fn drive(&mut self, high: bool, now: u32, line: &mut bool) {
        if self.monitor_mode {
            return;
        }
        self.port.set_line_state(high);
        *line = high;
        self.line_set_time = now;
    }

    pub fn set_promiscuous(&mut self, promiscuous: bool) {
        self.promiscuous = promiscuous;
    }

    /// Entering monitor mode releases the line and drops the pending frame.
    pub fn set_monitor_mode(&mut self, monitor_mode: bool) {
        if monitor_mode && !self.monitor_mode {
            self.port.set_line_state(true);
            self.tx.clear();
            self.state = State::Idle;
        }
        self.monitor_mode = monitor_mode;
    }

    pub fn logical_address(&self) -> Option<LogicalAddress> {
        self.logical_address
    }

    pub fn is_ready(&self) -> bool {
        self.logical_address.is_some()
    }

    pub fn physical_address(&self) -> PhysicalAddress {
        self.physical_address
    }

    pub fn device_type(&self) -> CecDeviceType {
        self.device_type
    }

    pub fn is_promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn is_monitor_mode(&self) -> bool {
        self.monitor_mode
    }

    pub fn is_transmit_pending(&self) -> bool {
        self.tx.is_pending()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
