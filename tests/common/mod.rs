//! Simulated CEC wire: every participant can pull the line low, the line is
//! high only while nobody does. Time advances in fixed ticks and each device
//! is run once per tick.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use cec_bitbang::timing::{
    BIT_TIME, BIT_TIME_LOW_0, BIT_TIME_LOW_1, STARTBIT_TIME, STARTBIT_TIME_LOW,
};
use cec_bitbang::{CecDeviceType, CecPort, Device, DeviceConfig, LogicalAddress, PhysicalAddress};

pub const TICK: u32 = 10;

#[derive(Default)]
pub struct Wire {
    pulls: Vec<bool>,
    now: u32,
}

impl Wire {
    pub fn level(&self) -> bool {
        !self.pulls.iter().any(|pulled| *pulled)
    }
}

pub type SharedWire = Rc<RefCell<Wire>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Received { frame: Vec<u8>, ack: bool },
    Transmitted { frame: Vec<u8>, ack: bool },
    Ready(LogicalAddress),
}

pub struct SimPort {
    wire: SharedWire,
    slot: usize,
    pub events: Vec<Event>,
    /// Every `set_line_state` call as (time, level).
    pub drives: Vec<(u32, bool)>,
}

impl SimPort {
    pub fn attach(wire: &SharedWire) -> Self {
        let slot = {
            let mut wire = wire.borrow_mut();
            wire.pulls.push(false);
            wire.pulls.len() - 1
        };
        Self {
            wire: wire.clone(),
            slot,
            events: Vec::new(),
            drives: Vec::new(),
        }
    }

    pub fn received(&self) -> Vec<(Vec<u8>, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Received { frame, ack } => Some((frame.clone(), *ack)),
                _ => None,
            })
            .collect()
    }

    pub fn transmitted(&self) -> Vec<(Vec<u8>, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Transmitted { frame, ack } => Some((frame.clone(), *ack)),
                _ => None,
            })
            .collect()
    }

    pub fn ready(&self) -> Vec<LogicalAddress> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Ready(address) => Some(*address),
                _ => None,
            })
            .collect()
    }

    /// Low pulses of start bit length driven by this port, i.e. attempts.
    pub fn start_bits(&self) -> usize {
        self.drives
            .windows(2)
            .filter(|pair| {
                let (fall, low) = pair[0];
                let (rise, high) = pair[1];
                let width = rise.wrapping_sub(fall);
                !low && high && (STARTBIT_TIME_LOW - 50..=STARTBIT_TIME_LOW + 50).contains(&width)
            })
            .count()
    }
}

impl CecPort for SimPort {
    fn line_state(&mut self) -> bool {
        self.wire.borrow().level()
    }

    fn set_line_state(&mut self, high: bool) {
        let mut wire = self.wire.borrow_mut();
        wire.pulls[self.slot] = !high;
        self.drives.push((wire.now, high));
    }

    fn on_receive_complete(&mut self, frame: &[u8], ack: bool) {
        self.events.push(Event::Received {
            frame: frame.to_vec(),
            ack,
        });
    }

    fn on_transmit_complete(&mut self, frame: &[u8], ack: bool) {
        self.events.push(Event::Transmitted {
            frame: frame.to_vec(),
            ack,
        });
    }

    fn on_ready(&mut self, logical_address: LogicalAddress) {
        self.events.push(Event::Ready(logical_address));
    }
}

pub fn standalone_port() -> (SharedWire, SimPort) {
    let wire = SharedWire::default();
    let port = SimPort::attach(&wire);
    (wire, port)
}

pub struct Bus {
    wire: SharedWire,
    script_slot: usize,
    script: VecDeque<(u32, bool)>,
    pub devices: Vec<Device<SimPort>>,
}

impl Bus {
    pub fn new() -> Self {
        let wire = SharedWire::default();
        let script_slot = {
            let mut w = wire.borrow_mut();
            w.pulls.push(false);
            w.pulls.len() - 1
        };
        Self {
            wire,
            script_slot,
            script: VecDeque::new(),
            devices: Vec::new(),
        }
    }

    pub fn add_device(&mut self) -> usize {
        self.devices.push(Device::new(SimPort::attach(&self.wire)));
        self.devices.len() - 1
    }

    /// Adds a device, initializes it and runs the bus until it has an address.
    pub fn add_ready_device(&mut self, config: DeviceConfig) -> usize {
        let idx = self.add_device();
        self.devices[idx].initialize(&config);
        assert!(
            self.run_until(1_000_000, |bus| bus.devices[idx].is_ready()),
            "device {} never became ready",
            idx
        );
        // Let the bus settle past the last ACK.
        self.run_for(20 * BIT_TIME);
        idx
    }

    pub fn port(&self, idx: usize) -> &SimPort {
        self.devices[idx].port()
    }

    pub fn now(&self) -> u32 {
        self.wire.borrow().now
    }

    /// Moves the virtual clock, e.g. to just before the `u32` wrap.
    pub fn set_now(&mut self, now: u32) {
        self.wire.borrow_mut().now = now;
    }

    pub fn line(&self) -> bool {
        self.wire.borrow().level()
    }

    /// Pulls (or releases) the scripted participant immediately.
    pub fn pull(&mut self, low: bool) {
        let slot = self.script_slot;
        self.wire.borrow_mut().pulls[slot] = low;
    }

    pub fn schedule(&mut self, at: u32, low: bool) {
        self.script.push_back((at, low));
    }

    pub fn tick(&mut self) {
        let now = {
            let mut wire = self.wire.borrow_mut();
            wire.now = wire.now.wrapping_add(TICK);
            wire.now
        };
        while let Some(&(at, low)) = self.script.front() {
            if at > now {
                break;
            }
            self.script.pop_front();
            self.pull(low);
        }
        for device in self.devices.iter_mut() {
            device.run(now);
        }
    }

    pub fn run_for(&mut self, us: u32) {
        for _ in 0..us / TICK {
            self.tick();
        }
    }

    pub fn run_until(&mut self, limit_us: u32, mut done: impl FnMut(&Bus) -> bool) -> bool {
        for _ in 0..limit_us / TICK {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }

    /// Schedules a bit-level frame from a scripted initiator starting at
    /// `start`. The initiator sends 1 on every ACK bit and never checks it.
    /// Returns the time the last bit period ends.
    pub fn script_frame(&mut self, start: u32, bytes: &[u8]) -> u32 {
        self.schedule(start, true);
        self.schedule(start + STARTBIT_TIME_LOW, false);
        let mut t = start + STARTBIT_TIME;
        for (idx, byte) in bytes.iter().enumerate() {
            let mut bits: Vec<bool> = (0..8).map(|i| byte & (0x80 >> i) != 0).collect();
            bits.push(idx == bytes.len() - 1);
            bits.push(true);
            for bit in bits {
                t = self.script_bit(t, bit);
            }
        }
        t
    }

    pub fn script_bit(&mut self, start: u32, bit: bool) -> u32 {
        let low = if bit { BIT_TIME_LOW_1 } else { BIT_TIME_LOW_0 };
        self.schedule(start, true);
        self.schedule(start + low, false);
        start + BIT_TIME
    }
}

pub fn config(device_type: CecDeviceType, physical_address: u16) -> DeviceConfig {
    DeviceConfig::new(PhysicalAddress(physical_address), device_type)
}
