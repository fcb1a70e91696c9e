use crate::cec_types::{CecDeviceType, PhysicalAddress};

/// Start-up parameters of a [`Device`](crate::Device).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub physical_address: PhysicalAddress,
    pub device_type: CecDeviceType,
    /// Deliver frames addressed to other devices as well.
    pub promiscuous: bool,
    /// Listen only: never acknowledge, arbitrate or transmit.
    pub monitor_mode: bool,
}

impl DeviceConfig {
    pub const fn new(physical_address: PhysicalAddress, device_type: CecDeviceType) -> Self {
        Self {
            physical_address,
            device_type,
            promiscuous: false,
            monitor_mode: false,
        }
    }

    pub const fn promiscuous(mut self, promiscuous: bool) -> Self {
        self.promiscuous = promiscuous;
        self
    }

    pub const fn monitor_mode(mut self, monitor_mode: bool) -> Self {
        self.monitor_mode = monitor_mode;
        self
    }
}
