use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard, TryLockError};

use crate::cec::Device;
use crate::cec_types::LogicalAddress;
use crate::error::TransmitError;
use crate::port::CecPort;

/// Owns a [`Device`] and serialises access to it.
///
/// The line side calls [`poll`](Driver::poll) from its timer or edge context;
/// the application side locks the device to queue frames. A poll that finds
/// the device locked does nothing, the next one catches up.
pub struct Driver<M: RawMutex, P: CecPort> {
    device: Mutex<M, Device<P>>,
}

impl<M: RawMutex, P: CecPort> Driver<M, P> {
    pub const fn new(device: Device<P>) -> Self {
        Self {
            device: Mutex::new(device),
        }
    }

    /// Runs the protocol once unless someone else holds the device. Returns
    /// whether it ran.
    pub fn poll(&self, now: u32) -> bool {
        match self.device.try_lock() {
            Ok(mut device) => {
                device.run(now);
                true
            }
            Err(TryLockError) => false,
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, M, Device<P>> {
        self.device.lock().await
    }

    pub fn try_lock(&self) -> Result<MutexGuard<'_, M, Device<P>>, TryLockError> {
        self.device.try_lock()
    }

    pub async fn transmit_frame(
        &self,
        dest: LogicalAddress,
        payload: &[u8],
    ) -> Result<(), TransmitError> {
        self.lock().await.transmit_frame(dest, payload)
    }
}
