//! rp2040 binding: the CEC line on an open-drain GPIO, notifications through
//! embassy-sync primitives.

use defmt::Format;
use embassy_rp::gpio::OutputOpenDrain;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};

use crate::{CecFrame, CecPort, Driver, LogicalAddress, TransmitError};

/// Line sampling cadence; the bit timing needs better than 40µs.
pub const POLL_INTERVAL: Duration = Duration::from_micros(20);
const RATE_REPORT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone, Format)]
pub struct Received {
    pub frame: CecFrame,
    pub ack: bool,
}

static CEC_INCOMING_CHANNEL: Channel<CriticalSectionRawMutex, Received, 4> = Channel::new();
static CEC_SENDRESULT_SIGNAL: Signal<CriticalSectionRawMutex, bool> = Signal::new();
static CEC_READY_SIGNAL: Signal<CriticalSectionRawMutex, LogicalAddress> = Signal::new();

pub struct RpPort {
    pin: OutputOpenDrain<'static>,
}

impl RpPort {
    pub fn new(pin: OutputOpenDrain<'static>) -> Self {
        Self { pin }
    }
}

impl CecPort for RpPort {
    fn line_state(&mut self) -> bool {
        self.pin.is_high()
    }

    fn set_line_state(&mut self, high: bool) {
        if high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }

    fn on_receive_complete(&mut self, frame: &[u8], ack: bool) {
        match CecFrame::from_bytes(frame) {
            Ok(frame) => {
                if CEC_INCOMING_CHANNEL.try_send(Received { frame, ack }).is_err() {
                    warn!("incoming queue full, frame dropped");
                }
            }
            Err(e) => warn!("bad frame: {}", e),
        }
    }

    fn on_transmit_complete(&mut self, _frame: &[u8], ack: bool) {
        CEC_SENDRESULT_SIGNAL.signal(ack);
    }

    fn on_ready(&mut self, logical_address: LogicalAddress) {
        CEC_READY_SIGNAL.signal(logical_address);
    }
}

pub type CecDriver = Driver<CriticalSectionRawMutex, RpPort>;

#[embassy_executor::task]
pub async fn cec_line_handler(driver: &'static CecDriver) {
    let mut ticker = Ticker::every(POLL_INTERVAL);
    let mut polls = 0u32;
    let mut skipped = 0u32;
    let mut report_at = Instant::now() + RATE_REPORT_INTERVAL;
    loop {
        ticker.next().await;
        let now = Instant::now();
        if driver.poll(now.as_micros() as u32) {
            polls += 1;
        } else {
            skipped += 1;
        }
        if now >= report_at {
            debug!("line polled {} times in 10s, {} skipped", polls, skipped);
            polls = 0;
            skipped = 0;
            report_at = now + RATE_REPORT_INTERVAL;
        }
    }
}

/// Resolves once address allocation is done.
pub async fn wait_ready() -> LogicalAddress {
    CEC_READY_SIGNAL.wait().await
}

pub async fn receive() -> Received {
    CEC_INCOMING_CHANNEL.receive().await
}

#[derive(Format)]
pub enum CecSendError {
    Rejected(TransmitError),
    Nack,
}

static SEND_MUTEX: Mutex<CriticalSectionRawMutex, ()> = Mutex::new(());

/// Queues a frame and waits for its final acknowledge outcome.
pub async fn send_with_result(
    driver: &CecDriver,
    dest: LogicalAddress,
    payload: &[u8],
) -> Result<(), CecSendError> {
    let _guard = SEND_MUTEX.lock().await;
    CEC_SENDRESULT_SIGNAL.reset();
    driver
        .transmit_frame(dest, payload)
        .await
        .map_err(CecSendError::Rejected)?;
    if CEC_SENDRESULT_SIGNAL.wait().await {
        Ok(())
    } else {
        Err(CecSendError::Nack)
    }
}
