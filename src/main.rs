#![no_std]
#![no_main]

use core::fmt::Write;

use cec_bitbang::rp::{self, CecDriver, RpPort};
use cec_bitbang::{
    CecDeviceType, CecOpCode, Device, DeviceConfig, Driver, LogicalAddress, PhysicalAddress,
};
use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Level, OutputOpenDrain};
use embassy_rp::i2c::{self, I2c};
use embassy_time::{Duration, Instant, Timer};
use heapless::String;
use ssd1306::mode::DisplayConfig;
use ssd1306::prelude::Brightness;
use ssd1306::rotation::DisplayRotation;
use ssd1306::size::DisplaySize128x64;
use ssd1306::{I2CDisplayInterface, Ssd1306};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

const PHYSICAL_ADDRESS: PhysicalAddress = PhysicalAddress(0x2000);
const DEVICE_TYPE: CecDeviceType = CecDeviceType::AUDIO_SYSTEM;
const ALIVE_INTERVAL: Duration = Duration::from_secs(5);

static DRIVER: StaticCell<CecDriver> = StaticCell::new();

/// The display is best effort: a failed write is logged and the CEC side
/// carries on.
fn check_display<T, E>(what: &str, result: Result<T, E>) {
    if result.is_err() {
        warn!("display {} failed", what);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    info!("set up i2c ");
    let mut config = i2c::Config::default();
    config.frequency = 1_000_000;
    let i2c = I2c::new_blocking(p.I2C1, p.PIN_15, p.PIN_14, config);

    let interface = I2CDisplayInterface::new(i2c);
    let mut terminal =
        Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0).into_terminal_mode();
    check_display("init", terminal.init());
    check_display("clear", terminal.clear());
    check_display("brightness", terminal.set_brightness(Brightness::NORMAL));
    check_display("power on", terminal.set_display_on(true));
    check_display("write", terminal.write_str("Hi, I'm CEC-Igel"));

    let cec0 = OutputOpenDrain::new(p.PIN_0, Level::High);
    let mut device = Device::new(RpPort::new(cec0));
    device.initialize(&DeviceConfig::new(PHYSICAL_ADDRESS, DEVICE_TYPE).promiscuous(true));
    let driver: &'static CecDriver = DRIVER.init(Driver::new(device));

    unwrap!(spawner.spawn(rp::cec_line_handler(driver)));

    let my_cec_address = rp::wait_ready().await;
    info!("logical address {}", my_cec_address);
    check_display("clear", terminal.clear());
    check_display(
        "write",
        write!(terminal, "LA {} PA {:04x}\n", my_cec_address.0, PHYSICAL_ADDRESS.0),
    );

    let [pa_hi, pa_lo] = PHYSICAL_ADDRESS.to_be_bytes();
    let report_physical_address = [
        CecOpCode::REPORT_PHYSICAL_ADDRESS as u8,
        pa_hi,
        pa_lo,
        DEVICE_TYPE as u8,
    ];
    if let Err(e) =
        rp::send_with_result(driver, LogicalAddress::broadcast(), &report_physical_address).await
    {
        warn!("announcing physical address failed: {}", e);
    }

    info!("Listening for messages");
    loop {
        let received = match select(rp::receive(), Timer::after(ALIVE_INTERVAL)).await {
            Either::First(received) => received,
            Either::Second(_) => {
                info!("Alive {}!", Instant::now());
                continue;
            }
        };
        let frame = received.frame;
        if terminal.position().map_or(false, |pos| pos.1 == 0) {
            check_display("clear", terminal.clear());
        }

        let mut op_str = String::<32>::new();
        match (frame.opcode, frame.opcode_name()) {
            (_, Some(name)) => {
                let _ = op_str.push_str(name);
            }
            (Some(opcode), None) => {
                let _ = write!(op_str, "{:02x}", opcode);
            }
            (None, None) => {
                let _ = op_str.push_str("(poll)");
            }
        }
        info!(
            "RX: ({}->{}) {} {} ack {}",
            frame.initiator.0,
            frame.dest.0,
            op_str.as_str(),
            frame.operands.as_slice(),
            received.ack
        );
        check_display(
            "write",
            write!(
                terminal,
                "{}->{} {}\n",
                frame.initiator.0,
                frame.dest.0,
                op_str.as_str().get(0..9).unwrap_or(op_str.as_str())
            ),
        );

        if frame.dest == my_cec_address
            && frame.opcode == Some(CecOpCode::GIVE_PHYSICAL_ADDRESS as u8)
        {
            if let Err(e) =
                rp::send_with_result(driver, LogicalAddress::broadcast(), &report_physical_address)
                    .await
            {
                warn!("report physical address failed: {}", e);
            }
        }
    }
}
