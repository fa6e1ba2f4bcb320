//! Display and RTC bring-up.
//
// - `setup_display` builds the SPI DMA bus and the CO5300 driver (466x466,
//   no D/C, 0x02 framing).
// - `setup_rtc` opens I2C0 for the PCF85063.
// Both panic on failure; there is nothing to show without them.

use esp_backtrace as _;

use esp_hal::{
    dma::{DmaRxBuf, DmaTxBuf},
    dma_buffers,
    gpio::Output,
    i2c::master::{Config as I2cConfig, I2c},
    spi::master::{Config, Spi, SpiDmaBus},
    spi::Mode,
    time::Rate,
    timer::systimer::{SystemTimer, Unit},
    Blocking,
};

use embedded_hal::delay::DelayNs;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};

use crate::co5300::{Co5300Panel, CO5300_HEIGHT, CO5300_WIDTH};
use crate::rtc_pcf85063::Pcf85063;
use crate::wiring::{DisplayPins, RtcPins};

// 32736 = 32 * 1023
pub const DMA_CHUNK: usize = 32 * 1023;

pub type PanelBus<'a> = ExclusiveDevice<SpiDmaBus<'a, Blocking>, Output<'a>, NoDelay>;
pub type DisplayType<'a> = Co5300Panel<'a, PanelBus<'a>, Output<'a>>;
pub type RtcType<'a> = Pcf85063<I2c<'a, Blocking>>;

// Busy-wait delay on the system timer, satisfies embedded-hal 1.0 DelayNs.
pub struct TimerDelay;

impl TimerDelay {
    #[inline]
    pub fn now_us() -> u64 {
        SystemTimer::unit_value(Unit::Unit0).saturating_mul(1_000_000) / SystemTimer::ticks_per_second()
    }
}

impl DelayNs for TimerDelay {
    fn delay_ns(&mut self, ns: u32) {
        let start = Self::now_us();
        let wait = (ns as u64).div_ceil(1_000);
        while Self::now_us().wrapping_sub(start) < wait {
            core::hint::spin_loop();
        }
    }
}

pub fn setup_display<'a>(display_pins: DisplayPins<'a>, bounce: &'a mut [u8]) -> DisplayType<'a> {
    let DisplayPins {
        spi2,
        cs,
        clk,
        do0,
        rst,
        dma_ch0,
    } = display_pins;

    let mut delay = TimerDelay;

    // 60 MHz, Mode 0 is stable on this board
    let spi = Spi::new(
        spi2,
        Config::default()
            .with_frequency(Rate::from_hz(60_000_000))
            .with_mode(Mode::_0),
    )
    .unwrap()
    .with_sck(clk)
    .with_mosi(do0)
    .with_dma(dma_ch0);

    let (rx_buf, rx_desc, tx_buf, tx_desc) = dma_buffers!(4096, DMA_CHUNK);
    let rx = DmaRxBuf::new(rx_desc, rx_buf).unwrap();
    let tx = DmaTxBuf::new(tx_desc, tx_buf).unwrap();

    let spi_bus: SpiDmaBus<'_, Blocking> = spi.with_buffers(rx, tx);
    let spi_dev = ExclusiveDevice::new(spi_bus, cs, NoDelay).unwrap();

    Co5300Panel::new(spi_dev, Some(rst), &mut delay, CO5300_WIDTH, CO5300_HEIGHT, bounce)
        .expect("CO5300 init failed")
}

pub fn setup_rtc<'a>(rtc_pins: RtcPins<'a>) -> RtcType<'a> {
    let RtcPins { i2c0, sda, scl } = rtc_pins;
    let cfg = I2cConfig::default().with_frequency(Rate::from_khz(400));
    let i2c = I2c::new(i2c0, cfg)
        .expect("I2C0 init failed")
        .with_sda(sda)
        .with_scl(scl);
    Pcf85063::new(i2c)
}
