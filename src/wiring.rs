// Board pin mapping for the Waveshare ESP32-S3 Touch AMOLED 1.43".
//! The following wiring is assumed:
//! - CO5300 QSPI (used as plain SPI): CS => GPIO9, CLK => GPIO10, D0 => GPIO11
//! - CO5300 RST => GPIO21
//! - Shared I2C (PCF85063 RTC at 0x51): SDA => GPIO47, SCL => GPIO48
//! - Battery sense => GPIO4 (ADC1) behind a 1:3 divider

use esp_backtrace as _;
use esp_hal::{
    analog::adc::{Adc, AdcConfig, AdcPin, Attenuation},
    gpio::{Level, Output, OutputConfig},
    peripherals::{Peripherals, ADC1, DMA_CH0, GPIO10, GPIO11, GPIO4, GPIO47, GPIO48, I2C0, SPI2},
    Blocking,
};

use crate::battery::BatterySource;

// Full-scale input at 11 dB attenuation, millivolts.
const ADC_FULL_SCALE_MV: f32 = 3100.0;
const ADC_MAX: f32 = 4095.0;
pub const BATTERY_DIVIDER: f32 = 3.0;

pub struct DisplayPins<'a> {
    pub spi2: SPI2<'a>,
    pub cs: Output<'a>,
    pub clk: GPIO10<'a>,
    pub do0: GPIO11<'a>,
    pub rst: Output<'a>,
    pub dma_ch0: DMA_CH0<'a>,
}

pub struct RtcPins<'a> {
    pub i2c0: I2C0<'a>,
    pub sda: GPIO47<'a>,
    pub scl: GPIO48<'a>,
}

pub struct BoardPins<'a> {
    pub display_pins: DisplayPins<'a>,
    pub rtc_pins: RtcPins<'a>,
    pub battery: AdcBattery<'a>,
}

pub fn init_board_pins(p: Peripherals) -> BoardPins<'static> {
    // Panel control pins; CS idles high, RST is driven by the panel driver
    let cs = Output::new(p.GPIO9, Level::High, OutputConfig::default());
    let rst = Output::new(p.GPIO21, Level::High, OutputConfig::default());

    let mut adc_config = AdcConfig::new();
    let battery_pin = adc_config.enable_pin(p.GPIO4, Attenuation::_11dB);
    let adc = Adc::new(p.ADC1, adc_config);

    BoardPins {
        display_pins: DisplayPins {
            spi2: p.SPI2,
            cs,
            clk: p.GPIO10,
            do0: p.GPIO11,
            rst,
            dma_ch0: p.DMA_CH0,
        },
        rtc_pins: RtcPins {
            i2c0: p.I2C0,
            sda: p.GPIO47,
            scl: p.GPIO48,
        },
        battery: AdcBattery { adc, pin: battery_pin },
    }
}

/// Battery voltage from a one-shot ADC1 conversion.
pub struct AdcBattery<'a> {
    adc: Adc<'a, ADC1<'a>, Blocking>,
    pin: AdcPin<GPIO4<'a>, ADC1<'a>>,
}

impl BatterySource for AdcBattery<'_> {
    type Error = ();

    fn voltage(&mut self) -> Result<f32, Self::Error> {
        let raw: u16 = nb::block!(self.adc.read_oneshot(&mut self.pin))?;
        Ok(raw as f32 / ADC_MAX * ADC_FULL_SCALE_MV / 1000.0 * BATTERY_DIVIDER)
    }
}
