//! Spiral watch face firmware
//! ========================================
//! needs to be run in WSL2 terminal
//! source ~/export-esp.sh
//! cargo run --release --features firmware
//! ========================================
//!
//! Redraws the spiral face whenever the minute changes and streams it to
//! the CO5300 panel.

//% CHIPS: esp32s3
//% FEATURES: esp-hal/unstable

#![no_std]
#![no_main]

// Define the application description, which is placed in a special section of the binary.
// This is used by the bootloader to verify the application.
esp_bootloader_esp_idf::esp_app_desc!();

use spiral_watch::{
    assets::AssetSet,
    clock::{FixedTime, TimeSource, WallTime},
    co5300::CO5300_WIDTH,
    display::{setup_display, setup_rtc, TimerDelay, DMA_CHUNK},
    face::{FaceConfig, WatchFace},
    surface::Framebuffer,
    wiring::{init_board_pins, BoardPins},
};

use esp_backtrace as _;
use esp_hal::{main, Config};
use esp_println::println;

use embedded_graphics::{pixelcolor::Rgb565, prelude::*};
use embedded_hal::delay::DelayNs;
use log::{error, info, warn, LevelFilter, Log, Metadata, Record};

// Allocator for PSRAM
extern crate alloc;
use alloc::vec;

const BRIGHTNESS: u8 = 0xC0;
const POLL_MS: u32 = 1_000;

// Forwards the library's log output to the serial console.
struct PrintlnLogger;

impl Log for PrintlnLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: PrintlnLogger = PrintlnLogger;

// Time since boot, used when the RTC has lost its setting.
fn uptime_wall_time() -> WallTime {
    let mins = TimerDelay::now_us() / 60_000_000;
    WallTime::new(((mins / 60) % 24) as u8, (mins % 60) as u8)
}

#[main]
fn main() -> ! {
    let peripherals = esp_hal::init(Config::default());

    esp_alloc::psram_allocator!(&peripherals.PSRAM, psram);

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let BoardPins {
        display_pins,
        rtc_pins,
        mut battery,
    } = init_board_pins(peripherals);

    let bounce: &'static mut [u8] = alloc::boxed::Box::leak(vec![0u8; DMA_CHUNK].into_boxed_slice());
    let mut display = setup_display(display_pins, bounce);
    if let Err(e) = display.set_brightness(BRIGHTNESS) {
        warn!("set brightness failed: {}", e);
    }

    let mut rtc = setup_rtc(rtc_pins);

    // Face assets live for the whole run
    let config = FaceConfig::for_surface(CO5300_WIDTH as u32);
    let assets: &'static AssetSet = alloc::boxed::Box::leak(alloc::boxed::Box::new(AssetSet::generate(&config)));
    let face = WatchFace::new(config, assets.textures().expect("face assets"));
    let mut frame = Framebuffer::new(config.surface_size, config.surface_size);

    info!("spiral watch up, {}x{}", config.surface_size, config.surface_size);

    let mut delay = TimerDelay;
    let mut shown: Option<WallTime> = None;
    let mut rtc_ok = true;

    loop {
        let now = match rtc.now() {
            Ok(t) => {
                rtc_ok = true;
                t
            }
            Err(e) => {
                if rtc_ok {
                    warn!("{}, falling back to uptime", e);
                    rtc_ok = false;
                }
                uptime_wall_time()
            }
        };

        if shown != Some(now) {
            let t0 = TimerDelay::now_us();
            match face.render(&mut frame, &mut FixedTime(now), &mut battery) {
                Ok(drawn) => {
                    let t1 = TimerDelay::now_us();
                    if let Err(e) = display.present(&frame, Point::zero(), Rgb565::WHITE, Rgb565::BLACK) {
                        error!("present failed: {:?}", e);
                    } else {
                        shown = Some(drawn);
                    }
                    info!(
                        "{:02}:{:02} rendered in {} us, presented in {} us",
                        drawn.hour,
                        drawn.minute,
                        t1 - t0,
                        TimerDelay::now_us() - t1
                    );
                }
                Err(e) => error!("{}", e),
            }
        }

        delay.delay_ms(POLL_MS);
    }
}
