// CO5300 AMOLED panel driver (Standard SPI mode, no D/C pin).
//
// Wiring on Waveshare ESP32-S3 Touch AMOLED 1.43" (CO5300):
//   CS  = GPIO9
//   SCK = GPIO10
//   IO0/MOSI = GPIO11
//   (IO1..IO3 unused in Standard SPI mode)
//   RST = GPIO21
//
// Protocol (Standard SPI):
//   Every write begins with 0x02, 0x00, CMD, 0x00, then N data bytes.
//   Example: [0x02, 0x00, 0x11, 0x00]       -> Sleep Out
//            [0x02, 0x00, 0x3A, 0x00, 0x55] -> Pixel Format = 16bpp (RGB565)
// Geometry: panel is 466 x 466 logical pixels, columns start at offset 6.
//
// The watch face renders into a 1-bpp `Framebuffer`; `present` expands it to
// RGB565 on the fly through a caller-owned bounce buffer, so there is never a
// full 16-bpp frame in memory.

use core::fmt;

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::{IntoStorage, Point},
};
use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::Operation, spi::SpiDevice};

use crate::surface::Framebuffer;

pub const CO5300_WIDTH: u16 = 466;
pub const CO5300_HEIGHT: u16 = 466;
const COLUMN_OFFSET: u16 = 0x0006;

const SWRESET: u8 = 0x01;
const SLPIN: u8 = 0x10;
const SLPOUT: u8 = 0x11;
const NORON: u8 = 0x13;
const DISPOFF: u8 = 0x28;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;
const RAMWRC: u8 = 0x3C;
const WRDISBV: u8 = 0x51;
const WRCTRLD: u8 = 0x53;

#[derive(Debug, PartialEq)]
pub enum PanelError<SpiE, GpioE> {
    Spi(SpiE),
    Gpio(GpioE),
    OutOfBounds,
}

impl<SpiE: fmt::Debug, GpioE: fmt::Debug> fmt::Display for PanelError<SpiE, GpioE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::Spi(e) => write!(f, "panel SPI error: {:?}", e),
            PanelError::Gpio(e) => write!(f, "panel reset pin error: {:?}", e),
            PanelError::OutOfBounds => f.write_str("panel window out of bounds"),
        }
    }
}

#[inline]
fn header(cmd: u8) -> [u8; 4] {
    [0x02, 0x00, cmd, 0x00]
}

/// CO5300 panel speaking the "0x02 + CMD + DATA" SPI framing. CS is handled
/// by the `SpiDevice` implementation.
pub struct Co5300Panel<'buf, SPI, RST> {
    spi: SPI,
    rst: Option<RST>,
    w: u16,
    h: u16,
    x_off: u16,
    y_off: u16,
    bounce: &'buf mut [u8],
}

impl<'buf, SPI, RST> Co5300Panel<'buf, SPI, RST>
where
    SPI: SpiDevice<u8>,
    RST: OutputPin,
{
    /// Reset and initialise the panel. Call once at startup.
    ///
    /// `bounce` is the staging buffer for pixel streaming (DMA-capable RAM on
    /// the watch). It needs room for at least one RGB565 pixel.
    pub fn new(
        spi: SPI,
        rst: Option<RST>,
        delay: &mut impl DelayNs,
        width: u16,
        height: u16,
        bounce: &'buf mut [u8],
    ) -> Result<Self, PanelError<SPI::Error, RST::Error>> {
        if bounce.len() < 2 || width == 0 || height == 0 {
            return Err(PanelError::OutOfBounds);
        }

        let mut this = Self {
            spi,
            rst,
            w: width,
            h: height,
            x_off: COLUMN_OFFSET,
            y_off: 0,
            bounce,
        };

        // Hard reset
        if let Some(r) = this.rst.as_mut() {
            r.set_high().map_err(PanelError::Gpio)?;
            delay.delay_ms(2);
            r.set_low().map_err(PanelError::Gpio)?;
            delay.delay_ms(80);
            r.set_high().map_err(PanelError::Gpio)?;
            delay.delay_ms(200);
        }

        this.cmd(SWRESET, &[])?;
        delay.delay_ms(150);

        this.cmd(SLPOUT, &[])?;
        delay.delay_ms(180);

        this.cmd(COLMOD, &[0x55])?;
        delay.delay_ms(2);

        this.cmd(0xC4, &[0x80])?;
        this.cmd(NORON, &[])?;

        this.cmd(WRCTRLD, &[0x20])?;
        delay.delay_ms(1);

        // vendor enable
        this.cmd(0x63, &[0xFF])?;
        delay.delay_ms(1);

        this.cmd(WRDISBV, &[0x00])?;
        delay.delay_ms(1);

        // Longer settle before any RAMWR
        this.cmd(DISPON, &[])?;
        delay.delay_ms(200);

        this.cmd(WRDISBV, &[0xFF])?;
        this.cmd(MADCTL, &[0x00])?;

        this.set_window(0, 0, width - 1, height - 1)?;
        Ok(this)
    }

    #[inline]
    pub fn width(&self) -> u16 { self.w }

    #[inline]
    pub fn height(&self) -> u16 { self.h }

    pub fn size(&self) -> (u16, u16) { (self.w, self.h) }

    pub fn release(self) -> (SPI, Option<RST>) {
        (self.spi, self.rst)
    }

    /// Program the write window, inclusive on both ends. Panel offsets are
    /// applied here.
    #[cfg_attr(feature = "firmware", esp_hal::ram)]
    pub fn set_window(
        &mut self,
        x0: u16, y0: u16,
        x1: u16, y1: u16,
    ) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        if x0 > x1 || y0 > y1 || x1 >= self.w || y1 >= self.h {
            return Err(PanelError::OutOfBounds);
        }

        let x0p = x0 + self.x_off;
        let x1p = x1 + self.x_off;
        let y0p = y0 + self.y_off;
        let y1p = y1 + self.y_off;

        let ca = [(x0p >> 8) as u8, (x0p & 0xFF) as u8, (x1p >> 8) as u8, (x1p & 0xFF) as u8];
        let ra = [(y0p >> 8) as u8, (y0p & 0xFF) as u8, (y1p >> 8) as u8, (y1p & 0xFF) as u8];

        self.cmd(CASET, &ca)?;
        self.cmd(RASET, &ra)
    }

    /// Fill a rectangle with one colour.
    #[cfg_attr(feature = "firmware", esp_hal::ram)]
    pub fn fill_solid(
        &mut self, x: u16, y: u16, w: u16, h: u16, color: Rgb565,
    ) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let (x1, y1) = self.far_corner(x as u32, y as u32, w as u32, h as u32)?;
        self.set_window(x, y, x1, y1)?;

        let c = color.into_storage().to_be_bytes();
        let cap = self.capacity();
        for px in self.bounce[..cap].chunks_exact_mut(2) {
            px.copy_from_slice(&c);
        }

        let mut remaining = (w as usize) * (h as usize) * 2;
        let mut first = true;
        while remaining > 0 {
            let take = remaining.min(cap);
            Self::write_chunk(&mut self.spi, &mut first, &self.bounce[..take])?;
            remaining -= take;
        }
        Ok(())
    }

    /// Stream a 1-bpp frame to the panel with its top-left corner at
    /// `origin`, lit pixels as `light` and the rest as `dark`.
    ///
    /// The first bounce-buffer load goes out with RAMWR, every later one with
    /// RAMWRC so the panel keeps its GRAM address.
    #[cfg_attr(feature = "firmware", esp_hal::ram)]
    pub fn present(
        &mut self,
        frame: &Framebuffer,
        origin: Point,
        light: Rgb565,
        dark: Rgb565,
    ) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        let (fw, fh) = (frame.width(), frame.height());
        if fw == 0 || fh == 0 {
            return Ok(());
        }
        if origin.x < 0 || origin.y < 0 {
            return Err(PanelError::OutOfBounds);
        }
        let (x0, y0) = (origin.x as u32, origin.y as u32);
        let (x1, y1) = self.far_corner(x0, y0, fw, fh)?;
        self.set_window(x0 as u16, y0 as u16, x1, y1)?;

        let light = light.into_storage().to_be_bytes();
        let dark = dark.into_storage().to_be_bytes();
        let cap = self.capacity();
        let mut filled = 0usize;
        let mut first = true;

        for row in frame.rows() {
            for x in 0..fw as usize {
                if filled + 2 > cap {
                    Self::write_chunk(&mut self.spi, &mut first, &self.bounce[..filled])?;
                    filled = 0;
                }
                let lit = row[x / 8] & (0x80 >> (x & 7)) != 0;
                let px = if lit { light } else { dark };
                self.bounce[filled..filled + 2].copy_from_slice(&px);
                filled += 2;
            }
        }
        Self::write_chunk(&mut self.spi, &mut first, &self.bounce[..filled])
    }

    /// Brightness, 0 (off) to 255.
    pub fn set_brightness(&mut self, level: u8) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        self.cmd(WRDISBV, &[level])
    }

    /// Blank and enter sleep. GRAM is kept.
    pub fn sleep(&mut self, delay: &mut impl DelayNs) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        self.cmd(DISPOFF, &[])?;
        self.cmd(SLPIN, &[])?;
        delay.delay_ms(120);
        Ok(())
    }

    /// Leave sleep and turn the display back on.
    pub fn wake(&mut self, delay: &mut impl DelayNs) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        self.cmd(SLPOUT, &[])?;
        delay.delay_ms(120);
        // the panel can lose format and orientation in sleep
        self.cmd(COLMOD, &[0x55])?;
        self.cmd(MADCTL, &[0x00])?;
        self.cmd(DISPON, &[])?;
        delay.delay_ms(10);
        Ok(())
    }

    // ---- Low-level helpers ----

    // Usable bounce bytes, whole pixels only.
    #[inline]
    fn capacity(&self) -> usize {
        self.bounce.len() & !1
    }

    // Inclusive bottom-right corner of a w x h rectangle at (x, y), if it
    // fits the panel.
    fn far_corner(&self, x: u32, y: u32, w: u32, h: u32) -> Result<(u16, u16), PanelError<SPI::Error, RST::Error>> {
        let (pw, ph) = (self.w as u32, self.h as u32);
        let fits_x = x.checked_add(w).is_some_and(|end| end <= pw);
        let fits_y = y.checked_add(h).is_some_and(|end| end <= ph);
        if !fits_x || !fits_y {
            return Err(PanelError::OutOfBounds);
        }
        Ok(((x + w - 1) as u16, (y + h - 1) as u16))
    }

    fn write_chunk(
        spi: &mut SPI,
        first: &mut bool,
        chunk: &[u8],
    ) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        if chunk.is_empty() {
            return Ok(());
        }
        let hdr = header(if *first { RAMWR } else { RAMWRC });
        *first = false;
        spi.transaction(&mut [Operation::Write(&hdr), Operation::Write(chunk)])
            .map_err(PanelError::Spi)
    }

    #[cfg_attr(feature = "firmware", esp_hal::ram)]
    fn cmd(&mut self, cmd: u8, data: &[u8]) -> Result<(), PanelError<SPI::Error, RST::Error>> {
        let hdr = header(cmd);
        if data.is_empty() {
            self.spi.write(&hdr).map_err(PanelError::Spi)
        } else {
            self.spi
                .transaction(&mut [Operation::Write(&hdr), Operation::Write(data)])
                .map_err(PanelError::Spi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
    use embedded_hal::{digital, spi};

    #[derive(Debug, PartialEq)]
    struct BusFault;

    impl spi::Error for BusFault {
        fn kind(&self) -> spi::ErrorKind {
            spi::ErrorKind::Other
        }
    }

    // One entry per transaction, all written bytes concatenated.
    #[derive(Default)]
    struct RecordingSpi {
        transactions: Vec<Vec<u8>>,
        unplugged: bool,
    }

    impl spi::ErrorType for RecordingSpi {
        type Error = BusFault;
    }

    impl SpiDevice<u8> for RecordingSpi {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), BusFault> {
            if self.unplugged {
                return Err(BusFault);
            }
            let mut bytes = Vec::new();
            for op in operations.iter() {
                if let Operation::Write(w) = op {
                    bytes.extend_from_slice(w);
                }
            }
            self.transactions.push(bytes);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePin {
        toggles: usize,
    }

    impl digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.toggles += 1;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.toggles += 1;
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn panel(bounce: &mut [u8], w: u16, h: u16) -> Co5300Panel<'_, RecordingSpi, FakePin> {
        let mut p = Co5300Panel::new(RecordingSpi::default(), Some(FakePin::default()), &mut NoDelay, w, h, bounce)
            .unwrap();
        p.spi.transactions.clear();
        p
    }

    fn cmd_of(t: &[u8]) -> u8 {
        assert_eq!(&t[..2], &[0x02, 0x00]);
        t[2]
    }

    #[test]
    fn init_resets_and_opens_full_window() {
        let mut bounce = [0u8; 8];
        let p = Co5300Panel::new(
            RecordingSpi::default(),
            Some(FakePin::default()),
            &mut NoDelay,
            CO5300_WIDTH,
            CO5300_HEIGHT,
            &mut bounce,
        )
        .unwrap();
        let (spi, rst) = p.release();
        assert_eq!(rst.unwrap().toggles, 3);

        let cmds: Vec<u8> = spi.transactions.iter().map(|t| cmd_of(t)).collect();
        assert_eq!(cmds[0], SWRESET);
        assert_eq!(cmds[1], SLPOUT);
        assert!(cmds.contains(&DISPON));
        // last two: full window, column offset applied (6..=471)
        let caset = &spi.transactions[spi.transactions.len() - 2];
        assert_eq!(caset, &[0x02, 0x00, CASET, 0x00, 0x00, 0x06, 0x01, 0xD7]);
    }

    #[test]
    fn rejects_a_bounce_buffer_without_room_for_a_pixel() {
        let mut bounce = [0u8; 1];
        let r = Co5300Panel::<_, FakePin>::new(RecordingSpi::default(), None, &mut NoDelay, 4, 4, &mut bounce);
        assert!(matches!(r, Err(PanelError::OutOfBounds)));
    }

    #[test]
    fn present_streams_in_chunks_with_ramwr_then_ramwrc() {
        let mut frame = Framebuffer::new(4, 2);
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut frame).unwrap();
        Pixel(Point::new(3, 1), BinaryColor::On).draw(&mut frame).unwrap();

        // three pixels per chunk, 8 pixels -> 3 + 3 + 2
        let mut bounce = [0u8; 7];
        let mut p = panel(&mut bounce, 10, 10);
        p.present(&frame, Point::new(2, 3), Rgb565::WHITE, Rgb565::BLACK).unwrap();

        let t = &p.spi.transactions;
        assert_eq!(t.len(), 5);
        assert_eq!(cmd_of(&t[0]), CASET);
        assert_eq!(&t[0][4..], &[0x00, 0x08, 0x00, 0x0B]);
        assert_eq!(&t[1][4..], &[0x00, 0x03, 0x00, 0x04]);
        assert_eq!(cmd_of(&t[2]), RAMWR);
        assert_eq!(cmd_of(&t[3]), RAMWRC);
        assert_eq!(cmd_of(&t[4]), RAMWRC);

        let pixels: Vec<u8> = t[2..].iter().flat_map(|c| c[4..].to_vec()).collect();
        assert_eq!(pixels.len(), 16);
        assert_eq!(&pixels[0..2], &[0xFF, 0xFF]);
        assert_eq!(&pixels[2..4], &[0x00, 0x00]);
        assert_eq!(&pixels[14..16], &[0xFF, 0xFF]);
        assert_eq!(pixels.iter().filter(|&&b| b == 0xFF).count(), 4);
    }

    #[test]
    fn present_refuses_frames_that_overhang() {
        let frame = Framebuffer::new(8, 8);
        let mut bounce = [0u8; 16];
        let mut p = panel(&mut bounce, 10, 10);
        assert_eq!(
            p.present(&frame, Point::new(3, 0), Rgb565::WHITE, Rgb565::BLACK),
            Err(PanelError::OutOfBounds)
        );
        assert_eq!(
            p.present(&frame, Point::new(-1, 0), Rgb565::WHITE, Rgb565::BLACK),
            Err(PanelError::OutOfBounds)
        );
        assert!(p.spi.transactions.is_empty());
    }

    #[test]
    fn fill_solid_repeats_the_colour() {
        let mut bounce = [0u8; 6];
        let mut p = panel(&mut bounce, 10, 10);
        p.fill_solid(0, 0, 2, 2, Rgb565::RED).unwrap();

        let t = &p.spi.transactions;
        // window + 8 bytes in chunks of 6 and 2
        assert_eq!(t.len(), 4);
        let red = Rgb565::RED.into_storage().to_be_bytes();
        assert_eq!(&t[2][4..], &[red[0], red[1], red[0], red[1], red[0], red[1]]);
        assert_eq!(cmd_of(&t[3]), RAMWRC);
        assert_eq!(&t[3][4..], &red);
    }

    #[test]
    fn bus_errors_reach_the_caller() {
        let mut bounce = [0u8; 4];
        let mut p = panel(&mut bounce, 10, 10);
        p.spi.unplugged = true;
        let err = p.set_brightness(0xC0).unwrap_err();
        assert_eq!(err, PanelError::Spi(BusFault));
        assert_eq!(err.to_string(), "panel SPI error: BusFault");
        assert!(p.spi.transactions.is_empty());
    }

    #[test]
    fn power_commands() {
        let mut bounce = [0u8; 4];
        let mut p = panel(&mut bounce, 10, 10);
        p.set_brightness(0x40).unwrap();
        p.sleep(&mut NoDelay).unwrap();
        p.wake(&mut NoDelay).unwrap();
        let cmds: Vec<u8> = p.spi.transactions.iter().map(|t| cmd_of(t)).collect();
        assert_eq!(cmds, vec![WRDISBV, DISPOFF, SLPIN, SLPOUT, COLMOD, MADCTL, DISPON]);
        assert_eq!(p.spi.transactions[0], vec![0x02, 0x00, WRDISBV, 0x00, 0x40]);
    }
}
