//! Render surfaces.
//!
//! - `Surface` is an embedded-graphics `DrawTarget<BinaryColor>` with an
//!   optional batched-write bracket (`begin_write` / `end_write`).
//! - `WriteSession` holds that bracket open for a scope and always closes it.
//! - `Framebuffer` is a packed 1-bpp in-memory surface; the firmware renders a
//!   whole face into it and then streams it to the panel.

use core::convert::Infallible;
use core::ops::{Deref, DerefMut};

use alloc::vec;
use alloc::vec::Vec;

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
};

pub trait Surface: DrawTarget<Color = BinaryColor> {
    // Called before a batch of pixel writes. Sessions may nest.
    fn begin_write(&mut self) {}

    // Called once per `begin_write`, after the batch.
    fn end_write(&mut self) {}
}

/// Scoped write session. `end_write` runs on drop, so early returns and `?`
/// release the surface too.
pub struct WriteSession<'s, S: Surface + ?Sized> {
    surface: &'s mut S,
}

impl<'s, S: Surface + ?Sized> WriteSession<'s, S> {
    pub fn open(surface: &'s mut S) -> Self {
        surface.begin_write();
        Self { surface }
    }
}

impl<S: Surface + ?Sized> Deref for WriteSession<'_, S> {
    type Target = S;
    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: Surface + ?Sized> DerefMut for WriteSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: Surface + ?Sized> Drop for WriteSession<'_, S> {
    fn drop(&mut self) {
        self.surface.end_write();
    }
}

/// Packed 1-bpp framebuffer, row-major, MSB first. Set bits are `LIGHT`.
pub struct Framebuffer {
    w: u32,
    h: u32,
    stride: usize,
    bits: Vec<u8>,
}

impl Framebuffer {
    // New framebuffer, cleared to black.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = (width as usize).div_ceil(8);
        Self {
            w: width,
            h: height,
            stride,
            bits: vec![0u8; stride * height as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 { self.w }

    #[inline]
    pub fn height(&self) -> u32 { self.h }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    // Packed rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.bits.chunks_exact(self.stride.max(1))
    }

    pub fn pixel(&self, p: Point) -> Option<BinaryColor> {
        let (x, y) = self.index(p)?;
        let byte = self.bits[y * self.stride + x / 8];
        Some(BinaryColor::from(byte & (0x80 >> (x & 7)) != 0))
    }

    // Count of lit pixels, mostly for tests and coverage checks.
    pub fn count_lit(&self) -> usize {
        // padding bits past the right edge don't count
        let rem = self.w % 8;
        let last_mask: u8 = if rem == 0 { 0xFF } else { 0xFF << (8 - rem) };
        self.rows()
            .map(|row| {
                let (last, full) = match row.split_last() {
                    Some(parts) => parts,
                    None => return 0,
                };
                full.iter().map(|b| b.count_ones() as usize).sum::<usize>()
                    + (last & last_mask).count_ones() as usize
            })
            .sum()
    }

    #[inline]
    fn index(&self, p: Point) -> Option<(usize, usize)> {
        if p.x < 0 || p.y < 0 || p.x as u32 >= self.w || p.y as u32 >= self.h {
            return None;
        }
        Some((p.x as usize, p.y as usize))
    }

    #[inline]
    fn set(&mut self, x: usize, y: usize, color: BinaryColor) {
        let mask = 0x80 >> (x & 7);
        let byte = &mut self.bits[y * self.stride + x / 8];
        if color.is_on() {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<BinaryColor>>,
    {
        for Pixel(p, c) in pixels {
            if let Some((x, y)) = self.index(p) {
                self.set(x, y, c);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: BinaryColor) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xFF } else { 0x00 };
        self.bits.fill(fill);
        Ok(())
    }
}

impl Surface for Framebuffer {}
