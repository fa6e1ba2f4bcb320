//! Read-only textures addressed by continuous UV coordinates.
//!
//! Texture lookups truncate the UV toward zero and clamp the result into the
//! texture, so interpolation overshoot along triangle edges reads the border
//! texel instead of running off the end of the table. The threshold texture
//! is addressed by screen pixel and tiles across the surface.

use core::fmt;

use embedded_graphics::prelude::Point;

use crate::geometry::Vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureError {
    Empty,
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Empty => write!(f, "texture has zero width or height"),
            TextureError::SizeMismatch { expected, actual } => {
                write!(f, "texture data is {} bytes, expected {}", actual, expected)
            }
        }
    }
}

fn check_len(width: u32, height: u32, expected: usize, actual: usize) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::Empty);
    }
    if expected != actual {
        return Err(TextureError::SizeMismatch { expected, actual });
    }
    Ok(())
}

// Truncate then clamp into [0, len). NaN casts to 0.
#[inline]
fn texel(coord: f32, len: u32) -> usize {
    (coord as i32).clamp(0, len as i32 - 1) as usize
}

/// Packed 1-bit-per-pixel bitmap, row-major, MSB first within each byte.
#[derive(Clone, Copy, Debug)]
pub struct BitmapTexture<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> BitmapTexture<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, TextureError> {
        let stride = (width as usize).div_ceil(8);
        check_len(width, height, stride * height as usize, data.len())?;
        Ok(Self { data, width, height, stride })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    // True when the bit under `uv` is set.
    #[inline]
    pub fn sample(&self, uv: Vector) -> bool {
        let x = texel(uv.x, self.width);
        let y = texel(uv.y, self.height);
        self.data[y * self.stride + x / 8] & (0x80 >> (x & 7)) != 0
    }
}

/// One byte per pixel greyscale texture (0 = black, 255 = white).
#[derive(Clone, Copy, Debug)]
pub struct GreyTexture<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> GreyTexture<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, TextureError> {
        check_len(width, height, width as usize * height as usize, data.len())?;
        Ok(Self { data, width, height })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    #[inline]
    pub fn sample(&self, uv: Vector) -> u8 {
        let x = texel(uv.x, self.width);
        let y = texel(uv.y, self.height);
        self.data[y * self.width as usize + x]
    }
}

/// Per-screen-pixel dither thresholds.
#[derive(Clone, Copy, Debug)]
pub struct NoiseTexture<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> NoiseTexture<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, TextureError> {
        check_len(width, height, width as usize * height as usize, data.len())?;
        Ok(Self { data, width, height })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    #[inline]
    pub fn threshold(&self, pixel: Point) -> u8 {
        let x = pixel.x.rem_euclid(self.width as i32) as usize;
        let y = pixel.y.rem_euclid(self.height as i32) as usize;
        self.data[y * self.width as usize + x]
    }
}

/// Ordered dithering: the texel under `uv` against the threshold under the
/// destination pixel. Overlapping draws at one screen position share the
/// same pattern.
#[inline]
pub fn dither(texture: &GreyTexture<'_>, noise: &NoiseTexture<'_>, pixel: Point, uv: Vector) -> bool {
    texture.sample(uv) > noise.threshold(pixel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_reads_msb_first() {
        // 10 px wide -> 2 bytes per row
        let data = [0b1000_0001, 0b0100_0000, 0b0000_0000, 0b1100_0000];
        let tex = BitmapTexture::new(&data, 10, 2).unwrap();
        assert!(tex.sample(Vector::new(0.0, 0.0)));
        assert!(!tex.sample(Vector::new(1.0, 0.0)));
        assert!(tex.sample(Vector::new(7.0, 0.0)));
        assert!(tex.sample(Vector::new(9.0, 0.0)));
        assert!(!tex.sample(Vector::new(0.0, 1.0)));
        assert!(tex.sample(Vector::new(8.0, 1.0)));
        assert!(tex.sample(Vector::new(9.9, 1.9)));
    }

    #[test]
    fn bitmap_length_is_validated() {
        assert_eq!(
            BitmapTexture::new(&[0u8; 3], 10, 2).unwrap_err(),
            TextureError::SizeMismatch { expected: 4, actual: 3 }
        );
        assert_eq!(BitmapTexture::new(&[], 0, 2).unwrap_err(), TextureError::Empty);
    }

    #[test]
    fn out_of_range_uvs_clamp_to_the_border() {
        let data = [10, 20, 30, 40];
        let tex = GreyTexture::new(&data, 2, 2).unwrap();
        assert_eq!(tex.sample(Vector::new(-3.0, -0.5)), 10);
        assert_eq!(tex.sample(Vector::new(2.0, 0.0)), 20);
        assert_eq!(tex.sample(Vector::new(500.0, 500.0)), 40);
        assert_eq!(tex.sample(Vector::new(f32::NAN, 1.2)), 30);
    }

    #[test]
    fn noise_tiles_across_the_screen() {
        let data = [1, 2, 3, 4];
        let noise = NoiseTexture::new(&data, 2, 2).unwrap();
        assert_eq!(noise.threshold(Point::new(0, 0)), 1);
        assert_eq!(noise.threshold(Point::new(3, 1)), 4);
        assert_eq!(noise.threshold(Point::new(-1, -2)), 2);
    }

    #[test]
    fn dither_compares_texel_against_screen_threshold() {
        let grey = [128u8; 4];
        let tex = GreyTexture::new(&grey, 2, 2).unwrap();
        let thresholds = [0, 127, 128, 255];
        let noise = NoiseTexture::new(&thresholds, 2, 2).unwrap();
        let uv = Vector::new(0.5, 0.5);
        assert!(dither(&tex, &noise, Point::new(0, 0), uv));
        assert!(dither(&tex, &noise, Point::new(1, 0), uv));
        // strictly greater than
        assert!(!dither(&tex, &noise, Point::new(0, 1), uv));
        assert!(!dither(&tex, &noise, Point::new(1, 1), uv));
    }

    #[test]
    fn dither_is_deterministic() {
        let grey: [u8; 16] = core::array::from_fn(|i| (i * 16) as u8);
        let thresholds: [u8; 16] = core::array::from_fn(|i| (i * 37 % 256) as u8);
        let tex = GreyTexture::new(&grey, 4, 4).unwrap();
        let noise = NoiseTexture::new(&thresholds, 4, 4).unwrap();
        for i in 0..16 {
            let p = Point::new(i % 4, i / 4);
            let uv = Vector::new((i % 3) as f32 + 0.3, (i % 4) as f32);
            assert_eq!(dither(&tex, &noise, p, uv), dither(&tex, &noise, p, uv));
        }
    }
}
