//! Per-pixel paint decisions for the rasterizer.
//!
//! The rasterizer hands every covered pixel and its interpolated UV to a
//! [`Shader`], which decides whether to write a colour or leave the surface
//! untouched. The three watch-face fill styles are:
//!
//! | shader         | sampler    | sample true  | sample false  |
//! |----------------|------------|--------------|---------------|
//! | `BitmapShader` | 1-bit      | `LIGHT`      | `DARK`        |
//! | `DitherShader` | dithered   | `LIGHT`      | `DARK`        |
//! | `MaskShader`   | dithered   | skip         | mask colour   |

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::Point;

use crate::geometry::Vector;
use crate::texture::{dither, BitmapTexture, GreyTexture, NoiseTexture};

/// White on the e-paper/AMOLED palette.
pub const LIGHT: BinaryColor = BinaryColor::On;
/// Black.
pub const DARK: BinaryColor = BinaryColor::Off;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaintDecision {
    Paint(BinaryColor),
    Skip,
}

pub trait Shader {
    fn shade(&self, pixel: Point, uv: Vector) -> PaintDecision;
}

impl<F> Shader for F
where
    F: Fn(Point, Vector) -> PaintDecision,
{
    #[inline]
    fn shade(&self, pixel: Point, uv: Vector) -> PaintDecision {
        self(pixel, uv)
    }
}

#[inline]
fn light_or_dark(lit: bool) -> PaintDecision {
    PaintDecision::Paint(if lit { LIGHT } else { DARK })
}

// Direct 1-bit lookup.
#[derive(Clone, Copy, Debug)]
pub struct BitmapShader<'a> {
    pub texture: BitmapTexture<'a>,
}

impl<'a> BitmapShader<'a> {
    pub fn new(texture: BitmapTexture<'a>) -> Self {
        Self { texture }
    }
}

impl Shader for BitmapShader<'_> {
    #[inline]
    fn shade(&self, _pixel: Point, uv: Vector) -> PaintDecision {
        light_or_dark(self.texture.sample(uv))
    }
}

// Greyscale texture dithered against the screen-space threshold table.
#[derive(Clone, Copy, Debug)]
pub struct DitherShader<'a> {
    pub texture: GreyTexture<'a>,
    pub noise: NoiseTexture<'a>,
}

impl<'a> DitherShader<'a> {
    pub fn new(texture: GreyTexture<'a>, noise: NoiseTexture<'a>) -> Self {
        Self { texture, noise }
    }

    #[inline]
    pub fn lit(&self, pixel: Point, uv: Vector) -> bool {
        dither(&self.texture, &self.noise, pixel, uv)
    }
}

impl Shader for DitherShader<'_> {
    #[inline]
    fn shade(&self, pixel: Point, uv: Vector) -> PaintDecision {
        light_or_dark(self.lit(pixel, uv))
    }
}

/// Dithered transparency mask: pixels where the texture wins are left as
/// they are, the rest are painted with `color`. Used for overlay shadows.
#[derive(Clone, Copy, Debug)]
pub struct MaskShader<'a> {
    pub dither: DitherShader<'a>,
    pub color: BinaryColor,
}

impl<'a> MaskShader<'a> {
    pub fn new(texture: GreyTexture<'a>, noise: NoiseTexture<'a>, color: BinaryColor) -> Self {
        Self { dither: DitherShader::new(texture, noise), color }
    }
}

impl Shader for MaskShader<'_> {
    #[inline]
    fn shade(&self, pixel: Point, uv: Vector) -> PaintDecision {
        if self.dither.lit(pixel, uv) {
            PaintDecision::Skip
        } else {
            PaintDecision::Paint(self.color)
        }
    }
}
