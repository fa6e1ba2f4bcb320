//! Texture assets for the spiral face.
//!
//! The face, rim mat-cap, hand mat-cap and centre-shadow textures are square
//! greyscale images in UV space; the dither threshold table is sized to the
//! render surface. All of them are generated once at start-up into heap
//! buffers (PSRAM on the watch) and only ever read afterwards.

use alloc::vec::Vec;

use crate::face::FaceConfig;
use crate::geometry::Vector;
use crate::texture::{GreyTexture, NoiseTexture, TextureError};

// Light direction for mat-cap shading, pointing from the surface towards
// the light (upper left, in front of the screen).
#[derive(Copy, Clone, Debug)]
pub struct MatCapLight {
    pub dir: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

pub const RIM_LIGHT: MatCapLight = MatCapLight {
    dir: [-0.45, -0.55, 0.70],
    ambient: 0.10,
    diffuse: 0.75,
    specular: 0.45,
    shininess: 24.0,
};

// Harder light so the hands stand off the dial.
pub const HAND_LIGHT: MatCapLight = MatCapLight {
    dir: [-0.60, -0.60, 0.53],
    ambient: 0.0,
    diffuse: 0.90,
    specular: 0.60,
    shininess: 40.0,
};

/// Owned pixel data for every texture the face samples.
pub struct AssetSet {
    texture_size: u32,
    noise_size: (u32, u32),
    face: Vec<u8>,
    rim: Vec<u8>,
    hand: Vec<u8>,
    shadow: Vec<u8>,
    noise: Vec<u8>,
}

/// Borrowed, validated views over an [`AssetSet`].
#[derive(Copy, Clone, Debug)]
pub struct FaceTextures<'a> {
    pub face: GreyTexture<'a>,
    pub rim: GreyTexture<'a>,
    pub hand: GreyTexture<'a>,
    pub shadow: GreyTexture<'a>,
    pub noise: NoiseTexture<'a>,
}

impl AssetSet {
    pub fn generate(config: &FaceConfig) -> Self {
        let n = config.texture_size;
        let centre = config.uv_center;
        let radius = config.uv_radius;
        Self {
            texture_size: n,
            noise_size: (config.surface_size, config.surface_size),
            face: grey_image(n, |uv| face_texel(uv, centre, radius)),
            rim: grey_image(n, |uv| matcap_texel(uv, centre, radius, &RIM_LIGHT)),
            hand: grey_image(n, |uv| matcap_texel(uv, centre, radius, &HAND_LIGHT)),
            shadow: grey_image(n, |uv| shadow_texel(uv, centre, config.shadow_half_extent)),
            noise: threshold_noise(config.surface_size, config.surface_size),
        }
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    pub fn textures(&self) -> Result<FaceTextures<'_>, TextureError> {
        let n = self.texture_size;
        Ok(FaceTextures {
            face: GreyTexture::new(&self.face, n, n)?,
            rim: GreyTexture::new(&self.rim, n, n)?,
            hand: GreyTexture::new(&self.hand, n, n)?,
            shadow: GreyTexture::new(&self.shadow, n, n)?,
            noise: NoiseTexture::new(&self.noise, self.noise_size.0, self.noise_size.1)?,
        })
    }
}

fn grey_image(size: u32, texel: impl Fn(Vector) -> f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(size as usize * size as usize);
    for y in 0..size {
        for x in 0..size {
            out.push(to_byte(texel(Vector::new(x as f32, y as f32))));
        }
    }
    out
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

#[inline]
fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// Dial: brighter towards the rim, with a soft shadow falling to the lower
// right so each loop reads as a step down into the spiral.
fn face_texel(uv: Vector, centre: Vector, radius: f32) -> f32 {
    let d = uv - centre;
    let r = (d.length() / radius).min(1.0);
    let dir = d.normalized();
    let toward_light = -(dir.x + dir.y) * core::f32::consts::FRAC_1_SQRT_2;
    let shade = 0.7 + 0.3 * toward_light;
    (0.25 + 0.75 * r) * shade
}

// Sphere lit by `light`, indexed by the surface normal's xy.
fn matcap_texel(uv: Vector, centre: Vector, radius: f32, light: &MatCapLight) -> f32 {
    let mut n = (uv - centre) * (1.0 / radius);
    let len = n.length();
    if len > 1.0 {
        n = n * (1.0 / len);
    }
    let nz = libm::sqrtf((1.0 - n.dot(n)).max(0.0));

    let [lx, ly, lz] = light.dir;
    let l_len = libm::sqrtf(lx * lx + ly * ly + lz * lz);
    let (lx, ly, lz) = (lx / l_len, ly / l_len, lz / l_len);

    let diffuse = (n.x * lx + n.y * ly + nz * lz).max(0.0);
    // reflect the light about the normal, viewer looks down -z
    let rz = 2.0 * diffuse * nz - lz;
    let highlight = libm::powf(rz.max(0.0), light.shininess);

    light.ambient + light.diffuse * diffuse + light.specular * highlight
}

// Centre shadow mask: dark in the middle, fully clear at `half_extent`.
fn shadow_texel(uv: Vector, centre: Vector, half_extent: f32) -> f32 {
    let r = (uv - centre).length();
    0.35 + 0.65 * smoothstep(0.0, half_extent, r)
}

/// Screen-space dither thresholds (interleaved gradient noise). Close to
/// blue noise, cheap to generate, identical on every boot.
pub fn threshold_noise(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let inner = fract(0.067_110_56 * x as f32 + 0.005_837_15 * y as f32);
            let v = fract(52.982_918 * inner);
            out.push((v * 256.0) as u8);
        }
    }
    out
}

#[inline]
fn fract(v: f32) -> f32 {
    v - libm::floorf(v)
}
