//! The spiral watch face.
//!
//! Every frame is rebuilt from scratch: a dial made of three shrinking loops
//! of dithered face and rim quads, one more loop drawn as outlines only, a
//! shadow over the centre and the two hands. The current minute rotates the
//! spiral and the battery charge sets how wide the rim is.

use alloc::vec::Vec;
use core::fmt;

use embedded_graphics::{
    prelude::*,
    primitives::{Line, PrimitiveStyle, Triangle},
};
use log::{debug, warn};

use crate::assets::FaceTextures;
use crate::battery::{BatteryGauge, BatterySource};
use crate::clock::{TimeSource, WallTime};
use crate::geometry::Vector;
use crate::hand::HandPose;
use crate::raster::{fill_triangle, TexturedTriangle, Vertex};
use crate::shader::{DitherShader, MaskShader, Shader, DARK, LIGHT};
use crate::surface::{Surface, WriteSession};

// Layout every other surface size is scaled from.
const REFERENCE_SIZE: f32 = 200.0;

/// Layout and tuning for the face.
///
/// Screen-space values (`center`, radii, hand lengths, `shadow_min/max`)
/// follow the surface; UV-space values address the 200x200 textures and
/// never change with the panel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaceConfig {
    pub surface_size: u32,
    pub center: Vector,
    pub face_radius: f32,
    pub rim_size: f32,
    pub hour_hand: f32,
    pub minute_hand: f32,
    pub shadow_min: Vector,
    pub shadow_max: Vector,

    pub texture_size: u32,
    pub uv_center: Vector,
    pub uv_radius: f32,
    pub shadow_uv_min: Vector,
    pub shadow_uv_max: Vector,
    pub shadow_half_extent: f32,

    /// Per-loop shrink factor of the spiral.
    pub loop_decay: f32,
    /// Angular divisions of one loop.
    pub steps: usize,
    pub filled_loops: usize,
    pub outline_loops: usize,

    pub gauge: BatteryGauge,
}

impl Default for FaceConfig {
    fn default() -> Self {
        let rim_size = 20.0;
        Self {
            surface_size: 200,
            center: Vector::new(99.5, 99.5),
            face_radius: 260.0 - rim_size,
            rim_size,
            hour_hand: 70.0,
            minute_hand: 90.0,
            shadow_min: Vector::new(50.0, 50.0),
            shadow_max: Vector::new(149.0, 149.0),

            texture_size: 200,
            uv_center: Vector::new(99.5, 99.5),
            uv_radius: 99.0,
            shadow_uv_min: Vector::new(50.0, 50.0),
            shadow_uv_max: Vector::new(149.0, 149.0),
            shadow_half_extent: 49.5,

            loop_decay: 0.45,
            steps: 60,
            filled_loops: 3,
            outline_loops: 1,

            gauge: BatteryGauge::default(),
        }
    }
}

impl FaceConfig {
    /// The reference layout scaled onto a `size` x `size` surface.
    pub fn for_surface(size: u32) -> Self {
        let base = Self::default();
        let k = size as f32 / REFERENCE_SIZE;
        let center = Vector::new((size as f32 - 1.0) * 0.5, (size as f32 - 1.0) * 0.5);
        let place = |p: Vector| (p - base.center) * k + center;
        Self {
            surface_size: size,
            center,
            face_radius: base.face_radius * k,
            rim_size: base.rim_size * k,
            hour_hand: base.hour_hand * k,
            minute_hand: base.minute_hand * k,
            shadow_min: place(base.shadow_min),
            shadow_max: place(base.shadow_max),
            ..base
        }
    }
}

/// Unit edge directions of one loop, one per step, starting at (-1, 0).
#[derive(Clone, Debug)]
pub struct FaceGeometry {
    edges: Vec<Vector>,
}

impl FaceGeometry {
    pub fn new(config: &FaceConfig) -> Self {
        let step = 360.0 / config.steps as f32;
        let up = Vector::new(-1.0, 0.0);
        let edges = (0..config.steps)
            .map(|i| up.rotated(i as f32 * step).normalized())
            .collect();
        Self { edges }
    }

    pub fn steps(&self) -> usize {
        self.edges.len()
    }

    // Wraps around the loop.
    #[inline]
    pub fn edge(&self, i: usize) -> Vector {
        self.edges[i % self.edges.len()]
    }
}

/// Errors from [`WatchFace::render`].
#[derive(Debug, PartialEq)]
pub enum RenderError<D, T, B> {
    Draw(D),
    Time(T),
    Battery(B),
}

impl<D: fmt::Debug, T: fmt::Debug, B: fmt::Debug> fmt::Display for RenderError<D, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Draw(e) => write!(f, "drawing failed: {:?}", e),
            RenderError::Time(e) => write!(f, "time source failed: {:?}", e),
            RenderError::Battery(e) => write!(f, "battery source failed: {:?}", e),
        }
    }
}

pub struct WatchFace<'a> {
    config: FaceConfig,
    geometry: FaceGeometry,
    face: DitherShader<'a>,
    rim: DitherShader<'a>,
    hand: DitherShader<'a>,
    shadow: MaskShader<'a>,
}

impl<'a> WatchFace<'a> {
    pub fn new(config: FaceConfig, textures: FaceTextures<'a>) -> Self {
        Self {
            geometry: FaceGeometry::new(&config),
            face: DitherShader::new(textures.face, textures.noise),
            rim: DitherShader::new(textures.rim, textures.noise),
            hand: DitherShader::new(textures.hand, textures.noise),
            shadow: MaskShader::new(textures.shadow, textures.noise, DARK),
            config,
        }
    }

    pub fn config(&self) -> &FaceConfig {
        &self.config
    }

    /// Read the time and battery once, then draw a frame.
    ///
    /// Returns the time that was drawn so the caller can skip redraws until
    /// it changes.
    pub fn render<S, T, B>(
        &self,
        surface: &mut S,
        time: &mut T,
        battery: &mut B,
    ) -> Result<WallTime, RenderError<S::Error, T::Error, B::Error>>
    where
        S: Surface,
        T: TimeSource,
        B: BatterySource,
    {
        let now = time.now().map_err(RenderError::Time)?;
        let volts = battery.voltage().map_err(RenderError::Battery)?;

        let gauge = &self.config.gauge;
        if gauge.is_warning(volts) {
            warn!(
                "battery low: {:.2} V, rim below {:.2}x",
                volts,
                gauge.warning_rim_scale()
            );
        }
        self.draw(surface, now, gauge.fill(volts)).map_err(RenderError::Draw)?;
        Ok(now)
    }

    /// Draw one frame for `time`, with the rim sized by `battery_fill` in
    /// `[0, 1]`.
    pub fn draw<S: Surface>(
        &self,
        surface: &mut S,
        time: WallTime,
        battery_fill: f32,
    ) -> Result<(), S::Error> {
        let rim_size = self.config.rim_size * self.config.gauge.rim_scale(battery_fill);
        debug!(
            "frame {:02}:{:02}, battery {:.2}, rim {:.1}",
            time.hour, time.minute, battery_fill, rim_size
        );

        let mut session = WriteSession::open(surface);
        session.clear(LIGHT)?;

        let steps = self.geometry.steps();
        let start = time.minute as usize * steps / 60;
        let offset = time.minute_fraction();
        let filled_end = start + steps * self.config.filled_loops;
        let outline_end = filled_end + steps * self.config.outline_loops;

        for i in start..filled_end {
            self.draw_filled_step(&mut *session, i, offset, rim_size)?;
        }
        for i in filled_end..outline_end {
            self.draw_outline_step(&mut *session, i, offset, rim_size)?;
        }

        self.draw_shadow(&mut *session)?;

        let c = &self.config;
        self.draw_hand(&mut *session, time.hour_angle(), c.hour_hand)?;
        self.draw_hand(&mut *session, time.minute_angle(), c.minute_hand)?;
        Ok(())
    }

    // Scale of spiral position `i` (in steps) relative to the outer loop,
    // shifted back by the minute so the spiral turns smoothly.
    #[inline]
    fn loop_scale(&self, i: usize, offset: f32) -> f32 {
        libm::powf(self.config.loop_decay, i as f32 / self.geometry.steps() as f32 - offset)
    }

    // Inner edge, outer rim edge and their loop scale for step `i`.
    fn ring(&self, i: usize, offset: f32, rim_size: f32) -> (Vector, Vector, f32) {
        let c = &self.config;
        let scale = self.loop_scale(i, offset);
        let dir = self.geometry.edge(i);
        let radius = c.face_radius * scale;
        let inner = dir * radius + c.center;
        let outer = dir * (radius + rim_size * scale) + c.center;
        (inner, outer, radius)
    }

    fn draw_filled_step<S: Surface>(
        &self,
        surface: &mut S,
        i: usize,
        offset: f32,
        rim_size: f32,
    ) -> Result<(), S::Error> {
        let c = &self.config;
        let decay = c.loop_decay;
        let (d1, d2) = (self.geometry.edge(i), self.geometry.edge(i + 1));

        let (v1, v4, r1) = self.ring(i, offset, rim_size);
        let (v2, v6, r2) = self.ring(i + 1, offset, rim_size);
        let v1a = d1 * (r1 * decay) + c.center;
        let v2a = d2 * (r2 * decay) + c.center;

        // Face quad, UVs sweep the face texture from its rim inwards
        let uv1 = d1 * c.uv_radius + c.uv_center;
        let uv2 = d2 * c.uv_radius + c.uv_center;
        let uv1a = d1 * (c.uv_radius * decay) + c.uv_center;
        let uv2a = d2 * (c.uv_radius * decay) + c.uv_center;
        self.fill(surface, [(v1a, uv1a), (v1, uv1), (v2, uv2)], &self.face)?;
        self.fill(surface, [(v2a, uv2a), (v1a, uv1a), (v2, uv2)], &self.face)?;

        // Rim quad, the mat-cap runs from the far side of the sphere to the
        // near side across its width
        let uv3 = d1 * -c.uv_radius + c.uv_center;
        let uv5 = d2 * -c.uv_radius + c.uv_center;
        self.fill(surface, [(v1, uv3), (v4, uv1), (v2, uv5)], &self.rim)?;
        self.fill(surface, [(v4, uv1), (v2, uv5), (v6, uv2)], &self.rim)?;

        stroke_line(surface, v1, v2)?;
        stroke_line(surface, v4, v6)
    }

    fn draw_outline_step<S: Surface>(
        &self,
        surface: &mut S,
        i: usize,
        offset: f32,
        rim_size: f32,
    ) -> Result<(), S::Error> {
        let (v1, v4, _) = self.ring(i, offset, rim_size);
        let (v2, v6, _) = self.ring(i + 1, offset, rim_size);
        stroke_triangle(surface, v1, v4, v2)?;
        stroke_triangle(surface, v4, v2, v6)
    }

    fn draw_shadow<S: Surface>(&self, surface: &mut S) -> Result<(), S::Error> {
        let c = &self.config;
        let (p0, p2) = (c.shadow_min, c.shadow_max);
        let (t0, t2) = (c.shadow_uv_min, c.shadow_uv_max);
        let p1 = Vector::new(p2.x, p0.y);
        let p3 = Vector::new(p0.x, p2.y);
        let t1 = Vector::new(t2.x, t0.y);
        let t3 = Vector::new(t0.x, t2.y);
        self.fill(surface, [(p0, t0), (p1, t1), (p2, t2)], &self.shadow)?;
        self.fill(surface, [(p2, t2), (p3, t3), (p0, t0)], &self.shadow)
    }

    fn draw_hand<S: Surface>(&self, surface: &mut S, angle: f32, size: f32) -> Result<(), S::Error> {
        let c = &self.config;
        let pose = HandPose::new(angle, size, c.center, c.uv_radius, c.uv_center);
        for triangle in pose.triangles() {
            fill_triangle(surface, &triangle, &self.hand)?;
        }
        for (from, to) in pose.outline() {
            stroke_line(surface, from, to)?;
        }
        Ok(())
    }

    #[inline]
    fn fill<S: Surface, H: Shader>(
        &self,
        surface: &mut S,
        corners: [(Vector, Vector); 3],
        shader: &H,
    ) -> Result<(), S::Error> {
        let [a, b, c] = corners.map(|(pos, uv)| Vertex::snapped(pos, uv));
        fill_triangle(surface, &TexturedTriangle::new(a, b, c), shader)
    }
}

#[inline]
fn to_point(v: Vector) -> Point {
    v.truncate().into()
}

fn stroke_line<S: Surface>(surface: &mut S, from: Vector, to: Vector) -> Result<(), S::Error> {
    Line::new(to_point(from), to_point(to))
        .into_styled(PrimitiveStyle::with_stroke(DARK, 1))
        .draw(surface)
}

fn stroke_triangle<S: Surface>(surface: &mut S, a: Vector, b: Vector, c: Vector) -> Result<(), S::Error> {
    Triangle::new(to_point(a), to_point(b), to_point(c))
        .into_styled(PrimitiveStyle::with_stroke(DARK, 1))
        .draw(surface)
}
