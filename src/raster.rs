//! Scanline rasterizer for UV-mapped triangles.
//!
//! `fill_triangle` sorts the vertices by row, walks the left and right edges
//! with integer accumulators (no per-row divide by a float slope) and hands
//! every row span to `fill_span`, which interpolates UVs barycentrically and
//! asks the [`Shader`] what to do with each pixel. A triangle whose three
//! vertices share one row goes through `fill_flat_span` instead.
//!
//! Rows and columns outside the surface's bounding box are clipped silently.
//! Zero-area triangles that are not flat are skipped.

use core::mem::swap;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use log::trace;

use crate::barycentric::EdgeBasis;
use crate::geometry::{Vector, VectorInt};
use crate::shader::{PaintDecision, Shader};
use crate::surface::{Surface, WriteSession};

/// A screen-space position with its texture coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub pos: VectorInt,
    pub uv: Vector,
}

impl Vertex {
    #[inline]
    pub const fn new(pos: VectorInt, uv: Vector) -> Self {
        Self { pos, uv }
    }

    // Snap a sub-pixel position onto the grid, keeping its UV.
    #[inline]
    pub fn snapped(pos: Vector, uv: Vector) -> Self {
        Self { pos: pos.truncate(), uv }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TexturedTriangle {
    pub vertices: [Vertex; 3],
}

impl TexturedTriangle {
    pub const fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self { vertices: [v0, v1, v2] }
    }
}

// Visible [start, end) along one axis.
#[derive(Copy, Clone, Debug)]
struct Clip {
    start: i32,
    end: i32,
}

impl Clip {
    fn rows<S: Dimensions + ?Sized>(surface: &S) -> Self {
        let bb = surface.bounding_box();
        Clip { start: bb.top_left.y, end: bb.top_left.y + bb.size.height as i32 }
    }

    fn columns<S: Dimensions + ?Sized>(surface: &S) -> Self {
        let bb = surface.bounding_box();
        Clip { start: bb.top_left.x, end: bb.top_left.x + bb.size.width as i32 }
    }

    #[inline]
    fn contains(&self, v: i32) -> bool {
        v >= self.start && v < self.end
    }
}

/// Rasterize one textured triangle.
///
/// The surface write session is held for the whole call and released on
/// every return path.
pub fn fill_triangle<S, H>(
    surface: &mut S,
    triangle: &TexturedTriangle,
    shader: &H,
) -> Result<(), S::Error>
where
    S: Surface + ?Sized,
    H: Shader + ?Sized,
{
    let [mut v0, mut v1, mut v2] = triangle.vertices;

    // Sort by row (y2 >= y1 >= y0), UVs travel with their vertex
    if v0.pos.y > v1.pos.y {
        swap(&mut v0, &mut v1);
    }
    if v1.pos.y > v2.pos.y {
        swap(&mut v1, &mut v2);
    }
    if v0.pos.y > v1.pos.y {
        swap(&mut v0, &mut v1);
    }

    let mut session = WriteSession::open(surface);

    // All three on one row: a single span between the outermost vertices
    if v0.pos.y == v2.pos.y {
        let (mut left, mut right) = (v0, v0);
        for v in [v1, v2] {
            if v.pos.x < left.pos.x {
                left = v;
            } else if v.pos.x > right.pos.x {
                right = v;
            }
        }
        return fill_flat_span(
            &mut *session,
            v0.pos.y,
            left.pos.x,
            right.pos.x,
            left.uv,
            right.uv,
            shader,
        );
    }

    let basis = match EdgeBasis::new(v0.pos, v1.pos, v2.pos) {
        Some(basis) => basis,
        None => {
            trace!("skipping zero-area triangle {:?}", triangle.vertices);
            return Ok(());
        }
    };
    let uvs = [v0.uv, v1.uv, v2.uv];
    let rows = Clip::rows(&*session);

    // Widened: vertices may sit anywhere in i32 even though only visible
    // rows are walked.
    let (x0, y0) = (v0.pos.x as i64, v0.pos.y as i64);
    let (x1, y1) = (v1.pos.x as i64, v1.pos.y as i64);
    let (x2, y2) = (v2.pos.x as i64, v2.pos.y as i64);
    let (dx01, dy01) = (x1 - x0, y1 - y0);
    let (dx02, dy02) = (x2 - x0, y2 - y0);
    let (dx12, dy12) = (x2 - x1, y2 - y1);
    let (top, bottom) = (rows.start as i64, rows.end as i64);

    // Upper part: edges 0-1 and 0-2. A flat-bottomed triangle includes row
    // y1 here and skips the lower loop (dy12 == 0); otherwise y1 belongs to
    // the lower loop, which also keeps a flat top (dy01 == 0) out of here.
    let last = if y1 == y2 { y1 } else { y1 - 1 };

    let mut y = y0.max(top);
    let mut sa = dx01 as i128 * (y - y0) as i128;
    let mut sb = dx02 as i128 * (y - y0) as i128;
    while y <= last && y < bottom {
        let a = edge_x(x0, sa, dy01);
        let b = edge_x(x0, sb, dy02);
        sa += dx01 as i128;
        sb += dx02 as i128;
        fill_span(&mut *session, y as i32, a, b, &basis, &uvs, shader)?;
        y += 1;
    }

    // Lower part: edges 1-2 and 0-2. Skipped when y1 == y2.
    let mut y = (last + 1).max(top);
    let mut sa = dx12 as i128 * (y - y1) as i128;
    let mut sb = dx02 as i128 * (y - y0) as i128;
    while y <= y2 && y < bottom {
        let a = edge_x(x1, sa, dy12);
        let b = edge_x(x0, sb, dy02);
        sa += dx12 as i128;
        sb += dx02 as i128;
        fill_span(&mut *session, y as i32, a, b, &basis, &uvs, shader)?;
        y += 1;
    }

    Ok(())
}

// Column of an edge leaving `x` with slope `dx / dy`, `s = dx * rows` below
// its start. Pinned to i32; the span clip does the rest.
#[inline]
fn edge_x(x: i64, s: i128, dy: i64) -> i32 {
    (x as i128 + s / dy as i128).clamp(i32::MIN as i128, i32::MAX as i128) as i32
}

/// Fill one row of a triangle's interior, `x0..=x1` in either order.
///
/// Every pixel's UV is the barycentric blend of the triangle's three vertex
/// UVs (`uvs` in the same order as the vertices `basis` was built from).
/// Callers are expected to hold a write session.
pub fn fill_span<S, H>(
    surface: &mut S,
    y: i32,
    x0: i32,
    x1: i32,
    basis: &EdgeBasis,
    uvs: &[Vector; 3],
    shader: &H,
) -> Result<(), S::Error>
where
    S: Surface + ?Sized,
    H: Shader + ?Sized,
{
    let (a, b) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
    let cols = Clip::columns(&*surface);
    let (a, b) = (a.max(cols.start), b.min(cols.end - 1));
    if a > b || !Clip::rows(&*surface).contains(y) {
        return Ok(());
    }

    surface.draw_iter((a..=b).filter_map(|x| {
        let p = VectorInt::new(x, y);
        let uv = basis.weights(p).interpolate(uvs[0], uvs[1], uvs[2]);
        paint(shader, p.into(), uv)
    }))
}

/// Fill a span whose triangle collapsed onto one row.
///
/// Barycentric weights are undefined here, so the UV runs linearly from
/// `uv_a` at `x0` to `uv_b` at `x1`. A one-pixel span samples `uv_a`.
/// Each end keeps its own vertex's UV. This intentionally differs from the
/// reversed blend that hands the leftmost pixel the right-hand UV.
pub fn fill_flat_span<S, H>(
    surface: &mut S,
    y: i32,
    x0: i32,
    x1: i32,
    uv_a: Vector,
    uv_b: Vector,
    shader: &H,
) -> Result<(), S::Error>
where
    S: Surface + ?Sized,
    H: Shader + ?Sized,
{
    let mut session = WriteSession::open(surface);

    let (x0, x1, uv_a, uv_b) = if x0 <= x1 { (x0, x1, uv_a, uv_b) } else { (x1, x0, uv_b, uv_a) };
    if !Clip::rows(&*session).contains(y) {
        return Ok(());
    }
    let cols = Clip::columns(&*session);
    let (a, b) = (x0.max(cols.start), x1.min(cols.end - 1));
    if a > b {
        return Ok(());
    }

    let steps = (x1 as i64 - x0 as i64) as f32;
    session.draw_iter((a..=b).filter_map(|x| {
        let t = if steps > 0.0 { (x as i64 - x0 as i64) as f32 / steps } else { 0.0 };
        let uv = uv_a * (1.0 - t) + uv_b * t;
        paint(shader, Point::new(x, y), uv)
    }))
}

#[inline]
fn paint<H: Shader + ?Sized>(shader: &H, p: Point, uv: Vector) -> Option<Pixel<BinaryColor>> {
    match shader.shade(p, uv) {
        PaintDecision::Paint(color) => Some(Pixel(p, color)),
        PaintDecision::Skip => None,
    }
}
