//! Barycentric weights against a triangle's edge vectors.
//!
//! The inverse of the triangle's doubled area is computed once per triangle
//! and reused for every pixel the rasterizer visits.

use crate::geometry::{Offset, Vector, VectorInt};

/// Affine weights of a point relative to a triangle's three vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Weights {
    pub u: f32,
    pub v: f32,
    pub w: f32,
}

impl Weights {
    // Blend three per-vertex attributes (UVs here) by these weights.
    #[inline]
    pub fn interpolate(&self, a0: Vector, a1: Vector, a2: Vector) -> Vector {
        a0 * self.u + a1 * self.v + a2 * self.w
    }
}

/// A triangle expressed as an origin and two edges, `a = v1 - v0` and
/// `b = v2 - v0`, plus `1 / cross(a, b)`.
#[derive(Copy, Clone, Debug)]
pub struct EdgeBasis {
    origin: VectorInt,
    a: Offset,
    b: Offset,
    inv_den: f32,
}

impl EdgeBasis {
    /// Returns `None` for zero-area triangles, whose weights are undefined.
    pub fn new(v0: VectorInt, v1: VectorInt, v2: VectorInt) -> Option<Self> {
        let a = v1.offset_from(v0);
        let b = v2.offset_from(v0);
        let den = a.cross(b);
        if den == 0 {
            return None;
        }
        Some(Self {
            origin: v0,
            a,
            b,
            inv_den: 1.0 / den as f32,
        })
    }

    // No containment check: the scanline walk only asks for points it
    // already knows are inside.
    #[inline]
    pub fn weights(&self, p: VectorInt) -> Weights {
        let d = p.offset_from(self.origin);
        let v = d.cross(self.b) as f32 * self.inv_den;
        let w = self.a.cross(d) as f32 * self.inv_den;
        Weights { u: 1.0 - v - w, v, w }
    }
}
