//! Clock hand model.
//!
//! A hand is a fan of seven triangles over seven outline points, in a unit
//! space where the tip sits at (0, -1) and the pivot at the origin. Each
//! triangle corner carries its own mat-cap normal so the hand reads as a
//! bevelled blade rather than a flat shape.

use crate::geometry::Vector;
use crate::raster::{TexturedTriangle, Vertex};

pub const HAND_POINTS: [Vector; 7] = [
    Vector::new(0.0, -1.0),
    Vector::new(0.0, -0.8),
    Vector::new(0.1, -0.8),
    Vector::new(0.0, 0.0),
    Vector::new(0.05, 0.15),
    Vector::new(-0.05, 0.15),
    Vector::new(-0.1, -0.8),
];

// Mat-cap normals, three per triangle (some shared).
pub const HAND_NORMALS: [Vector; 17] = [
    Vector::new(0.5, -0.85),
    Vector::new(0.2, -0.2),
    Vector::new(0.85, -0.5),
    Vector::new(0.3, -0.1),
    Vector::new(0.96, -0.1),
    Vector::new(0.3, 0.1),
    Vector::new(0.96, 0.1),
    Vector::new(0.0, 0.3),
    Vector::new(0.1, 0.96),
    Vector::new(-0.1, 0.96),
    Vector::new(-0.3, -0.1),
    Vector::new(-0.96, -0.1),
    Vector::new(-0.3, 0.1),
    Vector::new(-0.96, 0.1),
    Vector::new(-0.5, -0.85),
    Vector::new(-0.2, -0.2),
    Vector::new(-0.85, -0.5),
];

pub const HAND_TRIANGLES: [[usize; 3]; 7] = [
    [0, 1, 2],
    [1, 2, 3],
    [2, 3, 4],
    [3, 4, 5],
    [3, 5, 6],
    [3, 6, 1],
    [6, 1, 0],
];

pub const HAND_TRIANGLE_NORMALS: [[usize; 3]; 7] = [
    [0, 1, 2],
    [3, 4, 5],
    [4, 5, 6],
    [7, 8, 9],
    [10, 11, 13],
    [10, 13, 12],
    [14, 15, 16],
];

// Closed outline, drawn edge by edge.
pub const HAND_OUTLINE: [usize; 5] = [0, 2, 4, 5, 6];

/// One hand placement: rotation, length and where the pivot goes, plus where
/// the mat-cap sits in texture space.
#[derive(Copy, Clone, Debug)]
pub struct HandPose {
    sin: f32,
    cos: f32,
    size: f32,
    center: Vector,
    uv_radius: f32,
    uv_center: Vector,
}

impl HandPose {
    pub fn new(angle: f32, size: f32, center: Vector, uv_radius: f32, uv_center: Vector) -> Self {
        let radians = angle.to_radians();
        Self {
            sin: libm::sinf(radians),
            cos: libm::cosf(radians),
            size,
            center,
            uv_radius,
            uv_center,
        }
    }

    #[inline]
    pub fn place(&self, p: Vector) -> Vector {
        p.rotated_by(self.sin, self.cos) * self.size + self.center
    }

    #[inline]
    fn normal_uv(&self, n: Vector) -> Vector {
        n.rotated_by(self.sin, self.cos) * self.uv_radius + self.uv_center
    }

    pub fn points(&self) -> [Vector; 7] {
        HAND_POINTS.map(|p| self.place(p))
    }

    pub fn triangles(&self) -> [TexturedTriangle; 7] {
        let points = self.points();
        core::array::from_fn(|i| {
            let [p0, p1, p2] = HAND_TRIANGLES[i];
            let [n0, n1, n2] = HAND_TRIANGLE_NORMALS[i];
            TexturedTriangle::new(
                Vertex::snapped(points[p0], self.normal_uv(HAND_NORMALS[n0])),
                Vertex::snapped(points[p1], self.normal_uv(HAND_NORMALS[n1])),
                Vertex::snapped(points[p2], self.normal_uv(HAND_NORMALS[n2])),
            )
        })
    }

    // Outline edges as (from, to) pairs, wrapping back to the first point.
    pub fn outline(&self) -> [(Vector, Vector); 5] {
        let points = self.points();
        core::array::from_fn(|i| {
            let from = points[HAND_OUTLINE[i]];
            let to = points[HAND_OUTLINE[(i + 1) % HAND_OUTLINE.len()]];
            (from, to)
        })
    }
}
