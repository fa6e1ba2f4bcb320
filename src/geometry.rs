//! 2-D vector types shared by the rasterizer and the watch-face composer.
//!
//! `Vector` carries sub-pixel geometry and texture (UV) coordinates,
//! `VectorInt` carries screen-space vertices after the composer has snapped
//! them to the pixel grid.

use core::ops::{Add, Mul, Neg, Sub};

use embedded_graphics::prelude::Point;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: Vector) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3-D cross product of the two vectors.
    #[inline]
    pub fn cross(self, other: Vector) -> f32 {
        self.x * other.y - other.x * self.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        libm::sqrtf(self.dot(self))
    }

    // Unit vector in the same direction; the zero vector stays zero.
    pub fn normalized(self) -> Vector {
        let len = self.length();
        if len == 0.0 {
            return Vector::ZERO;
        }
        Vector::new(self.x / len, self.y / len)
    }

    /// Rotate by `degrees`, clockwise on screen (y grows downwards).
    pub fn rotated(self, degrees: f32) -> Vector {
        let radians = degrees.to_radians();
        self.rotated_by(libm::sinf(radians), libm::cosf(radians))
    }

    /// Rotate with a precomputed sine/cosine pair, for rotating whole tables
    /// by one angle.
    #[inline]
    pub fn rotated_by(self, sin: f32, cos: f32) -> Vector {
        Vector::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    // Snap to the pixel grid. Truncates toward zero.
    #[inline]
    pub fn truncate(self) -> VectorInt {
        VectorInt::new(self.x as i32, self.y as i32)
    }
}

impl Add for Vector {
    type Output = Vector;
    #[inline]
    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Vector;
    #[inline]
    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector {
    type Output = Vector;
    #[inline]
    fn mul(self, s: f32) -> Vector {
        Vector::new(self.x * s, self.y * s)
    }
}

impl Neg for Vector {
    type Output = Vector;
    #[inline]
    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

impl From<VectorInt> for Vector {
    fn from(v: VectorInt) -> Self {
        Vector::new(v.x as f32, v.y as f32)
    }
}

// Integer screen-space vector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VectorInt {
    pub x: i32,
    pub y: i32,
}

impl VectorInt {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `self - origin`, widened so any two `i32` positions subtract exactly.
    #[inline]
    pub fn offset_from(self, origin: VectorInt) -> Offset {
        Offset {
            x: self.x as i64 - origin.x as i64,
            y: self.y as i64 - origin.y as i64,
        }
    }
}

/// Difference between two [`VectorInt`]s.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

impl Offset {
    // Each product needs up to 66 bits once the offsets span the i32 range.
    #[inline]
    pub fn cross(self, other: Offset) -> i128 {
        self.x as i128 * other.y as i128 - other.x as i128 * self.y as i128
    }
}

impl From<Point> for VectorInt {
    fn from(p: Point) -> Self {
        VectorInt::new(p.x, p.y)
    }
}

impl From<VectorInt> for Point {
    fn from(v: VectorInt) -> Self {
        Point::new(v.x, v.y)
    }
}
