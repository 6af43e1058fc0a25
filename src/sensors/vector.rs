//! # 3-Axis Vector
//!
//! Result type of every 3-axis sensor read.
//!
//! Frame convention: +Z toward the sky, +X toward the front of the airframe,
//! +Y to the left (right-hand rule).

use serde::Serialize;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Three real components in engineering units.
///
/// Magnitude and plane angles are computed on demand.
///
/// # Examples
///
/// ```
/// use flight_hal::sensors::vector::Vector3;
///
/// let v = Vector3::new(3.0, 4.0, 0.0);
/// assert_eq!(v.magnitude(), 5.0);
/// assert!((v.angle_xy() - 53.130).abs() < 0.001);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Fallback value for failed reads
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from a polar description.
    ///
    /// `angle_xy` is measured in the XY plane from +X, `angle_from_horizontal`
    /// is the elevation above that plane, both in degrees.
    #[must_use]
    pub fn from_angles(angle_xy: f64, angle_from_horizontal: f64, magnitude: f64) -> Self {
        let azimuth = angle_xy.to_radians();
        let elevation = angle_from_horizontal.to_radians();
        let horizontal = magnitude * elevation.cos();

        Self {
            x: horizontal * azimuth.cos(),
            y: horizontal * azimuth.sin(),
            z: magnitude * elevation.sin(),
        }
    }

    #[must_use]
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    #[must_use]
    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Vector3 {
        Vector3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Component-wise product, used for mounting sign corrections
    #[must_use]
    pub fn component_mul(&self, factors: [f64; 3]) -> Vector3 {
        Vector3::new(self.x * factors[0], self.y * factors[1], self.z * factors[2])
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Vector3::ZERO
    }

    /// Angle in the XY plane from +X, counterclockwise about +Z, in degrees
    #[must_use]
    pub fn angle_xy(&self) -> f64 {
        self.y.atan2(self.x).to_degrees()
    }

    /// Angle in the XZ plane from +X, rotated about -Y, in degrees
    #[must_use]
    pub fn angle_xz(&self) -> f64 {
        self.z.atan2(self.x).to_degrees()
    }

    /// Angle in the YZ plane from +Y, rotated about -X, in degrees
    #[must_use]
    pub fn angle_yz(&self) -> f64 {
        self.z.atan2(self.y).to_degrees()
    }

    /// Elevation of the vector above the XY plane, in degrees
    #[must_use]
    pub fn angle_from_horizontal(&self) -> f64 {
        self.z.atan2(self.x.hypot(self.y)).to_degrees()
    }

    /// Angle between two vectors in degrees, `None` if either is zero length
    #[must_use]
    pub fn angle_between(&self, other: &Vector3) -> Option<f64> {
        let denominator = self.magnitude() * other.magnitude();
        if denominator == 0.0 {
            return None;
        }

        let cosine = (self.dot(other) / denominator).clamp(-1.0, 1.0);
        Some(cosine.acos().to_degrees())
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_zero_vector() {
        assert!(Vector3::ZERO.is_zero());
        assert_eq!(Vector3::default(), Vector3::ZERO);
        assert_eq!(Vector3::ZERO.magnitude(), 0.0);
    }

    #[test]
    fn test_plane_angles() {
        let v = Vector3::new(0.0, 1.0, 0.0);
        assert!(approx(v.angle_xy(), 90.0));

        let v = Vector3::new(1.0, 0.0, 1.0);
        assert!(approx(v.angle_xz(), 45.0));
        assert!(approx(v.angle_from_horizontal(), 45.0));

        let v = Vector3::new(0.0, -1.0, 0.0);
        assert!(approx(v.angle_yz(), 180.0));
    }

    #[test]
    fn test_angle_between() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 2.0, 0.0);
        assert!(approx(x.angle_between(&y).unwrap(), 90.0));
        assert!(approx(x.angle_between(&x).unwrap(), 0.0));
        assert!(x.angle_between(&Vector3::ZERO).is_none());
    }

    #[test]
    fn test_from_angles_round_trip() {
        let v = Vector3::from_angles(30.0, 20.0, 2.0);
        assert!(approx(v.magnitude(), 2.0));
        assert!(approx(v.angle_xy(), 30.0));
        assert!(approx(v.angle_from_horizontal(), 20.0));
    }

    #[test]
    fn test_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(0.5, 0.5, 0.5);
        assert_eq!(a - b, Vector3::new(0.5, 1.5, 2.5));
        assert_eq!(a + b, Vector3::new(1.5, 2.5, 3.5));
        assert_eq!(-a, Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(a.scale(2.0), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(a.component_mul([1.0, 1.0, -1.0]), Vector3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Vector3::new(1.0, -0.5, 0.25).to_string(), "(1.000, -0.500, 0.250)");
    }
}
