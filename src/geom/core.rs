use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Reinterpret this vector as a position relative to the origin.
    #[must_use]
    pub const fn to_point3(self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, rhs: Vec3) -> Self::Output {
        Vec3::new(self * rhs.x, self * rhs.y, self * rhs.z)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

/// A point in model space.
///
/// Serialized as a bare `[x, y, z]` array so control-point records stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    /// The origin point (0, 0, 0).
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Convert point to a position vector from the origin.
    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Linear interpolation between two points.
    /// Returns `self * (1 - t) + rhs * t`.
    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        Self::new(
            self.x + (rhs.x - self.x) * t,
            self.y + (rhs.y - self.y) * t,
            self.z + (rhs.z - self.z) * t,
        )
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self - other).length()
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Default for Point3 {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HPoint4
// ─────────────────────────────────────────────────────────────────────────────

/// Homogeneous control point `(w·x, w·y, w·z, w)`.
///
/// Every knot operation runs on homogeneous points so that rational and
/// polynomial records share one code path; polynomial records use `w = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HPoint4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl HPoint4 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Lift a Euclidean point with weight `w` into homogeneous space.
    #[must_use]
    pub const fn from_weighted(point: Point3, w: f64) -> Self {
        Self::new(point.x * w, point.y * w, point.z * w, w)
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        let s = 1.0 - t;
        Self::new(
            self.x * s + rhs.x * t,
            self.y * s + rhs.y * t,
            self.z * s + rhs.z * t,
            self.w * s + rhs.w * t,
        )
    }

    /// Project back to Euclidean space. Returns `None` for a zero or non-finite weight.
    #[must_use]
    pub fn to_point3(self) -> Option<Point3> {
        if self.w.is_finite() && self.w != 0.0 {
            Some(Point3::new(self.x / self.w, self.y / self.w, self.z / self.w))
        } else {
            None
        }
    }

    /// The weighted coordinates `(w·x, w·y, w·z)` as a point, without dividing.
    #[must_use]
    pub const fn weighted_part(self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }

    /// Four-dimensional Euclidean distance.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        let d = self - other;
        (d.x * d.x + d.y * d.y + d.z * d.z + d.w * d.w).sqrt()
    }
}

impl Add for HPoint4 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w + rhs.w)
    }
}

impl Sub for HPoint4 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z, self.w - rhs.w)
    }
}

impl Mul<f64> for HPoint4 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs)
    }
}

impl Div<f64> for HPoint4 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs, self.w / rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BBox
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Point3,
    pub max: Point3,
}

impl BBox {
    #[must_use]
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let mut iter = points.iter().copied();
        let first = iter.next()?;
        let mut min = first;
        let mut max = first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Self::new(min, max))
    }

    /// Largest absolute coordinate touched by the box.
    #[must_use]
    pub fn max_abs_coordinate(self) -> f64 {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerance configuration for geometric operations.
///
/// Use the named constants for specific use cases to avoid epsilon scatter:
/// - `Tolerance::DEFAULT` - Evaluator domain slack (1e-9)
/// - `Tolerance::KNOT` - Bucketing knot values into multiplicity groups (1e-10)
/// - `Tolerance::ZERO_LENGTH` - Detecting degenerate/zero-length vectors (1e-12)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    /// Default geometric tolerance (1e-9).
    pub const DEFAULT: Self = Self { eps: 1e-9 };

    /// Knot values closer than this are the same knot (1e-10).
    pub const KNOT: Self = Self { eps: 1e-10 };

    /// Tolerance for detecting zero-length/degenerate vectors and edges (1e-12).
    /// Use this when checking if a vector length is essentially zero.
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };

    /// Tight tolerance for precise comparisons (1e-12).
    pub const TIGHT: Self = Self { eps: 1e-12 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub const fn eps_squared(self) -> f64 {
        self.eps * self.eps
    }

    /// Create a scaled tolerance (e.g., for relative comparisons).
    #[must_use]
    pub fn scaled(self, scale: f64) -> Self {
        Self::new(self.eps * scale.abs())
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    /// Check if a vector is approximately zero (degenerate).
    #[must_use]
    pub fn is_zero_vec3(self, v: Vec3) -> bool {
        v.length_squared() <= self.eps_squared()
    }

    /// Element-wise comparison of two value slices of equal length.
    #[must_use]
    pub fn approx_eq_slice(self, a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.approx_eq_f64(*x, *y))
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operators() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(2.0 * a, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(a.dot(b), 32.0);
    }

    #[test]
    fn test_point3_lerp() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 20.0, 30.0);

        assert_eq!(a.lerp(b, 0.5), Point3::new(5.0, 10.0, 15.0));
        assert_eq!(b - a, Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(a + Vec3::new(1.0, 0.0, -1.0), Point3::new(1.0, 0.0, -1.0));
        assert!((a.distance_to(Point3::new(2.0, 3.0, 6.0)) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_hpoint_round_trips_weighted_point() {
        let p = Point3::new(1.0, -2.0, 4.0);
        let h = HPoint4::from_weighted(p, 0.5);
        assert_eq!(h, HPoint4::new(0.5, -1.0, 2.0, 0.5));
        assert_eq!(h.to_point3(), Some(p));
        assert_eq!(HPoint4::new(1.0, 1.0, 1.0, 0.0).to_point3(), None);
    }

    #[test]
    fn test_hpoint_lerp_blends_weight() {
        let a = HPoint4::new(0.0, 0.0, 0.0, 1.0);
        let b = HPoint4::new(2.0, 2.0, 2.0, 2.0);
        let mid = a.lerp(b, 0.5);
        assert_eq!(mid, HPoint4::new(1.0, 1.0, 1.0, 1.5));
        assert!((a.distance_to(b) - 13.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_bbox_extent() {
        let bbox = BBox::from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, -3.0, 6.0),
        ])
        .unwrap();

        assert_eq!(bbox.max, Point3::new(2.0, 0.0, 6.0));
        assert!((bbox.max_abs_coordinate() - 6.0).abs() < 1e-12);
        assert!(BBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_tolerance_constants() {
        assert!(Tolerance::ZERO_LENGTH.eps < Tolerance::KNOT.eps);
        assert!(Tolerance::KNOT.eps < Tolerance::DEFAULT.eps);
        assert_eq!(Tolerance::default(), Tolerance::DEFAULT);
    }

    #[test]
    fn test_tolerance_slice_comparison() {
        let tol = Tolerance::new(1e-9);
        assert!(tol.approx_eq_slice(&[0.0, 0.5, 1.0], &[0.0, 0.5 + 1e-10, 1.0]));
        assert!(!tol.approx_eq_slice(&[0.0, 0.5, 1.0], &[0.0, 0.5 + 1e-8, 1.0]));
        assert!(!tol.approx_eq_slice(&[0.0, 1.0], &[0.0, 0.5, 1.0]));
    }

    #[test]
    fn test_point3_serializes_as_array() {
        let p = Point3::new(1.0, 2.5, -3.0);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[1.0,2.5,-3.0]");
        let back: Point3 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
