//! Geometry Primitives
//!
//! 2D positions, offsets and the axis-aligned arena rectangle.
//! All simulation math is f64; determinism comes from a fixed
//! operation order, not from the number format.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Below this magnitude a vector is treated as zero when rescaling,
/// to avoid division blow-up.
pub const LENGTH_EPSILON: f64 = 1e-9;

/// A displacement between two positions.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl Offset {
    /// Zero offset
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new offset.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit offset pointing along `orientation` (radians).
    #[inline]
    pub fn from_orientation(orientation: f64) -> Self {
        Self {
            x: orientation.cos(),
            y: orientation.sin(),
        }
    }

    /// Magnitude.
    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Squared magnitude (avoids sqrt - prefer for comparisons).
    #[inline]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Direction angle in radians (atan2 convention, in (-pi, pi]).
    #[inline]
    pub fn orientation(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Rescale to the given length, preserving direction.
    ///
    /// No-op for near-zero offsets (below [`LENGTH_EPSILON`]) so the
    /// division can never blow up.
    #[inline]
    pub fn with_length(self, length: f64) -> Self {
        let current = self.length();
        if current < LENGTH_EPSILON {
            return self;
        }
        self.scale(length / current)
    }

    /// Scale both components.
    #[inline]
    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl Add for Offset {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Offset {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Offset {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Neg for Offset {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset({:.3}, {:.3})", self.x, self.y)
    }
}

/// A point in the arena plane.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Position {
    /// Origin
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new position.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }
}

impl Sub for Position {
    type Output = Offset;
    #[inline]
    fn sub(self, rhs: Self) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Offset> for Position {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Offset) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub<Offset> for Position {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Offset) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({:.3}, {:.3})", self.x, self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Axis-aligned rectangle, screen convention: `top < bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum x
    pub left: f64,
    /// Maximum x
    pub right: f64,
    /// Minimum y
    pub top: f64,
    /// Maximum y
    pub bottom: f64,
}

impl Rect {
    /// Create from bounds.
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Width (right - left).
    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height (bottom - top).
    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Top-left corner.
    #[inline]
    pub fn top_left(&self) -> Position {
        Position::new(self.left, self.top)
    }

    /// Top-right corner.
    #[inline]
    pub fn top_right(&self) -> Position {
        Position::new(self.right, self.top)
    }

    /// Bottom-left corner.
    #[inline]
    pub fn bottom_left(&self) -> Position {
        Position::new(self.left, self.bottom)
    }

    /// Bottom-right corner.
    #[inline]
    pub fn bottom_right(&self) -> Position {
        Position::new(self.right, self.bottom)
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Position {
        Position::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    /// Check if a point lies inside (bounds inclusive).
    #[inline]
    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// Wrap an angle to the (-pi, pi] interval.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % std::f64::consts::TAU;
    if a > std::f64::consts::PI {
        a -= std::f64::consts::TAU;
    } else if a <= -std::f64::consts::PI {
        a += std::f64::consts::TAU;
    }
    a
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_offset_length() {
        // 3-4-5 triangle
        let v = Offset::new(3.0, 4.0);
        assert_eq!(v.length_squared(), 25.0);
        assert_eq!(v.length(), 5.0);
    }

    #[test]
    fn test_offset_orientation() {
        assert_eq!(Offset::new(1.0, 0.0).orientation(), 0.0);
        assert!((Offset::new(0.0, 1.0).orientation() - FRAC_PI_2).abs() < 1e-12);
        assert!((Offset::new(-1.0, 0.0).orientation() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_with_length() {
        let v = Offset::new(3.0, 4.0).with_length(10.0);
        assert!((v.x - 6.0).abs() < 1e-12);
        assert!((v.y - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_with_length_near_zero_is_noop() {
        let tiny = Offset::new(1e-12, -1e-12);
        assert_eq!(tiny.with_length(100.0), tiny);
        assert_eq!(Offset::ZERO.with_length(5.0), Offset::ZERO);
    }

    #[test]
    fn test_position_offset_algebra() {
        let a = Position::new(1.0, 2.0);
        let b = Position::new(4.0, 6.0);
        let d = b - a;
        assert_eq!(d, Offset::new(3.0, 4.0));
        assert_eq!(a + d, b);
        assert_eq!(b - d, a);
    }

    #[test]
    fn test_rect_accessors() {
        let r = Rect::new(-10.0, -5.0, 10.0, 5.0);
        assert_eq!(r.width(), 20.0);
        assert_eq!(r.height(), 10.0);
        assert_eq!(r.top_left(), Position::new(-10.0, -5.0));
        assert_eq!(r.bottom_right(), Position::new(10.0, 5.0));
        assert_eq!(r.center(), Position::ORIGIN);
        assert!(r.contains(Position::new(3.0, -2.0)));
        assert!(!r.contains(Position::new(11.0, 0.0)));
    }

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(0.0), 0.0);
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI) - PI).abs() < 1e-12);
        // -pi maps to the open end of the interval
        assert!(wrap_angle(-PI) > 0.0);
    }

    proptest! {
        #[test]
        fn prop_with_length_hits_requested_length(
            x in -1e4f64..1e4,
            y in -1e4f64..1e4,
            len in 1e-3f64..1e3,
        ) {
            let v = Offset::new(x, y);
            prop_assume!(v.length() >= 1e-6);
            let rescaled = v.with_length(len);
            prop_assert!((rescaled.length() - len).abs() < 1e-9 * len.max(1.0));
        }

        #[test]
        fn prop_wrap_angle_in_interval(a in -1e3f64..1e3) {
            let w = wrap_angle(a);
            prop_assert!(w > -PI && w <= PI);
        }
    }
}
