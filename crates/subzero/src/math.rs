//! Scalar abstraction and small fixed-size linear algebra.
//!
//! The whole simulation is generic over the floating-point type: single
//! precision halves memory traffic for large floe fields, double precision
//! is the default for conservation studies. `Scalar` collects the numeric
//! traits the physics needs; `Vec2`/`Mat2` are the only vector types used
//! anywhere in the crate.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};

/// Floating-point scalar carried through all geometry and physics.
///
/// Implemented for `f32` and `f64`.
pub trait Scalar:
    Float
    + FromPrimitive
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Sum<Self>
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
{
}

impl Scalar for f32 {}
impl Scalar for f64 {}

/// Convert an `f64` literal to the simulation scalar.
///
/// The conversion cannot fail for finite literals, which is the only way
/// this is called.
#[inline]
pub fn fl<F: Scalar>(x: f64) -> F {
    F::from(x).unwrap()
}

/// 2-D vector over the simulation scalar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2<F> {
    pub x: F,
    pub y: F,
}

impl<F: Scalar> Vec2<F> {
    #[inline]
    pub fn new(x: F, y: F) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn zero() -> Self {
        Self {
            x: F::zero(),
            y: F::zero(),
        }
    }

    #[inline]
    pub fn dot(self, rhs: Self) -> F {
        self.x * rhs.x + self.y * rhs.y
    }

    /// 2-D cross product (z component of the 3-D cross).
    #[inline]
    pub fn perp_dot(self, rhs: Self) -> F {
        self.x * rhs.y - self.y * rhs.x
    }

    /// Counter-clockwise perpendicular.
    #[inline]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    #[inline]
    pub fn length_squared(self) -> F {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> F {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance(self, rhs: Self) -> F {
        (self - rhs).length()
    }

    #[inline]
    pub fn distance_squared(self, rhs: Self) -> F {
        (self - rhs).length_squared()
    }

    /// Unit vector, or zero when the length is below `F::epsilon()`.
    #[inline]
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > F::epsilon() {
            self / len
        } else {
            Self::zero()
        }
    }

    /// Rotate counter-clockwise by `angle` radians.
    #[inline]
    pub fn rotate(self, angle: F) -> Self {
        let (s, c) = (angle.sin(), angle.cos());
        Self::new(c * self.x - s * self.y, s * self.x + c * self.y)
    }
}

impl<F: Scalar> Add for Vec2<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<F: Scalar> Sub for Vec2<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl<F: Scalar> Neg for Vec2<F> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl<F: Scalar> Mul<F> for Vec2<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: F) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl<F: Scalar> Div<F> for Vec2<F> {
    type Output = Self;
    #[inline]
    fn div(self, rhs: F) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl<F: Scalar> AddAssign for Vec2<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl<F: Scalar> SubAssign for Vec2<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// 2×2 matrix, row-major. Used for stress and strain tensors.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mat2<F> {
    pub xx: F,
    pub xy: F,
    pub yx: F,
    pub yy: F,
}

impl<F: Scalar> Mat2<F> {
    #[inline]
    pub fn new(xx: F, xy: F, yx: F, yy: F) -> Self {
        Self { xx, xy, yx, yy }
    }

    #[inline]
    pub fn zero() -> Self {
        let z = F::zero();
        Self::new(z, z, z, z)
    }

    /// Outer product `a ⊗ b`.
    #[inline]
    pub fn outer(a: Vec2<F>, b: Vec2<F>) -> Self {
        Self::new(a.x * b.x, a.x * b.y, a.y * b.x, a.y * b.y)
    }

    #[inline]
    pub fn transpose(self) -> Self {
        Self::new(self.xx, self.yx, self.xy, self.yy)
    }

    #[inline]
    pub fn trace(self) -> F {
        self.xx + self.yy
    }

    /// Eigenvalues of a symmetric matrix, smaller first.
    ///
    /// Only the upper off-diagonal is read; callers keep their tensors
    /// symmetric.
    pub fn eigvals_symmetric(self) -> (F, F) {
        let half = fl::<F>(0.5);
        let mean = (self.xx + self.yy) * half;
        let d = (self.xx - self.yy) * half;
        let disc = (d * d + self.xy * self.xy).sqrt();
        (mean - disc, mean + disc)
    }
}

impl<F: Scalar> Add for Mat2<F> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.xx + rhs.xx,
            self.xy + rhs.xy,
            self.yx + rhs.yx,
            self.yy + rhs.yy,
        )
    }
}

impl<F: Scalar> Sub for Mat2<F> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.xx - rhs.xx,
            self.xy - rhs.xy,
            self.yx - rhs.yx,
            self.yy - rhs.yy,
        )
    }
}

impl<F: Scalar> Mul<F> for Mat2<F> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: F) -> Self {
        Self::new(self.xx * rhs, self.xy * rhs, self.yx * rhs, self.yy * rhs)
    }
}

impl<F: Scalar> AddAssign for Mat2<F> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.xx += rhs.xx;
        self.xy += rhs.xy;
        self.yx += rhs.yx;
        self.yy += rhs.yy;
    }
}

impl<F: Scalar> SubAssign for Mat2<F> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.xx -= rhs.xx;
        self.xy -= rhs.xy;
        self.yx -= rhs.yx;
        self.yy -= rhs.yy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turn() {
        let v: Vec2<f64> = Vec2::new(1.0, 0.0);
        let r = v.rotate(std::f64::consts::FRAC_PI_2);
        assert!((r.x).abs() < 1e-12);
        assert!((r.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric_eigenvalues() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3.
        let m: Mat2<f64> = Mat2::new(2.0, 1.0, 1.0, 2.0);
        let (lo, hi) = m.eigvals_symmetric();
        assert!((lo - 1.0).abs() < 1e-12);
        assert!((hi - 3.0).abs() < 1e-12);
    }

    #[test]
    fn eigenvalues_of_fracture_stress() {
        let m: Mat2<f64> = Mat2::new(-29955.396, -3428.008, -3428.008, -1942.0464);
        let (lo, hi) = m.eigvals_symmetric();
        assert!((lo - -30368.78).abs() < 0.1, "lo = {lo}");
        assert!((hi - -1528.66).abs() < 0.1, "hi = {hi}");
    }
}
