//! SO(2) - planar rotations and their angle derivatives
//!
//! This module implements the rotation family used by the forward-kinematics chain:
//! a rotation `R(θ)` embedded in a 3×3 homogeneous block together with its exact
//! first and second derivatives with respect to the angle.
//!
//! ```text
//!        | c  -s  0 |          | -s  -c  0 |           | -c   s  0 |
//! R(θ) = | s   c  0 |  R'(θ) = |  c  -s  0 |   R''(θ) = | -s  -c  0 |
//!        | 0   0  1 |          |  0   0  0 |           |  0   0  0 |
//! ```
//!
//! SO(2) elements are represented using nalgebra's UnitComplex internally.

use nalgebra::{Matrix3, UnitComplex, Vector2};

/// Which angle derivative of the rotation block to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivative {
    /// R(θ)
    Zeroth,
    /// dR/dθ
    First,
    /// d²R/dθ²
    Second,
}

impl Derivative {
    /// Order of a joint that appears `count` times in a mixed partial derivative.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Derivative::Zeroth,
            1 => Derivative::First,
            _ => Derivative::Second,
        }
    }
}

/// SO(2) group element representing rotations in 2D.
#[derive(Debug, Clone, PartialEq)]
pub struct SO2 {
    /// Internal representation as a unit complex number
    complex: UnitComplex<f64>,
}

impl SO2 {
    /// Create SO(2) from an angle in radians.
    pub fn from_angle(angle: f64) -> Self {
        SO2 {
            complex: UnitComplex::from_angle(angle),
        }
    }

    /// Homogeneous 3×3 rotation block, R(θ).
    pub fn homogeneous(&self) -> Matrix3<f64> {
        self.homogeneous_derivative(Derivative::Zeroth)
    }

    /// Homogeneous 3×3 block of the requested angle derivative.
    ///
    /// The homogeneous corner is 1 for the rotation itself and 0 for both
    /// derivatives, since the constant part vanishes under differentiation.
    pub fn homogeneous_derivative(&self, order: Derivative) -> Matrix3<f64> {
        let (s, c) = (self.complex.im, self.complex.re);
        match order {
            Derivative::Zeroth => Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0),
            Derivative::First => Matrix3::new(-s, -c, 0.0, c, -s, 0.0, 0.0, 0.0, 0.0),
            Derivative::Second => Matrix3::new(-c, s, 0.0, -s, -c, 0.0, 0.0, 0.0, 0.0),
        }
    }
}

/// Homogeneous 3×3 translation by `offset`.
pub fn translation(offset: &Vector2<f64>) -> Matrix3<f64> {
    Matrix3::new(1.0, 0.0, offset.x, 0.0, 1.0, offset.y, 0.0, 0.0, 1.0)
}
