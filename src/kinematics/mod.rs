//! Forward kinematics of planar link chains and its analytical derivatives.
//!
//! Every link contributes the homogeneous transform `T(offset)·R(θ)`. The end
//! effector, the point `(1, 0)` in the frame of the deepest link, is mapped to the
//! world by the product of all transforms from the root down:
//!
//! ```text
//! p(θ) = T₀R(θ₀) · T₁R(θ₁) · … · Tₙ₋₁R(θₙ₋₁) · (1, 0, 1)ᵀ
//! ```
//!
//! Derivatives substitute the derivative blocks of [`so2::SO2`] for the links being
//! differentiated and keep the plain rotation everywhere else:
//!
//! - `∂p/∂θᵢ`: `R'` at depth `i`
//! - `∂²p/∂θᵢ²`: `R''` at depth `i`
//! - `∂²p/∂θᵢ∂θⱼ`: `R'` at depths `i` and `j`
//!
//! All functions work on the links `0..=end` of a chain; deeper links are ignored.

pub mod so2;

pub use so2::{Derivative, SO2};

use crate::core::{CoreError, CoreResult, Link, LinkChain};
use nalgebra::{DMatrix, Matrix3, Vector2, Vector3};

/// End effector in the frame of the deepest link, in homogeneous coordinates.
pub fn end_effector_point() -> Vector3<f64> {
    Vector3::new(1.0, 0.0, 1.0)
}

/// Per-link transforms `T·R`, `T·R'` and `T·R''`, computed once per evaluation.
struct LinkBlocks {
    blocks: Vec<[Matrix3<f64>; 3]>,
}

impl LinkBlocks {
    fn new(links: &[Link]) -> Self {
        let blocks = links
            .iter()
            .map(|link| {
                let t = so2::translation(&link.position());
                let r = SO2::from_angle(link.angle());
                [
                    t * r.homogeneous(),
                    t * r.homogeneous_derivative(Derivative::First),
                    t * r.homogeneous_derivative(Derivative::Second),
                ]
            })
            .collect();
        Self { blocks }
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Map the end effector through the chain, differentiating link `d` as
    /// often as `order_of(d)` says.
    fn apply(&self, order_of: impl Fn(usize) -> Derivative) -> Vector2<f64> {
        let product = self
            .blocks
            .iter()
            .enumerate()
            .fold(Matrix3::identity(), |acc, (depth, block)| {
                let index = match order_of(depth) {
                    Derivative::Zeroth => 0,
                    Derivative::First => 1,
                    Derivative::Second => 2,
                };
                acc * block[index]
            });
        (product * end_effector_point()).xy()
    }
}

fn segment(chain: &LinkChain, end: usize) -> CoreResult<&[Link]> {
    chain
        .links()
        .get(..=end)
        .ok_or(CoreError::LinkOutOfRange {
            depth: end,
            len: chain.len(),
        })
}

/// End-effector position for a root-first slice of links.
pub fn position_of(links: &[Link]) -> Vector2<f64> {
    LinkBlocks::new(links).apply(|_| Derivative::Zeroth)
}

/// Jacobian `p'` (2×n) for a root-first slice of links.
///
/// Column `i` holds `∂p/∂θᵢ`.
pub fn jacobian_of(links: &[Link]) -> DMatrix<f64> {
    let blocks = LinkBlocks::new(links);
    let n = blocks.len();
    let mut jacobian = DMatrix::zeros(2, n);
    for i in 0..n {
        let column = blocks.apply(|depth| Derivative::from_count(usize::from(depth == i)));
        jacobian[(0, i)] = column.x;
        jacobian[(1, i)] = column.y;
    }
    jacobian
}

/// Second-derivative tensor `p''` for a root-first slice of links.
///
/// The result is stacked as a `2n × n` matrix: rows `2i` and `2i + 1` of column `j`
/// hold `∂²p/∂θᵢ∂θⱼ`.
pub fn second_derivatives_of(links: &[Link]) -> DMatrix<f64> {
    let blocks = LinkBlocks::new(links);
    let n = blocks.len();
    let mut tensor = DMatrix::zeros(2 * n, n);
    for i in 0..n {
        for j in i..n {
            let entry = blocks.apply(|depth| {
                Derivative::from_count(usize::from(depth == i) + usize::from(depth == j))
            });
            tensor[(2 * i, j)] = entry.x;
            tensor[(2 * i + 1, j)] = entry.y;
            // Mixed partials commute.
            tensor[(2 * j, i)] = entry.x;
            tensor[(2 * j + 1, i)] = entry.y;
        }
    }
    tensor
}

/// Contract the second-derivative tensor with a 2D vector.
///
/// Entry `(i, j)` of the `n × n` result is `v · ∂²p/∂θᵢ∂θⱼ`.
pub fn contract_second_derivatives(v: &Vector2<f64>, tensor: &DMatrix<f64>) -> DMatrix<f64> {
    let n = tensor.ncols();
    DMatrix::from_fn(n, n, |i, j| {
        v.x * tensor[(2 * i, j)] + v.y * tensor[(2 * i + 1, j)]
    })
}

/// World position of the end effector attached to link `end`.
pub fn forward_kinematics(chain: &LinkChain, end: usize) -> CoreResult<Vector2<f64>> {
    Ok(position_of(segment(chain, end)?))
}

/// Jacobian of the end effector attached to link `end` w.r.t. angles `0..=end`.
pub fn jacobian(chain: &LinkChain, end: usize) -> CoreResult<DMatrix<f64>> {
    Ok(jacobian_of(segment(chain, end)?))
}

/// Stacked second derivatives of the end effector attached to link `end`.
pub fn second_derivatives(chain: &LinkChain, end: usize) -> CoreResult<DMatrix<f64>> {
    Ok(second_derivatives_of(segment(chain, end)?))
}
