//! Inverse-kinematics cost of a planar link chain.
//!
//! # Mathematical Formulation
//!
//! For the angles `x` of links `0..=end` and the end-effector position `p(x)`:
//!
//! ```text
//! f(x) = ½·w·‖p(x) − t‖² + ½·xᵀ·W·x
//! ∇f   = w·p'ᵀ(p − t) + W·x
//! ∇²f  = w·(p'ᵀp' + [(p − t)·p''ᵢⱼ]) + W
//! ```
//!
//! with target `t`, target weight `w` and the diagonal regularization `W` pulling
//! every joint back towards its rest angle.
//!
//! Evaluating at `x` writes `x` into the bound chain before anything is computed,
//! so after a solve the chain holds the pose of the last evaluated iterate.

use super::Objective;
use crate::core::{CoreError, CoreResult, Link, LinkChain};
use crate::kinematics;
use nalgebra::{DMatrix, DVector, Vector2};

/// IK objective bound to a chain, an end link and a target point.
///
/// The objective holds the only mutable borrow of the chain for its lifetime.
/// Use [`LinkObjective::chain`] to read back the evaluated pose.
///
/// # Example
///
/// ```
/// use chain_ik::core::LinkChain;
/// use chain_ik::objectives::{LinkObjective, Objective};
/// use nalgebra::{Vector2, dvector};
///
/// let mut chain = LinkChain::serial(2, 1.0);
/// let mut objective = LinkObjective::new(
///     &mut chain,
///     1,
///     Vector2::new(1.0, 1.0),
///     1e3,
///     dvector![1.0, 1.0],
/// )?;
/// let cost = objective.evaluate(&dvector![0.0, 0.5]);
/// assert!(cost > 0.0);
/// assert_eq!(objective.chain().angle(1)?, 0.5);
/// # Ok::<(), chain_ik::core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct LinkObjective<'a> {
    chain: &'a mut LinkChain,
    end: usize,
    target: Vector2<f64>,
    target_weight: f64,
    regularization: DVector<f64>,
}

impl<'a> LinkObjective<'a> {
    /// Bind an objective to links `0..=end` of `chain`.
    ///
    /// `regularization` holds the diagonal of `W` and must have `end + 1` entries.
    pub fn new(
        chain: &'a mut LinkChain,
        end: usize,
        target: Vector2<f64>,
        target_weight: f64,
        regularization: DVector<f64>,
    ) -> CoreResult<Self> {
        if chain.is_empty() {
            return Err(CoreError::EmptyChain.log());
        }
        chain.link(end).map_err(|e| e.log())?;
        if regularization.len() != end + 1 {
            return Err(CoreError::DimensionMismatch(format!(
                "{} regularization weights for {} angles",
                regularization.len(),
                end + 1
            ))
            .log());
        }
        if !target_weight.is_finite() || target_weight < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "target weight must be finite and non-negative, got {target_weight}"
            ))
            .log());
        }
        Ok(Self {
            chain,
            end,
            target,
            target_weight,
            regularization,
        })
    }

    /// The chain in its last evaluated pose.
    pub fn chain(&self) -> &LinkChain {
        self.chain
    }

    pub fn target(&self) -> Vector2<f64> {
        self.target
    }

    /// Current end-effector position.
    pub fn end_effector(&self) -> Vector2<f64> {
        kinematics::position_of(self.links())
    }

    fn links(&self) -> &[Link] {
        // `end` was validated against the chain, whose length cannot change while
        // it is borrowed here.
        &self.chain.links()[..=self.end]
    }

    /// Write `x` into the chain, back to front.
    fn load(&mut self, x: &DVector<f64>) -> CoreResult<()> {
        let n = self.dimension();
        if x.len() != n {
            return Err(CoreError::DimensionMismatch(format!(
                "{} angles for an objective over {n} links",
                x.len()
            )));
        }
        self.chain.set_angles(x)
    }

    fn regularization_cost(&self, x: &DVector<f64>) -> f64 {
        0.5 * x
            .iter()
            .zip(self.regularization.iter())
            .map(|(xi, wi)| wi * xi * xi)
            .sum::<f64>()
    }

    fn cost(&self, x: &DVector<f64>, residual: &Vector2<f64>) -> f64 {
        0.5 * self.target_weight * residual.norm_squared() + self.regularization_cost(x)
    }

    /// Fallible form of [`Objective::evaluate`].
    pub fn try_evaluate(&mut self, x: &DVector<f64>) -> CoreResult<f64> {
        self.load(x)?;
        let residual = self.end_effector() - self.target;
        Ok(self.cost(x, &residual))
    }

    /// Fallible form of [`Objective::evaluate_gradient`].
    pub fn try_evaluate_gradient(
        &mut self,
        x: &DVector<f64>,
        gradient: &mut DVector<f64>,
    ) -> CoreResult<f64> {
        self.load(x)?;
        let links = self.links();
        let residual = kinematics::position_of(links) - self.target;
        let jacobian = kinematics::jacobian_of(links);

        *gradient = self.target_weight * jacobian.tr_mul(&residual)
            + self.regularization.component_mul(x);
        Ok(self.cost(x, &residual))
    }

    /// Fallible form of [`Objective::evaluate_hessian`].
    pub fn try_evaluate_hessian(
        &mut self,
        x: &DVector<f64>,
        gradient: &mut DVector<f64>,
        hessian: &mut DMatrix<f64>,
    ) -> CoreResult<f64> {
        self.load(x)?;
        let links = self.links();
        let residual = kinematics::position_of(links) - self.target;
        let jacobian = kinematics::jacobian_of(links);
        let tensor = kinematics::second_derivatives_of(links);
        let w = self.target_weight;

        *gradient = w * jacobian.tr_mul(&residual) + self.regularization.component_mul(x);
        *hessian = if links.len() == 1 {
            // A single angle: p' and p'' are plain 2-vectors.
            let (j, t) = (jacobian.column(0), tensor.column(0));
            let scalar = w * (j.dot(&j) + residual.x * t[0] + residual.y * t[1])
                + self.regularization[0];
            DMatrix::from_element(1, 1, scalar)
        } else {
            let curvature = kinematics::contract_second_derivatives(&residual, &tensor);
            w * (jacobian.tr_mul(&jacobian) + curvature)
                + DMatrix::from_diagonal(&self.regularization)
        };
        Ok(self.cost(x, &residual))
    }
}

impl Objective for LinkObjective<'_> {
    fn dimension(&self) -> usize {
        self.end + 1
    }

    /// A parameter vector of the wrong length is logged and yields NaN, which the
    /// optimizers report as invalid numerical values.
    fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
        self.try_evaluate(x)
            .map_err(|e| e.log())
            .unwrap_or(f64::NAN)
    }

    fn evaluate_gradient(&mut self, x: &DVector<f64>, gradient: &mut DVector<f64>) -> f64 {
        self.try_evaluate_gradient(x, gradient)
            .map_err(|e| e.log())
            .unwrap_or(f64::NAN)
    }

    fn evaluate_hessian(
        &mut self,
        x: &DVector<f64>,
        gradient: &mut DVector<f64>,
        hessian: &mut DMatrix<f64>,
    ) -> f64 {
        self.try_evaluate_hessian(x, gradient, hessian)
            .map_err(|e| e.log())
            .unwrap_or(f64::NAN)
    }
}
