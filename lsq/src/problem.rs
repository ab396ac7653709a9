//! Problem definition: residual blocks over a shared parameter pool, plus bounds

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A differentiable scalar residual function.
///
/// `params` holds the values of the parameters the block was registered with, in registration
/// order.
pub trait CostFunction {
    /// Evaluate the residual.
    fn evaluate(&self, params: &[f64]) -> f64;

    /// Write the partial derivative of the residual with respect to each parameter into `out`.
    ///
    /// `out` has the same length as `params`.
    fn gradient(&self, params: &[f64], out: &mut [f64]);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A bounded least squares problem.
pub struct Problem<'a> {
    num_params: usize,

    blocks: Vec<ResidualBlock<'a>>,

    lower: Vec<f64>,

    upper: Vec<f64>,
}

struct ResidualBlock<'a> {
    cost: Box<dyn CostFunction + 'a>,

    params: Vec<usize>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while building a [`Problem`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProblemError {
    #[error("Parameter index {0} is out of range, the problem has {1} parameters")]
    ParamOutOfRange(usize, usize),

    #[error("Parameter {0} appears more than once in the same residual block")]
    DuplicateParam(usize),

    #[error("A residual block must depend on at least one parameter")]
    EmptyBlock,

    #[error("Invalid bounds for parameter {0}: lower {1} is not less than or equal to upper {2}")]
    InvalidBounds(usize, f64, f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<'a> Problem<'a> {
    /// Create an empty, unbounded problem over `num_params` parameters.
    pub fn new(num_params: usize) -> Self {
        Self {
            num_params,
            blocks: Vec::new(),
            lower: vec![std::f64::NEG_INFINITY; num_params],
            upper: vec![std::f64::INFINITY; num_params],
        }
    }

    /// Add a residual depending on the parameters at the given indices.
    pub fn add_residual_block(
        &mut self,
        cost: Box<dyn CostFunction + 'a>,
        params: &[usize],
    ) -> Result<(), ProblemError> {
        if params.is_empty() {
            return Err(ProblemError::EmptyBlock);
        }

        for (i, &p) in params.iter().enumerate() {
            if p >= self.num_params {
                return Err(ProblemError::ParamOutOfRange(p, self.num_params));
            }
            if params[..i].contains(&p) {
                return Err(ProblemError::DuplicateParam(p));
            }
        }

        self.blocks.push(ResidualBlock {
            cost,
            params: params.to_vec(),
        });

        Ok(())
    }

    /// Set both bounds of a parameter.
    ///
    /// Infinite bounds are allowed, NaN bounds are not.
    pub fn set_bounds(&mut self, param: usize, lower: f64, upper: f64) -> Result<(), ProblemError> {
        if param >= self.num_params {
            return Err(ProblemError::ParamOutOfRange(param, self.num_params));
        }
        // Written so that NaN bounds also fail
        if !(lower <= upper) {
            return Err(ProblemError::InvalidBounds(param, lower, upper));
        }

        self.lower[param] = lower;
        self.upper[param] = upper;

        Ok(())
    }

    pub fn num_params(&self) -> usize {
        self.num_params
    }

    pub fn num_residuals(&self) -> usize {
        self.blocks.len()
    }

    pub fn lower_bound(&self, param: usize) -> f64 {
        self.lower[param]
    }

    pub fn upper_bound(&self, param: usize) -> f64 {
        self.upper[param]
    }

    /// Clamp every parameter into its bounds.
    pub(crate) fn project(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate() {
            if *v < self.lower[i] {
                *v = self.lower[i];
            }
            if *v > self.upper[i] {
                *v = self.upper[i];
            }
        }
    }

    /// Evaluate every residual at `x`.
    pub fn residuals(&self, x: &[f64]) -> DVector<f64> {
        let mut local = Vec::new();

        DVector::from_iterator(
            self.blocks.len(),
            self.blocks.iter().map(|b| {
                b.gather(x, &mut local);
                b.cost.evaluate(&local)
            }),
        )
    }

    /// Half the sum of squared residuals at `x`.
    pub fn cost(&self, x: &[f64]) -> f64 {
        0.5 * self.residuals(x).norm_squared()
    }

    /// Evaluate the dense Jacobian (one row per residual, one column per parameter) at `x`.
    pub fn jacobian(&self, x: &[f64]) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(self.blocks.len(), self.num_params);
        let mut local = Vec::new();
        let mut grad = Vec::new();

        for (row, block) in self.blocks.iter().enumerate() {
            block.gather(x, &mut local);
            grad.clear();
            grad.resize(local.len(), 0.0);

            block.cost.gradient(&local, &mut grad);

            for (&p, &g) in block.params.iter().zip(grad.iter()) {
                jac[(row, p)] = g;
            }
        }

        jac
    }
}

impl<'a> ResidualBlock<'a> {
    /// Copy this block's parameter values out of the shared pool.
    fn gather(&self, x: &[f64], local: &mut Vec<f64>) {
        local.clear();
        local.extend(self.params.iter().map(|&p| x[p]));
    }
}
