//! # Bounded least squares solver
//!
//! Minimises `0.5 * sum(r_i(x)^2)` over a pool of real valued parameters `x`, where each residual
//! `r_i` is a differentiable scalar function of a subset of the parameters, subject to hard
//! per-parameter lower/upper bounds.
//!
//! The solver is a Levenberg-Marquardt method with an active set projection: every trial point is
//! projected back into the bounds, and parameters sitting on a bound with the gradient pointing
//! out of the feasible box are held fixed for the step. The returned point therefore always
//! satisfies the bounds, whether or not the solver converged.
//!
//! ```
//! use lsq::{CostFunction, Problem, SolverOptions};
//!
//! /// r = x0 + x1 - 3
//! struct Sum;
//!
//! impl CostFunction for Sum {
//!     fn evaluate(&self, params: &[f64]) -> f64 {
//!         params[0] + params[1] - 3.0
//!     }
//!
//!     fn gradient(&self, _params: &[f64], out: &mut [f64]) {
//!         out[0] = 1.0;
//!         out[1] = 1.0;
//!     }
//! }
//!
//! let mut problem = Problem::new(2);
//! problem.add_residual_block(Box::new(Sum), &[0, 1]).unwrap();
//! problem.set_bounds(0, -1.0, 1.0).unwrap();
//!
//! let mut x = [0.0, 0.0];
//! let summary = lsq::solve(&SolverOptions::default(), &problem, &mut x).unwrap();
//!
//! assert!(summary.is_converged());
//! assert!((x[0] - 1.0).abs() < 1e-9);
//! assert!((x[1] - 2.0).abs() < 1e-9);
//! ```

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod options;
mod problem;
mod solver;
mod summary;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use options::*;
pub use problem::*;
pub use solver::*;
pub use summary::*;
