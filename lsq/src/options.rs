//! Solver options

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Options controlling a single call to [`crate::solve`].
///
/// All fields have defaults so parameter files need only specify the values they change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Maximum number of iterations (accepted or rejected steps) before giving up.
    pub max_num_iterations: usize,

    /// Strategy used to solve the damped linear system at each iteration.
    pub linear_solver_type: LinearSolverType,

    /// Converge when the relative decrease in cost of an accepted step falls below this value.
    pub function_tolerance: f64,

    /// Converge when the largest component of the projected gradient falls below this value.
    pub gradient_tolerance: f64,

    /// Converge when the step length falls below `parameter_tolerance * (|x| + parameter_tolerance)`.
    pub parameter_tolerance: f64,

    /// Initial damping, relative to the largest diagonal entry of `J^T J`.
    pub initial_damping: f64,

    /// Damping above which the solver stops trying to make progress.
    pub max_damping: f64,

    /// Emit a `trace` log line for every iteration.
    pub log_progress: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Linear solver used for the damped Gauss-Newton step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearSolverType {
    /// QR decomposition of the augmented Jacobian `[J; sqrt(mu) I]`.
    DenseQr,

    /// Cholesky decomposition of the normal equations `J^T J + mu I`.
    DenseNormalCholesky,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_num_iterations: 100,
            linear_solver_type: LinearSolverType::DenseQr,
            function_tolerance: 1e-6,
            gradient_tolerance: 1e-10,
            parameter_tolerance: 1e-8,
            initial_damping: 1e-4,
            max_damping: 1e32,
            log_progress: false,
        }
    }
}

impl Default for LinearSolverType {
    fn default() -> Self {
        LinearSolverType::DenseQr
    }
}
