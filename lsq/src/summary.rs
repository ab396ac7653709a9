//! Solve summary

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use std::fmt;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Summary of a call to [`crate::solve`].
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// How the solver terminated.
    pub termination: TerminationType,

    /// Human readable reason for termination.
    pub message: String,

    /// Number of iterations performed, successful or not.
    pub iterations: usize,

    /// Number of steps which decreased the cost and were accepted.
    pub successful_steps: usize,

    /// Number of steps which were rejected.
    pub unsuccessful_steps: usize,

    /// Cost at the (projected) initial point.
    pub initial_cost: f64,

    /// Cost at the returned point.
    pub final_cost: f64,

    /// Number of parameters held on a bound at the returned point.
    pub num_active_bounds: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reason the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationType {
    /// One of the function, gradient or parameter tolerances was met.
    Convergence,

    /// The iteration limit was reached before convergence.
    NoConvergence,

    /// The solver could not continue (non-finite cost or a failed linear solve). The returned
    /// point is the last accepted one.
    Failure,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Summary {
    pub fn is_converged(&self) -> bool {
        self.termination == TerminationType::Convergence
    }

    /// True if the returned point is at least as good as the initial one.
    pub fn is_solution_usable(&self) -> bool {
        matches!(
            self.termination,
            TerminationType::Convergence | TerminationType::NoConvergence
        )
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solver Summary")?;
        writeln!(f, "    Initial cost:        {:e}", self.initial_cost)?;
        writeln!(f, "    Final cost:          {:e}", self.final_cost)?;
        writeln!(f, "    Change:              {:e}", self.initial_cost - self.final_cost)?;
        writeln!(f, "    Iterations:          {}", self.iterations)?;
        writeln!(f, "    Successful steps:    {}", self.successful_steps)?;
        writeln!(f, "    Unsuccessful steps:  {}", self.unsuccessful_steps)?;
        writeln!(f, "    Active bounds:       {}", self.num_active_bounds)?;
        write!(f, "    Termination:         {:?} ({})", self.termination, self.message)
    }
}
