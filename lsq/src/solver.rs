//! Bounded Levenberg-Marquardt minimiser

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::{DMatrix, DVector};

use crate::{LinearSolverType, Problem, SolverOptions, Summary, TerminationType};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised for malformed calls to [`solve`].
///
/// Numerical trouble during the solve is not an error, it is reported through the
/// [`Summary`]'s termination type instead.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SolveError {
    #[error("Expected {0} parameter values but {1} were given")]
    ParamCountMismatch(usize, usize),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Minimise the problem's cost starting from `x`.
///
/// On return `x` holds the best point found, which always lies within the problem's bounds. The
/// initial value of `x` is projected into the bounds before the first iteration.
pub fn solve(
    options: &SolverOptions,
    problem: &Problem,
    x: &mut [f64],
) -> Result<Summary, SolveError> {
    if x.len() != problem.num_params() {
        return Err(SolveError::ParamCountMismatch(problem.num_params(), x.len()));
    }

    problem.project(x);

    let mut residuals = problem.residuals(x);
    let mut cost = 0.5 * residuals.norm_squared();

    let mut summary = Summary {
        termination: TerminationType::NoConvergence,
        message: String::from("Maximum number of iterations reached"),
        iterations: 0,
        successful_steps: 0,
        unsuccessful_steps: 0,
        initial_cost: cost,
        final_cost: cost,
        num_active_bounds: 0,
    };

    if !cost.is_finite() {
        summary.termination = TerminationType::Failure;
        summary.message = String::from("Cost at the initial point is not finite");
        return Ok(summary);
    }

    // Jacobian of the initial point, used to scale the damping
    let mut jac = problem.jacobian(x);
    let mut damping = options.initial_damping * max_normal_diagonal(&jac).max(std::f64::EPSILON);
    let mut damping_growth = 2.0;
    let mut jac_stale = false;

    loop {
        if jac_stale {
            jac = problem.jacobian(x);
            jac_stale = false;
        }

        let gradient = jac.tr_mul(&residuals);
        let free = free_params(problem, x, &gradient);

        summary.num_active_bounds = x.len() - free.len();

        // ---- CONVERGENCE ON THE PROJECTED GRADIENT ----

        let max_gradient = free
            .iter()
            .map(|&i| gradient[i].abs())
            .fold(0.0, f64::max);

        if max_gradient <= options.gradient_tolerance {
            summary.termination = TerminationType::Convergence;
            summary.message = format!(
                "Gradient tolerance reached, max |projected gradient| = {:e}",
                max_gradient
            );
            break;
        }

        if summary.iterations >= options.max_num_iterations {
            break;
        }
        summary.iterations += 1;

        // ---- STEP ----

        let step = match damped_step(&jac, &residuals, &free, damping, options.linear_solver_type) {
            Some(s) => s,
            None => {
                summary.termination = TerminationType::Failure;
                summary.message = String::from("Linear solver failed to compute a step");
                break;
            }
        };

        let mut candidate = x.to_vec();
        for (k, &i) in free.iter().enumerate() {
            candidate[i] += step[k];
        }
        problem.project(&mut candidate);

        let step_norm = candidate
            .iter()
            .zip(x.iter())
            .map(|(c, v)| (c - v).powi(2))
            .sum::<f64>()
            .sqrt();
        let x_norm = x.iter().map(|v| v.powi(2)).sum::<f64>().sqrt();

        if step_norm <= options.parameter_tolerance * (x_norm + options.parameter_tolerance) {
            summary.termination = TerminationType::Convergence;
            summary.message = format!("Parameter tolerance reached, |step| = {:e}", step_norm);
            break;
        }

        let candidate_residuals = problem.residuals(&candidate);
        let candidate_cost = 0.5 * candidate_residuals.norm_squared();

        if options.log_progress {
            trace!(
                "iter {:3}: cost {:e} -> {:e}, |step| {:e}, damping {:e}, free {}",
                summary.iterations,
                cost,
                candidate_cost,
                step_norm,
                damping,
                free.len()
            );
        }

        // ---- ACCEPT OR REJECT ----

        if candidate_cost.is_finite() && candidate_cost < cost {
            let relative_decrease = (cost - candidate_cost) / cost;

            x.copy_from_slice(&candidate);
            residuals = candidate_residuals;
            cost = candidate_cost;
            jac_stale = true;

            summary.successful_steps += 1;
            damping = (damping / 3.0).max(std::f64::MIN_POSITIVE);
            damping_growth = 2.0;

            if relative_decrease <= options.function_tolerance {
                summary.termination = TerminationType::Convergence;
                summary.message = format!(
                    "Function tolerance reached, relative decrease = {:e}",
                    relative_decrease
                );
                break;
            }
        } else {
            summary.unsuccessful_steps += 1;
            damping *= damping_growth;
            damping_growth *= 2.0;

            if damping > options.max_damping {
                summary.termination = TerminationType::Convergence;
                summary.message = String::from("No further decrease possible, maximum damping reached");
                break;
            }
        }
    }

    summary.final_cost = cost;

    Ok(summary)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Largest diagonal entry of `J^T J`.
fn max_normal_diagonal(jac: &DMatrix<f64>) -> f64 {
    (0..jac.ncols())
        .map(|c| jac.column(c).norm_squared())
        .fold(0.0, f64::max)
}

/// Indices of the parameters allowed to move this iteration.
///
/// A parameter on its lower bound with a positive gradient, or on its upper bound with a negative
/// gradient, would leave the box along the descent direction so is held fixed.
fn free_params(problem: &Problem, x: &[f64], gradient: &DVector<f64>) -> Vec<usize> {
    (0..x.len())
        .filter(|&i| {
            let at_lower = x[i] <= problem.lower_bound(i) && gradient[i] > 0.0;
            let at_upper = x[i] >= problem.upper_bound(i) && gradient[i] < 0.0;
            !(at_lower || at_upper)
        })
        .collect()
}

/// Solve `(J_f^T J_f + mu I) dx = -J_f^T r` for the free parameters.
fn damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    free: &[usize],
    damping: f64,
    linear_solver_type: LinearSolverType,
) -> Option<DVector<f64>> {
    let num_residuals = jac.nrows();
    let num_free = free.len();

    let jac_free = DMatrix::from_fn(num_residuals, num_free, |r, c| jac[(r, free[c])]);

    let step = match linear_solver_type {
        LinearSolverType::DenseQr => {
            // Augmented least squares problem [J; sqrt(mu) I] dx = [-r; 0]
            let mut aug = DMatrix::zeros(num_residuals + num_free, num_free);
            aug.slice_mut((0, 0), (num_residuals, num_free))
                .copy_from(&jac_free);
            let sqrt_damping = damping.sqrt();
            for c in 0..num_free {
                aug[(num_residuals + c, c)] = sqrt_damping;
            }

            let mut rhs = DVector::zeros(num_residuals + num_free);
            for r in 0..num_residuals {
                rhs[r] = -residuals[r];
            }

            let qr = aug.qr();
            let q = qr.q();
            let r = qr.r();
            let qt_rhs = q.tr_mul(&rhs);

            r.solve_upper_triangular(&qt_rhs)
        }
        LinearSolverType::DenseNormalCholesky => {
            let mut normal = jac_free.tr_mul(&jac_free);
            for c in 0..num_free {
                normal[(c, c)] += damping;
            }
            let rhs = -jac_free.tr_mul(residuals);

            normal.cholesky().map(|chol| chol.solve(&rhs))
        }
    };

    step.filter(|s| s.iter().all(|v| v.is_finite()))
}
