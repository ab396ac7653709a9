//! Parameters structure for ThrustAlloc

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::{ThrusterId, NUM_THRUSTERS};
use lsq::SolverOptions;
use serde::{Deserialize, Serialize};

use super::ThrustAllocError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for thrust allocation.
///
/// One parameter file exists per vehicle variant. Per-thruster arrays are
/// ordered as `ThrusterId::ALL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- VEHICLE ----
    /// Mass of the vehicle.
    ///
    /// Units: kilograms
    pub mass_kg: f64,

    /// Principal moments of inertia about the body x, y and z axes.
    ///
    /// Units: kilogram meters squared
    pub inertia_kgm2: [f64; 3],

    // ---- CAPABILITIES ----
    /// Minimum force each thruster can produce (most negative value).
    ///
    /// Units: Newtons
    pub force_min_n: [f64; NUM_THRUSTERS],

    /// Maximum force each thruster can produce.
    ///
    /// Units: Newtons
    pub force_max_n: [f64; NUM_THRUSTERS],

    // ---- COMMAND LIMITS ----
    /// If set, each linear command component is clamped to +/- this value.
    ///
    /// Units: meters/second^2
    #[serde(default)]
    pub max_linear_accel_ms2: Option<f64>,

    /// If set, each angular command component is clamped to +/- this value.
    ///
    /// Units: radians/second^2
    #[serde(default)]
    pub max_angular_accel_rads2: Option<f64>,

    // ---- SOLVER ----
    /// Options passed to the least squares solver on every cycle.
    #[serde(default)]
    pub solver: SolverOptions,

    // ---- OBSERVABILITY ----
    /// Log the initial guess, solved forces and convergence summary of
    /// every cycle at debug level.
    #[serde(default)]
    pub log_cycle_report: bool,

    /// Log the solver's full report of every cycle at debug level.
    #[serde(default)]
    pub log_full_report: bool,

    /// Trace every solver iteration. Equivalent to setting `solver.log_progress`.
    #[serde(default)]
    pub log_solver_progress: bool,

    /// Write a CSV record of every cycle into the session archive.
    #[serde(default)]
    pub archive_reports: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Reference vehicle parameters.
    fn default() -> Self {
        Self {
            mass_kg: 48.8428,
            inertia_kgm2: [0.55649783, 1.89075467, 1.96057706],
            force_min_n: [-18.0; NUM_THRUSTERS],
            force_max_n: [18.0; NUM_THRUSTERS],
            max_linear_accel_ms2: None,
            max_angular_accel_rads2: None,
            solver: SolverOptions::default(),
            log_cycle_report: false,
            log_full_report: false,
            log_solver_progress: false,
            archive_reports: false,
        }
    }
}

impl Params {
    /// Check the parameters describe a physically meaningful vehicle.
    pub fn validate(&self) -> Result<(), ThrustAllocError> {
        if !(self.mass_kg.is_finite() && self.mass_kg > 0.0) {
            return Err(ThrustAllocError::InvalidParams(format!(
                "mass must be finite and positive, found {}",
                self.mass_kg
            )));
        }

        for (axis, i) in ["x", "y", "z"].iter().zip(self.inertia_kgm2.iter()) {
            if !(i.is_finite() && *i > 0.0) {
                return Err(ThrustAllocError::InvalidParams(format!(
                    "inertia about {} must be finite and positive, found {}",
                    axis, i
                )));
            }
        }

        for id in ThrusterId::ALL.iter() {
            let (min, max) = (self.force_min_n[id.index()], self.force_max_n[id.index()]);
            if !(min.is_finite() && max.is_finite() && min <= max) {
                return Err(ThrustAllocError::InvalidParams(format!(
                    "force bounds of {} must be finite with min <= max, found [{}, {}]",
                    id, min, max
                )));
            }
        }

        for (name, limit) in [
            ("max_linear_accel_ms2", self.max_linear_accel_ms2),
            ("max_angular_accel_rads2", self.max_angular_accel_rads2),
        ]
        .iter()
        {
            if let Some(l) = limit {
                if !(l.is_finite() && *l >= 0.0) {
                    return Err(ThrustAllocError::InvalidParams(format!(
                        "{} must be finite and non-negative, found {}",
                        name, l
                    )));
                }
            }
        }

        Ok(())
    }

    /// Solver options to use for each cycle, with progress logging enabled if requested here.
    pub fn solver_options(&self) -> SolverOptions {
        let mut opts = self.solver.clone();
        opts.log_progress |= self.log_solver_progress;
        opts
    }
}
