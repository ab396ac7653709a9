//! Allocation equation set
//!
//! Each controlled axis gives one linear residual in the thruster forces:
//!
//! ```text
//! r_axis(f) = (sum_i c_i * f_i) / d - target
//! ```
//!
//! where `c_i` is the coefficient of thruster `i` on that axis (1 for the linear axes, a signed
//! position component for the angular axes) and `d` is the mass or moment of inertia. Moments use
//! the single perpendicular position component of each contributing thruster (planar lever arm).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::{Params, ThrusterGeometry, NUM_AXES};
use comms_if::eqpt::{ThrustForces, ThrusterId, ThrusterRole};
use lsq::CostFunction;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The equation of motion of a single axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisEquation {
    pub axis: Axis,

    /// Thrusters contributing to this axis and their coefficients.
    pub terms: Vec<(ThrusterId, f64)>,

    /// Mass or moment of inertia the summed force or torque is divided by.
    pub divisor: f64,
}

/// The six axis equations of the vehicle, indexed by `Axis::index()`.
#[derive(Debug, Clone)]
pub struct EquationSet {
    equations: Vec<AxisEquation>,
}

/// Residual of one axis for a fixed target, in the form required by the solver.
///
/// The residual is registered against the parameter indices returned by `param_indices`, in that
/// order.
pub struct AxisResidual {
    weights: Vec<f64>,
    target: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    Surge,
    Sway,
    Heave,
    Roll,
    Pitch,
    Yaw,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Axis {
    /// Every axis, in command order.
    pub const ALL: [Axis; NUM_AXES] = [
        Axis::Surge,
        Axis::Sway,
        Axis::Heave,
        Axis::Roll,
        Axis::Pitch,
        Axis::Yaw,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Surge => "surge",
            Axis::Sway => "sway",
            Axis::Heave => "heave",
            Axis::Roll => "roll",
            Axis::Pitch => "pitch",
            Axis::Yaw => "yaw",
        }
    }
}

impl AxisEquation {
    /// Acceleration produced on this axis by the given forces (ordered as `ThrusterId::ALL`).
    pub fn achieved(&self, forces: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(id, c)| c * forces[id.index()])
            .sum::<f64>()
            / self.divisor
    }

    /// Solver parameter indices of the contributing thrusters.
    pub fn param_indices(&self) -> Vec<usize> {
        self.terms.iter().map(|(id, _)| id.index()).collect()
    }

    /// Build the solver residual of this axis for the given target.
    pub fn residual(&self, target: f64) -> AxisResidual {
        AxisResidual {
            weights: self.terms.iter().map(|(_, c)| c / self.divisor).collect(),
            target,
        }
    }
}

impl EquationSet {
    /// Build the equations of the vehicle from its parameters and thruster positions.
    pub fn new(params: &Params, geometry: &ThrusterGeometry) -> Self {
        let [ix, iy, iz] = params.inertia_kgm2;

        let unit = |_: ThrusterId| 1.0;
        let pos_x = |id: ThrusterId| geometry.position(id).x;
        let pos_y = |id: ThrusterId| geometry.position(id).y;
        let pos_z = |id: ThrusterId| geometry.position(id).z;

        let equations = vec![
            AxisEquation {
                axis: Axis::Surge,
                terms: role_terms(ThrusterRole::Surge, unit),
                divisor: params.mass_kg,
            },
            AxisEquation {
                axis: Axis::Sway,
                terms: role_terms(ThrusterRole::Sway, unit),
                divisor: params.mass_kg,
            },
            AxisEquation {
                axis: Axis::Heave,
                terms: role_terms(ThrusterRole::Heave, unit),
                divisor: params.mass_kg,
            },
            AxisEquation {
                axis: Axis::Roll,
                terms: [
                    role_terms(ThrusterRole::Heave, pos_y),
                    role_terms(ThrusterRole::Sway, pos_z),
                ]
                .concat(),
                divisor: ix,
            },
            AxisEquation {
                axis: Axis::Pitch,
                terms: [
                    role_terms(ThrusterRole::Surge, pos_z),
                    role_terms(ThrusterRole::Heave, pos_x),
                ]
                .concat(),
                divisor: iy,
            },
            AxisEquation {
                axis: Axis::Yaw,
                terms: [
                    role_terms(ThrusterRole::Surge, pos_y),
                    role_terms(ThrusterRole::Sway, pos_x),
                ]
                .concat(),
                divisor: iz,
            },
        ];

        Self { equations }
    }

    /// Iterate over the equations in axis order.
    pub fn iter(&self) -> impl Iterator<Item = &AxisEquation> {
        self.equations.iter()
    }

    pub fn equation(&self, axis: Axis) -> &AxisEquation {
        &self.equations[axis.index()]
    }

    /// Acceleration on each axis produced by the given forces.
    pub fn achieved(&self, forces: &ThrustForces) -> [f64; NUM_AXES] {
        let f = forces.to_array();
        let mut acc = [0f64; NUM_AXES];

        for eq in self.equations.iter() {
            acc[eq.axis.index()] = eq.achieved(&f);
        }

        acc
    }

    /// Achieved minus target acceleration on each axis.
    pub fn residuals(
        &self,
        forces: &ThrustForces,
        targets: &[f64; NUM_AXES],
    ) -> [f64; NUM_AXES] {
        let mut res = self.achieved(forces);

        for (r, t) in res.iter_mut().zip(targets.iter()) {
            *r -= t;
        }

        res
    }
}

impl CostFunction for AxisResidual {
    fn evaluate(&self, params: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(params.iter())
            .map(|(w, f)| w * f)
            .sum::<f64>()
            - self.target
    }

    fn gradient(&self, _params: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&self.weights);
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Coefficient of every thruster with the given role.
fn role_terms<F>(role: ThrusterRole, coeff: F) -> Vec<(ThrusterId, f64)>
where
    F: Fn(ThrusterId) -> f64,
{
    ThrusterId::with_role(role).map(|id| (id, coeff(id))).collect()
}
