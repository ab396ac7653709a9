//! # Thruster Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of thrusters on the vehicle.
pub const NUM_THRUSTERS: usize = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Force demanded from each thruster.
///
/// Units: Newtons
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ThrustForces {
    pub surge_stbd_hi: f64,
    pub surge_port_hi: f64,
    pub surge_port_lo: f64,
    pub surge_stbd_lo: f64,
    pub sway_fwd: f64,
    pub sway_aft: f64,
    pub heave_port_aft: f64,
    pub heave_stbd_aft: f64,
    pub heave_stbd_fwd: f64,
    pub heave_port_fwd: f64,
}

/// Summary of the solve which produced a set of thruster forces.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AllocStatus {
    /// True if the solver reported convergence.
    pub converged: bool,

    /// How the solve terminated.
    pub termination: SolveTermination,

    /// Number of solver iterations performed.
    pub iterations: usize,

    /// Half the sum of squared acceleration residuals at the solution.
    pub final_cost: f64,
}

/// Timestamped thruster forces published once per allocation cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ThrustStamped {
    pub stamp: DateTime<Utc>,

    pub force: ThrustForces,

    pub status: AllocStatus,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all thrusters on the vehicle.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ThrusterId {
    SurgeStbdHi,
    SurgePortHi,
    SurgePortLo,
    SurgeStbdLo,
    SwayFwd,
    SwayAft,
    HeavePortAft,
    HeaveStbdAft,
    HeaveStbdFwd,
    HeavePortFwd,
}

/// The axis a thruster is mounted to push along.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum ThrusterRole {
    Surge,
    Sway,
    Heave,
}

/// How the solver finished.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum SolveTermination {
    /// One of the convergence tolerances was met.
    Convergence,

    /// The iteration limit was reached first.
    NoConvergence,

    /// The solver could not make progress, for example due to a numerical failure.
    Failure,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ThrusterId {
    /// Every thruster, in the order used for arrays of per-thruster values.
    pub const ALL: [ThrusterId; NUM_THRUSTERS] = [
        ThrusterId::SurgeStbdHi,
        ThrusterId::SurgePortHi,
        ThrusterId::SurgePortLo,
        ThrusterId::SurgeStbdLo,
        ThrusterId::SwayFwd,
        ThrusterId::SwayAft,
        ThrusterId::HeavePortAft,
        ThrusterId::HeaveStbdAft,
        ThrusterId::HeaveStbdFwd,
        ThrusterId::HeavePortFwd,
    ];

    /// Position of this thruster in `ThrusterId::ALL` and in per-thruster arrays.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThrusterId::SurgeStbdHi => "surge_stbd_hi",
            ThrusterId::SurgePortHi => "surge_port_hi",
            ThrusterId::SurgePortLo => "surge_port_lo",
            ThrusterId::SurgeStbdLo => "surge_stbd_lo",
            ThrusterId::SwayFwd => "sway_fwd",
            ThrusterId::SwayAft => "sway_aft",
            ThrusterId::HeavePortAft => "heave_port_aft",
            ThrusterId::HeaveStbdAft => "heave_stbd_aft",
            ThrusterId::HeaveStbdFwd => "heave_stbd_fwd",
            ThrusterId::HeavePortFwd => "heave_port_fwd",
        }
    }

    /// Name of the coordinate frame attached to this thruster.
    pub fn frame_name(&self) -> String {
        format!("{}_thruster", self.name())
    }

    pub fn role(&self) -> ThrusterRole {
        match self {
            ThrusterId::SurgeStbdHi
            | ThrusterId::SurgePortHi
            | ThrusterId::SurgePortLo
            | ThrusterId::SurgeStbdLo => ThrusterRole::Surge,
            ThrusterId::SwayFwd | ThrusterId::SwayAft => ThrusterRole::Sway,
            ThrusterId::HeavePortAft
            | ThrusterId::HeaveStbdAft
            | ThrusterId::HeaveStbdFwd
            | ThrusterId::HeavePortFwd => ThrusterRole::Heave,
        }
    }

    /// Iterate over the thrusters with the given role.
    pub fn with_role(role: ThrusterRole) -> impl Iterator<Item = ThrusterId> {
        Self::ALL.iter().copied().filter(move |id| id.role() == role)
    }
}

impl std::fmt::Display for ThrusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ThrustForces {
    /// Build from an array ordered as `ThrusterId::ALL`.
    pub fn from_array(forces: &[f64; NUM_THRUSTERS]) -> Self {
        Self {
            surge_stbd_hi: forces[ThrusterId::SurgeStbdHi.index()],
            surge_port_hi: forces[ThrusterId::SurgePortHi.index()],
            surge_port_lo: forces[ThrusterId::SurgePortLo.index()],
            surge_stbd_lo: forces[ThrusterId::SurgeStbdLo.index()],
            sway_fwd: forces[ThrusterId::SwayFwd.index()],
            sway_aft: forces[ThrusterId::SwayAft.index()],
            heave_port_aft: forces[ThrusterId::HeavePortAft.index()],
            heave_stbd_aft: forces[ThrusterId::HeaveStbdAft.index()],
            heave_stbd_fwd: forces[ThrusterId::HeaveStbdFwd.index()],
            heave_port_fwd: forces[ThrusterId::HeavePortFwd.index()],
        }
    }

    /// Return an array ordered as `ThrusterId::ALL`.
    pub fn to_array(&self) -> [f64; NUM_THRUSTERS] {
        let mut forces = [0f64; NUM_THRUSTERS];
        for id in ThrusterId::ALL.iter() {
            forces[id.index()] = self.get(*id);
        }
        forces
    }

    pub fn get(&self, id: ThrusterId) -> f64 {
        match id {
            ThrusterId::SurgeStbdHi => self.surge_stbd_hi,
            ThrusterId::SurgePortHi => self.surge_port_hi,
            ThrusterId::SurgePortLo => self.surge_port_lo,
            ThrusterId::SurgeStbdLo => self.surge_stbd_lo,
            ThrusterId::SwayFwd => self.sway_fwd,
            ThrusterId::SwayAft => self.sway_aft,
            ThrusterId::HeavePortAft => self.heave_port_aft,
            ThrusterId::HeaveStbdAft => self.heave_stbd_aft,
            ThrusterId::HeaveStbdFwd => self.heave_stbd_fwd,
            ThrusterId::HeavePortFwd => self.heave_port_fwd,
        }
    }
}

impl SolveTermination {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolveTermination::Convergence)
    }
}
