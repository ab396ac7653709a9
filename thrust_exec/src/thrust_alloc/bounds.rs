//! Thruster force bounds

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::Params;
use comms_if::eqpt::{ThrustForces, ThrusterId, NUM_THRUSTERS};
use lsq::{Problem, ProblemError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance from a bound within which a force is reported as saturated.
///
/// Units: Newtons
const SATURATION_TOL_N: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Lower and upper force limit of every thruster, ordered as `ThrusterId::ALL`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceBounds {
    pub min_n: [f64; NUM_THRUSTERS],
    pub max_n: [f64; NUM_THRUSTERS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ForceBounds {
    pub fn from_params(params: &Params) -> Self {
        Self {
            min_n: params.force_min_n,
            max_n: params.force_max_n,
        }
    }

    /// Set the bounds as hard constraints on the force unknowns of the problem.
    ///
    /// Unknown `i` of the problem must be the force of `ThrusterId::ALL[i]`.
    pub fn apply(&self, problem: &mut Problem) -> Result<(), ProblemError> {
        for id in ThrusterId::ALL.iter() {
            let i = id.index();
            problem.set_bounds(i, self.min_n[i], self.max_n[i])?;
        }

        Ok(())
    }

    /// True if every force lies within its thruster's bounds.
    pub fn contains(&self, forces: &ThrustForces) -> bool {
        ThrusterId::ALL.iter().all(|id| {
            let f = forces.get(*id);
            f >= self.min_n[id.index()] && f <= self.max_n[id.index()]
        })
    }

    /// For each thruster, true if its force sits on one of its bounds.
    pub fn saturated(&self, forces: &ThrustForces) -> [bool; NUM_THRUSTERS] {
        let mut sat = [false; NUM_THRUSTERS];

        for id in ThrusterId::ALL.iter() {
            let i = id.index();
            let f = forces.get(*id);
            sat[i] = f <= self.min_n[i] + SATURATION_TOL_N || f >= self.max_n[i] - SATURATION_TOL_N;
        }

        sat
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply() {
        let mut params = Params::default();
        params.force_min_n[ThrusterId::SwayFwd.index()] = -5.0;
        params.force_max_n[ThrusterId::SwayFwd.index()] = 7.0;

        let bounds = ForceBounds::from_params(&params);
        let mut problem = Problem::new(NUM_THRUSTERS);
        bounds.apply(&mut problem).unwrap();

        for id in ThrusterId::ALL.iter() {
            let (lo, hi) = match id {
                ThrusterId::SwayFwd => (-5.0, 7.0),
                _ => (-18.0, 18.0),
            };
            assert_eq!(problem.lower_bound(id.index()), lo);
            assert_eq!(problem.upper_bound(id.index()), hi);
        }
    }

    #[test]
    fn test_apply_too_few_unknowns() {
        let bounds = ForceBounds::from_params(&Params::default());
        let mut problem = Problem::new(4);

        assert_eq!(
            bounds.apply(&mut problem),
            Err(ProblemError::ParamOutOfRange(4, 4))
        );
    }

    #[test]
    fn test_saturated() {
        let bounds = ForceBounds::from_params(&Params::default());

        let mut f = [0f64; NUM_THRUSTERS];
        f[ThrusterId::SurgePortHi.index()] = 18.0;
        f[ThrusterId::HeaveStbdFwd.index()] = -18.0;
        f[ThrusterId::SwayAft.index()] = 17.9;
        let forces = ThrustForces::from_array(&f);

        let sat = bounds.saturated(&forces);
        assert_eq!(sat.iter().filter(|s| **s).count(), 2);
        assert!(sat[ThrusterId::SurgePortHi.index()]);
        assert!(sat[ThrusterId::HeaveStbdFwd.index()]);
        assert!(bounds.contains(&forces));

        f[ThrusterId::SwayAft.index()] = 18.5;
        assert!(!bounds.contains(&ThrustForces::from_array(&f)));
    }
}
