//! Thruster geometry table

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector3;
use std::time::Duration;

// Internal
use crate::frame_client::{FrameLookupError, FrameSource};
use comms_if::eqpt::{ThrusterId, NUM_THRUSTERS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Position of every thruster relative to the vehicle's centre of mass.
///
/// Built once at startup and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrusterGeometry {
    positions_m: [Vector3<f64>; NUM_THRUSTERS],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Could not find the position of the {0} thruster: {1}")]
    LookupFailed(ThrusterId, FrameLookupError),

    #[error("The position of the {0} thruster is not finite: {1:?}")]
    NonFinitePosition(ThrusterId, Vector3<f64>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ThrusterGeometry {
    /// Look up the position of every thruster's frame relative to `base_frame`.
    ///
    /// Each lookup may wait up to `timeout` for the frame to become available. The first failure
    /// aborts the whole table.
    pub fn from_source(
        source: &mut dyn FrameSource,
        base_frame: &str,
        timeout: Duration,
    ) -> Result<Self, GeometryError> {
        let mut positions_m = [Vector3::zeros(); NUM_THRUSTERS];

        for id in ThrusterId::ALL.iter() {
            let pos = source
                .lookup(base_frame, &id.frame_name(), timeout)
                .map_err(|e| GeometryError::LookupFailed(*id, e))?;

            debug!(
                "{} thruster at ({:.4}, {:.4}, {:.4}) m",
                id, pos.x, pos.y, pos.z
            );

            positions_m[id.index()] = pos;
        }

        Self::from_positions(positions_m)
    }

    /// Build the table from known positions, ordered as `ThrusterId::ALL`.
    pub fn from_positions(positions_m: [Vector3<f64>; NUM_THRUSTERS]) -> Result<Self, GeometryError> {
        for id in ThrusterId::ALL.iter() {
            let p = positions_m[id.index()];
            if !p.iter().all(|v| v.is_finite()) {
                return Err(GeometryError::NonFinitePosition(*id, p));
            }
        }

        Ok(Self { positions_m })
    }

    /// Position of the given thruster in the body frame.
    ///
    /// Units: meters
    pub fn position(&self, id: ThrusterId) -> &Vector3<f64> {
        &self.positions_m[id.index()]
    }
}
