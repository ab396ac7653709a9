//! Thrust allocation module
//!
//! Converts a commanded body acceleration into one force per thruster by solving a bounded least
//! squares problem: six residuals (one per axis) over ten force unknowns, each limited to its
//! thruster's capability.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod bounds;
mod equations;
mod geometry;
mod output;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use bounds::*;
pub use equations::*;
pub use geometry::*;
pub use output::*;
pub use params::*;
pub use state::*;

use comms_if::cmd::AccelCmd;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of controlled axes (surge, sway, heave, roll, pitch, yaw).
pub const NUM_AXES: usize = 6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ThrustAlloc operation.
#[derive(Debug, thiserror::Error)]
pub enum ThrustAllocError {
    #[error("Invalid thrust allocation parameters: {0}")]
    InvalidParams(String),

    #[error("Recieved an invalid acceleration command: {0:?}")]
    InvalidCmd(AccelCmd),

    #[error("Could not build the allocation problem: {0}")]
    ProblemError(lsq::ProblemError),

    #[error("The solver rejected the allocation problem: {0}")]
    SolveError(lsq::SolveError),

    #[error("Could not create the cycle report archive: {0}")]
    ArchiveError(String),
}
