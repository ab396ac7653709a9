//! Result packaging

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Utc;

use super::StatusReport;
use comms_if::eqpt::{AllocStatus, ThrustForces, ThrustStamped};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the outbound record for a solved cycle, stamped with the current time.
pub fn package(forces: &ThrustForces, report: &StatusReport) -> ThrustStamped {
    ThrustStamped {
        stamp: Utc::now(),
        force: *forces,
        status: AllocStatus {
            converged: report.converged,
            termination: report.termination,
            iterations: report.iterations,
            final_cost: report.final_cost,
        },
    }
}
