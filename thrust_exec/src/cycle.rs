//! # Allocation Cycle
//!
//! Runs one allocation per command: solve, package, publish.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use crate::thrust_alloc::{self, ThrustAlloc, ThrustAllocError};
use comms_if::{cmd::AccelCmd, eqpt::ThrustStamped};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of acceleration commands.
pub trait CommandSource {
    type Error: std::error::Error + 'static;

    /// Get the next command, or `None` if there is no new command available right now.
    fn recv_cmd(&mut self) -> Result<Option<AccelCmd>, Self::Error>;
}

/// A destination for allocated thruster forces.
pub trait ThrustSink {
    type Error: std::error::Error + 'static;

    fn publish(&mut self, msg: &ThrustStamped) -> Result<(), Self::Error>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Could not allocate the command: {0}")]
    AllocError(ThrustAllocError),

    #[error("Could not publish the thruster forces: {0}")]
    PublishError(Box<dyn std::error::Error>),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Allocate a single command and publish the result.
///
/// The result is published whether or not the solver converged. Commands which cannot be
/// allocated at all (for example those containing NaN) publish nothing. The allocator is left
/// `Idle` whatever the outcome.
pub fn run_cycle<S>(
    alloc: &mut ThrustAlloc,
    cmd: &AccelCmd,
    sink: &mut S,
) -> Result<ThrustStamped, CycleError>
where
    S: ThrustSink,
{
    let (forces, report) = alloc.proc(cmd).map_err(CycleError::AllocError)?;

    let msg = thrust_alloc::package(&forces, &report);

    trace!("Publishing {:?}", msg);

    let published = sink.publish(&msg);

    alloc.end_cycle();

    published.map_err(|e| CycleError::PublishError(Box::new(e)))?;

    Ok(msg)
}
