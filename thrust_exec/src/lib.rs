//! # Thrust library.
//!
//! This library allows the executables and benchmarks in this crate to access the thrust
//! allocation modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Acceleration server - recieves commands and publishes thruster forces
pub mod accel_server;

/// Allocation cycle - runs one solve per command and hands the result on
pub mod cycle;

/// Frame client - finds the position of each thruster on the vehicle
pub mod frame_client;

/// Executable parameters
pub mod params;

/// Thrust allocation module - converts body acceleration commands into thruster forces
pub mod thrust_alloc;
