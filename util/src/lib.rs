//! Utility library for the Thrust Allocation Software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
