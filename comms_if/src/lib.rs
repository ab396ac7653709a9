//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the thrust allocation software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Acceleration commands received by the allocator
pub mod cmd;

/// Command and response definitions for equipment (thrusters and the frame server)
pub mod eqpt;

/// Network module
pub mod net;
