//! # Thrust Executable Parameters
//!
//! This module provide parameters for the thrust executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use log::LevelFilter;
use serde::Deserialize;
use std::time::Duration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ThrustExecParams {
    /// Minimum level of messages written to the log
    pub log_level: LevelFilter,

    /// Thrust allocation parameter file, relative to the params directory
    pub alloc_params_file: String,

    /// Where thruster positions are obtained from
    pub geometry_source: GeometrySource,

    /// Frame thruster positions are expressed in
    pub base_frame: String,

    /// Maximum time to wait for each thruster frame
    ///
    /// Units: seconds
    pub frame_timeout_s: f64,

    /// Static frame table, relative to the params directory
    pub frames_file: String,

    /// Network endpoints
    pub net: NetParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GeometrySource {
    /// Query the frame server.
    Network,

    /// Read the static frame table.
    Params,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ThrustExecParams {
    /// The frame lookup timeout, with negative or invalid values treated as zero.
    pub fn frame_timeout(&self) -> Duration {
        match self.frame_timeout_s.is_finite() && self.frame_timeout_s > 0.0 {
            true => Duration::from_secs_f64(self.frame_timeout_s),
            false => Duration::from_secs(0),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_exec_params() {
        let p: ThrustExecParams =
            util::params::parse(include_str!("../../params/thrust_exec.toml")).unwrap();

        assert_eq!(p.log_level, LevelFilter::Debug);
        assert_eq!(p.geometry_source, GeometrySource::Network);
        assert_eq!(p.base_frame, "base_link");
        assert_eq!(p.frame_timeout(), Duration::from_secs(10));
        assert_eq!(p.net.accel_endpoint, "tcp://localhost:5050");
    }

    #[test]
    fn test_reference_alloc_params() {
        let p: crate::thrust_alloc::Params =
            util::params::parse(include_str!("../../params/thrust_alloc.toml")).unwrap();

        assert!(p.validate().is_ok());
        assert_eq!(p.mass_kg, 48.8428);
        assert_eq!(p.force_max_n, [18.0; comms_if::eqpt::NUM_THRUSTERS]);
        assert!(p.archive_reports);
    }

    #[test]
    fn test_frame_timeout() {
        let mut p: ThrustExecParams =
            util::params::parse(include_str!("../../params/thrust_exec.toml")).unwrap();

        p.frame_timeout_s = -1.0;
        assert_eq!(p.frame_timeout(), Duration::from_secs(0));
        p.frame_timeout_s = 0.25;
        assert_eq!(p.frame_timeout(), Duration::from_millis(250));
    }
}
