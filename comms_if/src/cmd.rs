//! # Acceleration Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A plain three component vector as it appears on the wire.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A commanded body acceleration.
///
/// `linear` is `{x: surge, y: sway, z: heave}` in m/s^2, `angular` is
/// `{x: roll, y: pitch, z: yaw}` in rad/s^2.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct AccelCmd {
    pub linear: Vec3,
    pub angular: Vec3,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl AccelCmd {
    /// Build a command from the six axis values, ordered surge, sway, heave, roll, pitch, yaw.
    pub fn from_axes(axes: [f64; 6]) -> Self {
        Self {
            linear: Vec3::new(axes[0], axes[1], axes[2]),
            angular: Vec3::new(axes[3], axes[4], axes[5]),
        }
    }

    /// Return the six axis values, ordered surge, sway, heave, roll, pitch, yaw.
    pub fn axes(&self) -> [f64; 6] {
        [
            self.linear.x,
            self.linear.y,
            self.linear.z,
            self.angular.x,
            self.angular.y,
            self.angular.z,
        ]
    }

    /// Determine if every component of the command is a finite number.
    pub fn is_finite(&self) -> bool {
        self.linear.is_finite() && self.angular.is_finite()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_axes_order() {
        let cmd = AccelCmd::from_axes([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(cmd.linear.x, 1.0);
        assert_eq!(cmd.linear.z, 3.0);
        assert_eq!(cmd.angular.x, 4.0);
        assert_eq!(cmd.angular.z, 6.0);
        assert_eq!(cmd.axes(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_cmd() {
        let cmd: AccelCmd = serde_json::from_str(
            r#"{"linear":{"x":1.0,"y":0.0,"z":-0.5},"angular":{"x":0.0,"y":0.25,"z":0.0}}"#,
        )
        .unwrap();

        assert_eq!(cmd.axes(), [1.0, 0.0, -0.5, 0.0, 0.25, 0.0]);
        assert!(cmd.is_finite());
    }

    #[test]
    fn test_non_finite() {
        let mut cmd = AccelCmd::default();
        assert!(cmd.is_finite());

        cmd.angular.y = f64::NAN;
        assert!(!cmd.is_finite());

        cmd.angular.y = 0.0;
        cmd.linear.x = f64::INFINITY;
        assert!(!cmd.is_finite());
    }
}
