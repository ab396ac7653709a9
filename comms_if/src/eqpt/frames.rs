//! # Frame Server Requests
//!
//! Requests and responses exchanged with the frame server, which knows the position of each
//! named coordinate frame on the vehicle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::cmd::Vec3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Request the position of `child` expressed in `parent`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameRequest {
    pub parent: String,
    pub child: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Response from the frame server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum FrameResponse {
    /// Translation of the child frame's origin in the parent frame.
    ///
    /// Units: meters
    Found(Vec3),

    /// The server does not (yet) know the transform.
    Unknown,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_response_json() {
        let resp = FrameResponse::Found(Vec3::new(0.1, -0.2, 0.3));
        let s = serde_json::to_string(&resp).unwrap();
        assert_eq!(s, r#"{"Found":{"x":0.1,"y":-0.2,"z":0.3}}"#);

        let back: FrameResponse = serde_json::from_str(&s).unwrap();
        assert_eq!(back, resp);

        let unknown: FrameResponse = serde_json::from_str("\"Unknown\"").unwrap();
        assert_eq!(unknown, FrameResponse::Unknown);
    }
}
