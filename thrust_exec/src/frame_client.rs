//! # Frame Client
//!
//! Provides the positions of named coordinate frames on the vehicle, either from the frame server
//! or from a static parameter table.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use comms_if::{
    cmd::Vec3,
    eqpt::{FrameRequest, FrameResponse},
    net::{create_socket, zmq, SocketError, SocketOptions},
};
use util::params::{self, LoadError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time to wait between repeated requests for a frame the server does not know yet.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of coordinate frame positions.
pub trait FrameSource {
    /// Get the position of the `child` frame's origin expressed in the `parent` frame, waiting at
    /// most `timeout` for it to become available.
    ///
    /// Units: meters
    fn lookup(
        &mut self,
        parent: &str,
        child: &str,
        timeout: Duration,
    ) -> Result<Vector3<f64>, FrameLookupError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Frame source backed by the frame server.
pub struct NetFrameSource {
    socket: zmq::Socket,

    poll_interval: Duration,
}

/// Frame source backed by a fixed table.
#[derive(Debug, Clone)]
pub struct StaticFrameSource {
    base_frame: String,

    frames: HashMap<String, Vector3<f64>>,
}

/// Contents of a frame table parameter file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramesParams {
    /// Frame every position in the table is expressed in.
    pub base_frame: String,

    /// Position of each frame's origin in the base frame.
    ///
    /// Units: meters
    pub frames: HashMap<String, [f64; 3]>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FrameLookupError {
    #[error("Timed out waiting for the {1} frame in {0}")]
    Timeout(String, String),

    #[error("The {1} frame in {0} is not known")]
    UnknownFrame(String, String),

    #[error("Socket error: {0}")]
    SocketError(SocketError),

    #[error("Could not send the request to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("The server sent a message which was not valid UTF-8")]
    NonUtf8Response,

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetFrameSource {
    /// Create a new client of the frame server.
    ///
    /// This function will not block until the server connects.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, FrameLookupError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            linger: 0,
            req_correlate: true,
            req_relaxed: true,
            send_timeout: 100,
            ..Default::default()
        };

        let socket = create_socket(ctx, zmq::REQ, &socket_options, endpoint)
            .map_err(FrameLookupError::SocketError)?;

        Ok(Self {
            socket,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set the time waited between requests for a frame the server does not know yet.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Send one request and wait up to `wait` for the reply.
    ///
    /// `Ok(None)` means no reply arrived in time.
    fn request(
        &self,
        req: &FrameRequest,
        wait: Duration,
    ) -> Result<Option<FrameResponse>, FrameLookupError> {
        let wait_ms = wait.as_millis().min(i32::MAX as u128).max(1) as i32;
        self.socket.set_rcvtimeo(wait_ms).map_err(|e| {
            FrameLookupError::SocketError(SocketError::SocketOptionError("set_rcvtimeo".into(), e))
        })?;

        let req_str = serde_json::to_string(req).map_err(FrameLookupError::SerializationError)?;

        match self.socket.send(&req_str, 0) {
            Ok(_) => (),
            // Server not reachable yet, treat as no reply
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(FrameLookupError::SendError(e)),
        }

        match self.socket.recv_string(0) {
            Ok(Ok(s)) => serde_json::from_str(&s)
                .map(Some)
                .map_err(FrameLookupError::DeserializeError),
            Ok(Err(_)) => Err(FrameLookupError::NonUtf8Response),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(FrameLookupError::RecvError(e)),
        }
    }
}

impl FrameSource for NetFrameSource {
    /// Request the frame from the server until it is found or the timeout expires.
    fn lookup(
        &mut self,
        parent: &str,
        child: &str,
        timeout: Duration,
    ) -> Result<Vector3<f64>, FrameLookupError> {
        let deadline = Instant::now() + timeout;
        let req = FrameRequest {
            parent: parent.into(),
            child: child.into(),
        };
        let timed_out = || FrameLookupError::Timeout(parent.into(), child.into());

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out());
            }

            match self.request(&req, deadline - now)? {
                Some(FrameResponse::Found(v)) => {
                    debug!("Found {} in {}: {:?}", child, parent, v);
                    return Ok(Vector3::new(v.x, v.y, v.z));
                }
                Some(FrameResponse::Unknown) => {
                    trace!("{} in {} not known yet", child, parent);

                    if Instant::now() + self.poll_interval >= deadline {
                        return Err(timed_out());
                    }
                    thread::sleep(self.poll_interval);
                }
                None => return Err(timed_out()),
            }
        }
    }
}

impl StaticFrameSource {
    pub fn new(base_frame: &str, frames: HashMap<String, [f64; 3]>) -> Self {
        Self {
            base_frame: base_frame.into(),
            frames: frames
                .into_iter()
                .map(|(k, v)| (k, Vector3::from(v)))
                .collect(),
        }
    }

    pub fn from_params(params: FramesParams) -> Self {
        Self::new(&params.base_frame, params.frames)
    }

    /// Load a table from a parameter file relative to the params directory.
    pub fn load(path: &str) -> Result<Self, LoadError> {
        params::load(path).map(Self::from_params)
    }

    /// Parse a table from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, LoadError> {
        params::parse(s).map(Self::from_params)
    }

    pub fn base_frame(&self) -> &str {
        &self.base_frame
    }

    /// Get a frame's position, if it is in the table and `parent` is the base frame.
    pub fn get(&self, parent: &str, child: &str) -> Option<Vector3<f64>> {
        if parent != self.base_frame {
            return None;
        }

        self.frames.get(child).copied()
    }

    /// Answer a frame server request from this table.
    pub fn respond(&self, req: &FrameRequest) -> FrameResponse {
        match self.get(&req.parent, &req.child) {
            Some(p) => FrameResponse::Found(Vec3::new(p.x, p.y, p.z)),
            None => FrameResponse::Unknown,
        }
    }
}

impl FrameSource for StaticFrameSource {
    /// Look the frame up in the table.
    ///
    /// The table never changes so a missing frame fails immediately rather than waiting.
    fn lookup(
        &mut self,
        parent: &str,
        child: &str,
        _timeout: Duration,
    ) -> Result<Vector3<f64>, FrameLookupError> {
        self.get(parent, child)
            .ok_or_else(|| FrameLookupError::UnknownFrame(parent.into(), child.into()))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::thrust_alloc::ThrusterGeometry;
    use comms_if::eqpt::ThrusterId;

    /// The reference vehicle's frame table.
    pub(crate) fn reference_source() -> StaticFrameSource {
        StaticFrameSource::from_toml_str(include_str!("../../params/frames.toml")).unwrap()
    }

    pub(crate) fn reference_geometry() -> ThrusterGeometry {
        ThrusterGeometry::from_source(&mut reference_source(), "base_link", Duration::from_secs(10))
            .unwrap()
    }

    /// Serve `num_requests` requests from the table, answering `Unknown` to the first
    /// `num_unknown` of them.
    fn spawn_server(
        ctx: &zmq::Context,
        endpoint: &str,
        num_requests: usize,
        num_unknown: usize,
    ) -> thread::JoinHandle<()> {
        let socket = create_socket(
            ctx,
            zmq::REP,
            &SocketOptions {
                bind: true,
                linger: 0,
                recv_timeout: 2000,
                ..Default::default()
            },
            endpoint,
        )
        .unwrap();
        let table = reference_source();

        thread::spawn(move || {
            for i in 0..num_requests {
                let req: FrameRequest =
                    serde_json::from_str(&socket.recv_string(0).unwrap().unwrap()).unwrap();

                let resp = match i < num_unknown {
                    true => FrameResponse::Unknown,
                    false => table.respond(&req),
                };

                socket
                    .send(&serde_json::to_string(&resp).unwrap(), 0)
                    .unwrap();
            }
        })
    }

    #[test]
    fn test_reference_table_complete() {
        let mut source = reference_source();
        assert_eq!(source.base_frame(), "base_link");

        for id in ThrusterId::ALL.iter() {
            assert!(source
                .lookup("base_link", &id.frame_name(), Duration::from_secs(0))
                .is_ok());
        }
    }

    #[test]
    fn test_static_lookup() {
        let mut frames = HashMap::new();
        frames.insert("sway_fwd_thruster".to_string(), [0.3, 0.0, 0.05]);
        let mut source = StaticFrameSource::new("base_link", frames);

        assert_eq!(
            source
                .lookup("base_link", "sway_fwd_thruster", Duration::from_secs(10))
                .unwrap(),
            Vector3::new(0.3, 0.0, 0.05)
        );

        match source.lookup("base_link", "sway_aft_thruster", Duration::from_secs(10)) {
            Err(FrameLookupError::UnknownFrame(p, c)) => {
                assert_eq!(p, "base_link");
                assert_eq!(c, "sway_aft_thruster");
            }
            r => panic!("Expected an unknown frame, got {:?}", r),
        }

        // Only the base frame can be used as the parent
        assert!(source
            .lookup("odom", "sway_fwd_thruster", Duration::from_secs(10))
            .is_err());
    }

    #[test]
    fn test_respond() {
        let source = reference_source();

        assert_eq!(
            source.respond(&FrameRequest {
                parent: "base_link".into(),
                child: "heave_port_aft_thruster".into()
            }),
            FrameResponse::Found(Vec3::new(-0.25, 0.2, 0.0))
        );
        assert_eq!(
            source.respond(&FrameRequest {
                parent: "base_link".into(),
                child: "camera".into()
            }),
            FrameResponse::Unknown
        );
    }

    #[test]
    fn test_net_lookup_waits_for_unknown() {
        let ctx = zmq::Context::new();
        let server = spawn_server(&ctx, "inproc://frame_client_wait", 3, 2);

        let mut client = NetFrameSource::new(&ctx, "inproc://frame_client_wait")
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));

        let pos = client
            .lookup("base_link", "surge_port_lo_thruster", Duration::from_secs(5))
            .unwrap();
        assert_eq!(pos, Vector3::new(-0.2, 0.25, -0.1));

        server.join().unwrap();
    }

    #[test]
    fn test_net_lookup_times_out() {
        let ctx = zmq::Context::new();
        let server = spawn_server(&ctx, "inproc://frame_client_timeout", 1, 1);

        let mut client = NetFrameSource::new(&ctx, "inproc://frame_client_timeout")
            .unwrap()
            .with_poll_interval(Duration::from_millis(500));

        let start = Instant::now();
        match client.lookup("base_link", "sway_aft_thruster", Duration::from_millis(200)) {
            Err(FrameLookupError::Timeout(_, c)) => assert_eq!(c, "sway_aft_thruster"),
            r => panic!("Expected a timeout, got {:?}", r),
        }
        assert!(start.elapsed() < Duration::from_secs(2));

        server.join().unwrap();
    }

    #[test]
    fn test_net_lookup_no_server() {
        let ctx = zmq::Context::new();
        let mut client = NetFrameSource::new(&ctx, "inproc://frame_client_nobody").unwrap();

        match client.lookup("base_link", "sway_aft_thruster", Duration::from_millis(100)) {
            Err(FrameLookupError::Timeout(..)) => (),
            r => panic!("Expected a timeout, got {:?}", r),
        }
    }
}
