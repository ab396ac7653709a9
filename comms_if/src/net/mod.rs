//! # Network Module
//!
//! This module provides networking abstractions over ZMQ, the networking library chosen for the
//! software.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use zmq::{Context, Socket, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| SocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Endpoints used by the thrust executable.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Endpoint acceleration commands are received from (SUB, connects)
    pub accel_endpoint: String,

    /// Endpoint thruster forces are published on (PUB, binds)
    pub thrust_endpoint: String,

    /// Endpoint of the frame server (REQ, connects)
    pub frame_endpoint: String,
}

/// Represents options which can be set on a socket.
///
/// Most options here correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt) documentation.
pub struct SocketOptions {
    /// Indicates if the socket should bind itself to the endpoint. Servers should have this value
    /// set as `true`, clients should have it set as `false`.
    ///
    /// The default value is `false`.
    pub bind: bool,

    /// `ZMQ_REQ_CORRELATE`: Match replies with requests
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`: relax strict alternation between request and reply
    pub req_relaxed: bool,

    /// `ZMQ_CONFLATE`: keep only the last message in the queue
    pub conflate: bool,

    /// Subscription prefix for SUB sockets. `None` leaves the socket unsubscribed.
    pub subscribe: Option<Vec<u8>>,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`: Set reconnection interval
    pub reconnect_ivl: i32,

    /// `ZMQ_RECONNECT_IVL_MAX`: Set maximum reconnection interval
    pub reconnect_ivl_max: i32,

    /// `ZMQ_CONNECT_TIMEOUT`: Set `connect()` timeout
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum SocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not connect the socket to {0}: {1}")]
    CouldNotConnect(String, zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a new socket, set its options and connect or bind it to the endpoint.
///
/// ## Arguments
/// - `ctx`: the zmq context which will be used to create the socket
/// - `socket_type`: the type of zmq socket to create
/// - `socket_options`: a [`SocketOptions`] struct specifying how to configure the socket
/// - `endpoint`: a zmq endpoint string, such as `"tcp://localhost:4000"`
pub fn create_socket(
    ctx: &Context,
    socket_type: SocketType,
    socket_options: &SocketOptions,
    endpoint: &str,
) -> Result<Socket, SocketError> {
    let socket = ctx
        .socket(socket_type)
        .map_err(SocketError::CreateSocketError)?;

    // Options must be set before connecting, conflate in particular is ignored afterwards
    socket_options.set(&socket)?;

    match socket_options.bind {
        false => socket.connect(endpoint),
        true => socket.bind(endpoint),
    }
    .map_err(|e| SocketError::CouldNotConnect(endpoint.into(), e))?;

    Ok(socket)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), SocketError> {
        // Set all the socket options, we use a macro here to make the error handling nice and
        // easy
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_reconnect_ivl_max, self.reconnect_ivl_max),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        match socket.get_socket_type() {
            Ok(SocketType::REQ) => {
                set_sockopts!(
                    socket,
                    (set_req_correlate, self.req_correlate),
                    (set_req_relaxed, self.req_relaxed)
                );
            }
            Ok(SocketType::SUB) => {
                if let Some(ref prefix) = self.subscribe {
                    set_sockopts!(socket, (set_subscribe, prefix));
                }
            }
            _ => (),
        }

        if self.conflate {
            set_sockopts!(socket, (set_conflate, true));
        }

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            bind: false,
            req_correlate: false,
            req_relaxed: false,
            conflate: false,
            subscribe: None,
            connect_timeout: 0,
            linger: 30_000,
            reconnect_ivl: 100,
            reconnect_ivl_max: 0,
            recv_timeout: -1,
            send_timeout: -1,
        }
    }
}
