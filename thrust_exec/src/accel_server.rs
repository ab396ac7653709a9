//! # Acceleration Server
//!
//! Receives acceleration commands and publishes the allocated thruster forces.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    cmd::AccelCmd,
    eqpt::ThrustStamped,
    net::{create_socket, zmq, NetParams, SocketError, SocketOptions},
};

use crate::cycle::{CommandSource, ThrustSink};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Acceleration server
pub struct AccelServer {
    cmd_socket: zmq::Socket,

    thrust_socket: zmq::Socket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AccelServerError {
    #[error("Socket error: {0}")]
    SocketError(SocketError),

    #[error("Could not send thruster forces: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a command: {0}")]
    RecvError(zmq::Error),

    #[error("The client sent a message which was not valid UTF-8")]
    NonUtf8Cmd,

    #[error("Could not serialize the thruster forces: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the recieved command: {0}")]
    CmdParseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AccelServer {
    /// Create a new instance of the acceleration server.
    ///
    /// This function will not block until a client connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, AccelServerError> {
        // Only the latest command is kept, older unprocessed ones are dropped
        let cmd_socket_options = SocketOptions {
            conflate: true,
            subscribe: Some(Vec::new()),
            connect_timeout: 1000,
            linger: 0,
            recv_timeout: 100,
            ..Default::default()
        };
        let thrust_socket_options = SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let cmd_socket = create_socket(
            ctx,
            zmq::SUB,
            &cmd_socket_options,
            &params.accel_endpoint,
        )
        .map_err(AccelServerError::SocketError)?;
        let thrust_socket = create_socket(
            ctx,
            zmq::PUB,
            &thrust_socket_options,
            &params.thrust_endpoint,
        )
        .map_err(AccelServerError::SocketError)?;

        Ok(Self {
            cmd_socket,
            thrust_socket,
        })
    }
}

impl CommandSource for AccelServer {
    type Error = AccelServerError;

    /// Recieve the latest command, waiting up to the socket's receive timeout.
    fn recv_cmd(&mut self) -> Result<Option<AccelCmd>, Self::Error> {
        let cmd_str = match self.cmd_socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(AccelServerError::NonUtf8Cmd),
            // No message in timeout
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(AccelServerError::RecvError(e)),
        };

        serde_json::from_str(&cmd_str)
            .map(Some)
            .map_err(AccelServerError::CmdParseError)
    }
}

impl ThrustSink for AccelServer {
    type Error = AccelServerError;

    fn publish(&mut self, msg: &ThrustStamped) -> Result<(), Self::Error> {
        let msg_str = serde_json::to_string(msg).map_err(AccelServerError::SerializationError)?;

        self.thrust_socket
            .send(&msg_str, 0)
            .map_err(AccelServerError::SendError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use comms_if::eqpt::{AllocStatus, SolveTermination, ThrustForces};

    fn net_params(name: &str) -> NetParams {
        NetParams {
            accel_endpoint: format!("inproc://{}_accel", name),
            thrust_endpoint: format!("inproc://{}_thrust", name),
            frame_endpoint: format!("inproc://{}_frame", name),
        }
    }

    #[test]
    fn test_recv_cmd() {
        let ctx = zmq::Context::new();
        let params = net_params("accel_server_recv");

        let cmd_pub = create_socket(
            &ctx,
            zmq::PUB,
            &SocketOptions {
                bind: true,
                linger: 0,
                ..Default::default()
            },
            &params.accel_endpoint,
        )
        .unwrap();
        let mut server = AccelServer::new(&ctx, &params).unwrap();

        let cmd = AccelCmd::from_axes([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let cmd_str = serde_json::to_string(&cmd).unwrap();

        // Subscriptions take a moment to propagate, keep sending until one arrives
        let mut recieved = None;
        for _ in 0..50 {
            cmd_pub.send(&cmd_str, 0).unwrap();
            if let Some(c) = server.recv_cmd().unwrap() {
                recieved = Some(c);
                break;
            }
        }
        assert_eq!(recieved, Some(cmd));

        // Garbage is reported rather than silently dropped
        let mut parse_err = false;
        for _ in 0..50 {
            cmd_pub.send("not a command", 0).unwrap();
            match server.recv_cmd() {
                Err(AccelServerError::CmdParseError(_)) => {
                    parse_err = true;
                    break;
                }
                _ => (),
            }
        }
        assert!(parse_err);
    }

    #[test]
    fn test_no_cmd() {
        let ctx = zmq::Context::new();
        let mut server = AccelServer::new(&ctx, &net_params("accel_server_none")).unwrap();

        assert!(server.recv_cmd().unwrap().is_none());
    }

    #[test]
    fn test_publish() {
        let ctx = zmq::Context::new();
        let params = net_params("accel_server_pub");
        let mut server = AccelServer::new(&ctx, &params).unwrap();

        let thrust_sub = create_socket(
            &ctx,
            zmq::SUB,
            &SocketOptions {
                subscribe: Some(Vec::new()),
                linger: 0,
                recv_timeout: 100,
                ..Default::default()
            },
            &params.thrust_endpoint,
        )
        .unwrap();

        let msg = ThrustStamped {
            stamp: Utc::now(),
            force: ThrustForces::from_array(&[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, -2.0, -2.0, -2.0, -2.0]),
            status: AllocStatus {
                converged: true,
                termination: SolveTermination::Convergence,
                iterations: 4,
                final_cost: 0.0,
            },
        };

        let mut recieved: Option<ThrustStamped> = None;
        for _ in 0..50 {
            server.publish(&msg).unwrap();
            if let Ok(Ok(s)) = thrust_sub.recv_string(0) {
                recieved = Some(serde_json::from_str(&s).unwrap());
                break;
            }
        }
        assert_eq!(recieved, Some(msg));
    }
}
