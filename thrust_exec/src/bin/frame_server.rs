//! # Frame Server
//!
//! Serves the positions of the vehicle's coordinate frames from a static frame table, for use by
//! the thrust executable's frame client.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{debug, info, warn};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::{FrameRequest, FrameResponse},
    net::{create_socket, zmq, SocketOptions},
};
use thrust_lib::frame_client::StaticFrameSource;
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Serve a static frame table over the network.
#[derive(Debug, StructOpt)]
#[structopt(name = "frame_server")]
struct Opt {
    /// Frame table to serve, relative to the params directory
    #[structopt(short, long, default_value = "frames.toml")]
    frames_file: String,

    /// Endpoint to bind the server to
    #[structopt(short, long, default_value = "tcp://*:5052")]
    endpoint: String,

    /// Log every request at debug level
    #[structopt(short, long)]
    verbose: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("frame_server", "sessions").wrap_err("Failed to create the session")?;

    let level = match opt.verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Frame Server\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD TABLE ----

    let table = StaticFrameSource::load(&opt.frames_file).wrap_err("Could not load the frame table")?;

    info!(
        "Serving frames relative to {} from {}",
        table.base_frame(),
        opt.frames_file
    );

    // ---- SERVER INITIALISATION ----

    let ctx = zmq::Context::new();
    let socket = create_socket(
        &ctx,
        zmq::REP,
        &SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 100,
            ..Default::default()
        },
        &opt.endpoint,
    )
    .wrap_err("Failed to initialise server")?;

    info!("Server bound to {}", opt.endpoint);

    // ---- MAIN LOOP ----

    loop {
        let req_str = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Recieved a request which was not valid UTF-8");
                String::new()
            }
            Err(e) => {
                warn!("Could not recieve a request: {}", e);
                continue;
            }
        };

        // A REP socket must always reply, so invalid requests get `Unknown`
        let response = match serde_json::from_str::<FrameRequest>(&req_str) {
            Ok(req) => {
                let resp = table.respond(&req);
                debug!("{} in {}: {:?}", req.child, req.parent, resp);
                resp
            }
            Err(e) => {
                warn!("Could not parse the request: {}", e);
                FrameResponse::Unknown
            }
        };

        let resp_str = serde_json::to_string(&response).wrap_err("Could not serialize the response")?;

        if let Err(e) = socket.send(&resp_str, 0) {
            warn!("Could not send the response: {}", e);
        }
    }
}
