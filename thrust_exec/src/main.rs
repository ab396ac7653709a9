//! Main thrust executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Load parameters
//!     - Build the thruster geometry table (failure is fatal)
//!     - Initialise the thrust allocator
//!     - Main loop, once per recieved command:
//!         - Allocate the command across the thrusters
//!         - Publish the forces
//!
//! Commands are not rate limited, the command socket keeps only the latest unprocessed command so
//! a command arriving during a solve supersedes any older one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};

// Internal
use comms_if::net::zmq;
use thrust_lib::{
    accel_server::AccelServer,
    cycle::{self, CommandSource},
    frame_client::{FrameSource, NetFrameSource, StaticFrameSource},
    params::{GeometrySource, ThrustExecParams},
    thrust_alloc::{self, ThrustAlloc, ThrusterGeometry},
};
use util::{host, logger::logger_init, module::State, session::Session};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let exec_params: ThrustExecParams =
        util::params::load("thrust_exec.toml").wrap_err("Could not load exec params")?;

    // Initialise session
    let session = Session::new("thrust_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(exec_params.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Thrust Allocation Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let alloc_params: thrust_alloc::Params = util::params::load(&exec_params.alloc_params_file)
        .wrap_err("Could not load thrust allocation params")?;

    info!("Parameters loaded from {}", exec_params.alloc_params_file);

    let zmq_ctx = zmq::Context::new();

    // ---- THRUSTER GEOMETRY ----

    info!(
        "Looking up thruster positions from {:?}",
        exec_params.geometry_source
    );

    let mut frame_source: Box<dyn FrameSource> = match exec_params.geometry_source {
        GeometrySource::Network => Box::new(
            NetFrameSource::new(&zmq_ctx, &exec_params.net.frame_endpoint)
                .wrap_err("Failed to initialise the frame client")?,
        ),
        GeometrySource::Params => Box::new(
            StaticFrameSource::load(&exec_params.frames_file)
                .wrap_err("Could not load the frame table")?,
        ),
    };

    let geometry = ThrusterGeometry::from_source(
        frame_source.as_mut(),
        &exec_params.base_frame,
        exec_params.frame_timeout(),
    )
    .wrap_err("Could not find the position of every thruster")?;

    info!("Thruster geometry complete");

    // ---- INITIALISE MODULES ----

    let archive_path = match alloc_params.archive_reports {
        true => Some(session.arch_root.join("thrust_alloc").join("cycle_report.csv")),
        false => None,
    };

    let mut alloc = ThrustAlloc::init(thrust_alloc::InitData {
        params: alloc_params,
        geometry,
        archive_path,
    })
    .wrap_err("Failed to initialise ThrustAlloc")?;

    info!("ThrustAlloc init complete");

    // ---- INITIALISE NETWORK ----

    let mut server = AccelServer::new(&zmq_ctx, &exec_params.net)
        .wrap_err("Failed to initialise the AccelServer")?;

    info!("AccelServer initialised");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        let cmd = match server.recv_cmd() {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => {
                warn!("Could not recieve a command: {}", e);
                continue;
            }
        };

        debug!("New command: {:?}", cmd);

        match cycle::run_cycle(&mut alloc, &cmd, &mut server) {
            Ok(msg) => debug!(
                "Cycle {} complete ({} iterations)",
                alloc.num_cycles(),
                msg.status.iterations
            ),
            Err(e) => warn!("{}", e),
        }
    }
}
